use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use pm_workflows::config::EngineSettings;
use pm_workflows::workflow::{RunStatus, TaskContext};
use pm_workflows::{
    define_task, AutoReviewer, ChannelReviewer, Error, Executor, Process, ProcessOutcome,
    ReviewDecision, RunContext, StubExecutor, TaskCall, TaskDefinition, TaskDescriptor,
    WorkflowEngine,
};

fn step(name: &str) -> TaskDefinition {
    define_task(name, |args, ctx: &TaskContext| {
        TaskDescriptor::agent(ctx, "Pipeline step")
            .with_context(args.clone())
            .with_output_schema(json!({
                "type": "object",
                "required": ["index", "artifacts"],
                "properties": {
                    "index": { "type": "integer", "minimum": 0 },
                    "artifacts": { "type": "array" }
                }
            }))
    })
}

/// Echoes `context.index`, finishing later indices first
#[derive(Debug)]
struct EchoExecutor {
    width: u64,
}

#[async_trait]
impl Executor for EchoExecutor {
    async fn execute(&self, descriptor: &TaskDescriptor) -> anyhow::Result<Value> {
        let index = descriptor.agent.context["index"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis((self.width - index) * 10)).await;
        Ok(json!({
            "index": index,
            "artifacts": [{ "path": format!("out/{}.md", index), "format": "markdown" }]
        }))
    }
}

/// Runs `steps` sequential tasks followed by a breakpoint and a fan-out of `width`
#[derive(Debug)]
struct Pipeline {
    steps: usize,
    width: usize,
    sequential: TaskDefinition,
    fanned: TaskDefinition,
}

impl Pipeline {
    fn new(steps: usize, width: usize) -> Self {
        Self {
            steps,
            width,
            sequential: step("sequential-step"),
            fanned: step("fanned-step"),
        }
    }
}

#[async_trait]
impl Process for Pipeline {
    fn id(&self) -> &str {
        "tests/pipeline"
    }

    fn description(&self) -> &str {
        "Sequential steps, a review, then a fan-out"
    }

    fn tasks(&self) -> Vec<TaskDefinition> {
        vec![self.sequential.clone(), self.fanned.clone()]
    }

    async fn run(&self, _inputs: Value, ctx: &RunContext) -> pm_workflows::Result<ProcessOutcome> {
        for index in 0..self.steps {
            ctx.task(&self.sequential, json!({ "index": index })).await?;
        }

        ctx.breakpoint(pm_workflows::Breakpoint::new("Midpoint", "Continue with the fan-out?"))
            .await?;

        let calls = (0..self.width)
            .map(|index| TaskCall::new(&self.fanned, json!({ "index": index })))
            .collect();
        let results = ctx.parallel_all(calls).await?;
        let order: Vec<Value> = results.iter().map(|r| r.value["index"].clone()).collect();

        Ok(ctx.complete(json!({ "order": order }), json!({})))
    }
}

#[tokio::test]
async fn test_artifacts_accumulate_in_task_order() {
    let counts = [2usize, 0, 3, 1];
    let stub = counts
        .iter()
        .enumerate()
        .fold(StubExecutor::new(), |stub, (i, count)| {
            stub.with_artifacts(&format!("step-{}", i), *count)
        });
    let steps: Vec<TaskDefinition> = (0..counts.len())
        .map(|i| {
            define_task(&format!("step-{}", i), |_, ctx| {
                TaskDescriptor::agent(ctx, "Numbered step").with_output_schema(json!({
                    "type": "object",
                    "required": ["artifacts"],
                    "properties": { "artifacts": { "type": "array" } }
                }))
            })
        })
        .collect();

    let ctx = RunContext::new(
        "tests/ordering",
        Arc::new(stub),
        Arc::new(AutoReviewer::new()),
        EngineSettings::default(),
    );
    for definition in &steps {
        ctx.task(definition, json!({})).await.unwrap();
    }

    let paths: Vec<String> = ctx.artifacts().into_iter().map(|a| a.path).collect();
    assert_eq!(paths.len(), counts.iter().sum::<usize>());
    assert!(paths[0].starts_with("stub/step-0/"));
    assert!(paths[1].starts_with("stub/step-0/"));
    assert!(paths[2..5].iter().all(|p| p.starts_with("stub/step-2/")));
    assert!(paths[5].starts_with("stub/step-3/"));

    let outcome = ctx.complete(json!({}), json!({}));
    assert_eq!(outcome.to_value()["artifacts"].as_array().unwrap().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_parallel_results_keep_call_order() {
    let width = 6;
    let engine = WorkflowEngine::new(
        Arc::new(EchoExecutor { width: width as u64 }),
        Arc::new(AutoReviewer::new()),
    );

    let run = engine
        .run(&Pipeline::new(2, width), json!({}))
        .await
        .unwrap();

    let result = run.outcome.to_value();
    assert_eq!(result["order"], json!([0, 1, 2, 3, 4, 5]));

    // Artifacts of the fan-out follow call order too, after the sequential ones
    let paths: Vec<&str> = run.artifacts.iter().map(|a| a.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "out/0.md", "out/1.md", "out/0.md", "out/1.md", "out/2.md", "out/3.md", "out/4.md",
            "out/5.md"
        ]
    );
    assert_eq!(run.task_count, 8);
}

#[tokio::test(start_paused = true)]
async fn test_fan_out_respects_concurrency_limit() {
    let width = 4;
    let engine = WorkflowEngine::new(
        Arc::new(EchoExecutor { width: width as u64 }),
        Arc::new(AutoReviewer::new()),
    )
    .with_settings(EngineSettings {
        max_parallel_tasks: 1,
        ..Default::default()
    });

    let run = engine
        .run(&Pipeline::new(0, width), json!({}))
        .await
        .unwrap();

    assert_eq!(run.outcome.to_value()["order"], json!([0, 1, 2, 3]));
    assert_eq!(run.state.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_breakpoint_suspends_until_resolved() {
    let reviewer = Arc::new(ChannelReviewer::new());
    let engine = WorkflowEngine::new(Arc::new(StubExecutor::new()), reviewer.clone());
    let process: Arc<dyn Process> = Arc::new(Pipeline::new(1, 2));

    let mut running = tokio::spawn({
        let engine = engine.clone();
        let process = process.clone();
        async move { engine.run(process.as_ref(), json!({})).await }
    });

    // Nothing past the breakpoint may run before a decision arrives
    let waited = tokio::time::timeout(Duration::from_millis(50), &mut running).await;
    assert!(waited.is_err(), "run finished without a review decision");

    let pending = reviewer.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].title, "Midpoint");
    assert_eq!(pending[0].context.files.len(), 1);

    reviewer
        .resolve(&pending[0].request_id, ReviewDecision::Approved)
        .await
        .unwrap();

    let run = running.await.unwrap().unwrap();
    assert!(run.outcome.is_success());
    assert_eq!(run.reviews.len(), 1);
    assert_eq!(run.task_count, 3);
    assert!(reviewer.pending().await.is_empty());
}

#[tokio::test]
async fn test_schema_violation_aborts_run() {
    let stub = StubExecutor::new().with_response("sequential-step", json!({ "index": -1 }));
    let engine = WorkflowEngine::new(Arc::new(stub), Arc::new(AutoReviewer::new()));

    let err = engine
        .run(&Pipeline::new(3, 2), json!({}))
        .await
        .unwrap_err();

    match err {
        Error::SchemaViolation { task, violations } => {
            assert_eq!(task, "sequential-step");
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].path, "index");
        }
        other => panic!("expected a schema violation, got {}", other),
    }
}

#[tokio::test]
async fn test_executor_failure_in_fan_out_aborts_run() {
    let stub = StubExecutor::new().with_failure("fanned-step", "agent unavailable");
    let engine = WorkflowEngine::new(Arc::new(stub), Arc::new(AutoReviewer::new()));

    let err = engine
        .run(&Pipeline::new(1, 3), json!({}))
        .await
        .unwrap_err();

    assert_eq!(err.task(), Some("fanned-step"));
    assert!(err.to_string().contains("agent unavailable"));
}
