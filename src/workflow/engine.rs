use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::context::RunContext;
use super::gate::GateFailure;
use super::state::{RunState, RunStatus};
use super::task::TaskDefinition;
use crate::config::EngineSettings;
use crate::error::Result;
use crate::executor::Executor;
use crate::review::{ReviewRecord, Reviewer};
use crate::telemetry::add_metric;
use crate::workflow::artifact::Artifact;

/// How a process run ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProcessOutcome {
    /// The process ran to completion with this payload
    Completed(Value),
    /// A quality gate stopped the process
    Halted(GateFailure),
}

impl ProcessOutcome {
    /// Whether the process ran to completion
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Completed(_))
    }

    /// The gate failure, if the run was halted
    pub fn gate_failure(&self) -> Option<&GateFailure> {
        match self {
            ProcessOutcome::Halted(failure) => Some(failure),
            ProcessOutcome::Completed(_) => None,
        }
    }

    /// The payload a caller of the process sees
    pub fn to_value(&self) -> Value {
        match self {
            ProcessOutcome::Completed(value) => value.clone(),
            ProcessOutcome::Halted(failure) => {
                serde_json::to_value(failure).unwrap_or(Value::Null)
            }
        }
    }
}

impl From<GateFailure> for ProcessOutcome {
    fn from(failure: GateFailure) -> Self {
        ProcessOutcome::Halted(failure)
    }
}

/// A named workflow function.
///
/// Implementations issue tasks and breakpoints through the [`RunContext`]
/// in the order they are written, thread earlier results into later task
/// arguments, and return either a completed payload or the failure of a
/// quality gate. Any other error aborts the run.
#[async_trait]
pub trait Process: Send + Sync + std::fmt::Debug {
    /// Identifier, conventionally `product-management/<slug>`
    fn id(&self) -> &str;

    /// One-line description
    fn description(&self) -> &str;

    /// Every task definition the process may invoke
    fn tasks(&self) -> Vec<TaskDefinition>;

    /// Run the process on `inputs`
    async fn run(&self, inputs: Value, ctx: &RunContext) -> Result<ProcessOutcome>;
}

/// Record of one finished process run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRun {
    /// Unique identifier of the run
    pub run_id: String,
    /// Process that ran
    pub process_id: String,
    /// How it ended
    pub outcome: ProcessOutcome,
    /// Every artifact produced, in production order
    pub artifacts: Vec<Artifact>,
    /// Every breakpoint decision, in order
    pub reviews: Vec<ReviewRecord>,
    /// Number of task invocations that succeeded
    pub task_count: usize,
    /// Final run state
    pub state: RunState,
}

/// Engine for running processes against an executor and a reviewer
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    /// Unique ID of the workflow engine
    id: String,

    /// Settings shared by every run
    settings: Arc<EngineSettings>,

    /// Performs delegated work
    executor: Arc<dyn Executor>,

    /// Resolves breakpoints
    reviewer: Arc<dyn Reviewer>,
}

impl WorkflowEngine {
    /// Create a new workflow engine with default settings
    pub fn new(executor: Arc<dyn Executor>, reviewer: Arc<dyn Reviewer>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            settings: Arc::new(EngineSettings::default()),
            executor,
            reviewer,
        }
    }

    /// Replace the engine settings
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    /// Get the ID of the workflow engine
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Engine settings
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run `process` once on `inputs`.
    ///
    /// A halted run is a normal return. Executor, validation and review
    /// errors propagate unchanged; the engine neither catches nor retries
    /// them.
    #[instrument(skip(self, process, inputs), fields(engine.id = %self.id, process.id = %process.id()))]
    pub async fn run(&self, process: &dyn Process, inputs: Value) -> Result<ProcessRun> {
        let ctx = RunContext::new(
            process.id(),
            Arc::clone(&self.executor),
            Arc::clone(&self.reviewer),
            (*self.settings).clone(),
        );
        let mut state = RunState::new(process.id());
        info!("Starting process: {}, run: {}", process.id(), ctx.run_id());
        state.update_status(RunStatus::Running);

        let result = process.run(inputs, &ctx).await;
        settle(&mut state, &result);

        match &result {
            Ok(ProcessOutcome::Completed(_)) => {
                info!(
                    "Process completed: {}, tasks: {}, artifacts: {}",
                    process.id(),
                    ctx.task_count(),
                    ctx.artifacts().len()
                );
            }
            Ok(ProcessOutcome::Halted(failure)) => {
                warn!(
                    "Process halted by quality gate: {}, phase: {}, error: {}",
                    process.id(),
                    failure.phase,
                    failure.error
                );
            }
            Err(_) => {
                let recorded = state.error.as_ref();
                error!(
                    run.status = %state.status,
                    error.kind = recorded.map(|e| e.error_type.as_str()).unwrap_or_default(),
                    error.at = ?recorded.map(|e| e.timestamp),
                    "Process failed: {}, run: {}, tasks: {}, error: {}",
                    process.id(),
                    ctx.run_id(),
                    ctx.task_count(),
                    recorded.map(|e| e.message.as_str()).unwrap_or_default()
                );
            }
        }

        add_metric(
            "workflow_run_duration_ms",
            ctx.elapsed().as_millis() as f64,
            &[
                ("process_id", process.id().to_string()),
                ("status", state.status.to_string()),
            ],
        );

        let outcome = result?;
        Ok(ProcessRun {
            run_id: ctx.run_id().to_string(),
            process_id: process.id().to_string(),
            outcome,
            artifacts: ctx.artifacts(),
            reviews: ctx.reviews(),
            task_count: ctx.task_count(),
            state,
        })
    }
}

/// Move `state` to the terminal status matching `result`
fn settle(state: &mut RunState, result: &Result<ProcessOutcome>) {
    match result {
        Ok(ProcessOutcome::Completed(_)) => state.update_status(RunStatus::Completed),
        Ok(ProcessOutcome::Halted(failure)) => state.halt(&failure.phase),
        Err(err) => state.record_error(err.kind(), &err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StubExecutor;
    use crate::review::AutoReviewer;
    use crate::workflow::gate::QualityGate;
    use crate::workflow::task::{define_task, TaskDescriptor};
    use serde_json::json;

    #[derive(Debug)]
    struct IdeaScreen {
        screen: TaskDefinition,
        refine: TaskDefinition,
    }

    impl IdeaScreen {
        fn new() -> Self {
            let schema = json!({
                "type": "object",
                "required": ["ideas", "artifacts"],
                "properties": {
                    "ideas": { "type": "array", "items": { "type": "string" } },
                    "artifacts": { "type": "array" }
                }
            });
            let refine_schema = schema.clone();
            Self {
                screen: define_task("idea-screen", move |args, ctx| {
                    TaskDescriptor::agent(ctx, "Screen ideas")
                        .with_context(args.clone())
                        .with_output_schema(schema.clone())
                }),
                refine: define_task("idea-refine", move |args, ctx| {
                    TaskDescriptor::agent(ctx, "Refine ideas")
                        .with_context(args.clone())
                        .with_output_schema(refine_schema.clone())
                }),
            }
        }
    }

    #[async_trait]
    impl Process for IdeaScreen {
        fn id(&self) -> &str {
            "test/idea-screen"
        }

        fn description(&self) -> &str {
            "Screen and refine ideas"
        }

        fn tasks(&self) -> Vec<TaskDefinition> {
            vec![self.screen.clone(), self.refine.clone()]
        }

        async fn run(&self, inputs: Value, ctx: &RunContext) -> Result<ProcessOutcome> {
            let screened = ctx.task(&self.screen, inputs.clone()).await?;
            let gate = QualityGate::new("idea-screen", "Collect more ideas");
            if let Err(failure) = gate.at_least("ideas", screened.count("ideas"), 2) {
                return Ok(failure.into());
            }
            let refined = ctx
                .task(&self.refine, json!({ "ideas": screened.value["ideas"] }))
                .await?;
            Ok(ctx.complete(
                json!({ "ideas": refined.value["ideas"] }),
                inputs,
            ))
        }
    }

    fn engine(stub: Arc<StubExecutor>) -> WorkflowEngine {
        WorkflowEngine::new(stub, Arc::new(AutoReviewer::new()))
    }

    #[tokio::test]
    async fn test_completed_run() {
        let stub = Arc::new(
            StubExecutor::new().with_response("idea-screen", json!({ "ideas": ["a", "b"] })),
        );
        let run = engine(stub.clone())
            .run(&IdeaScreen::new(), json!({ "market": "smb" }))
            .await
            .unwrap();

        assert!(run.outcome.is_success());
        assert_eq!(run.state.status, RunStatus::Completed);
        assert_eq!(run.task_count, 2);
        assert_eq!(run.artifacts.len(), 2);
        assert_eq!(run.outcome.to_value()["metadata"]["config"]["market"], "smb");
        assert_eq!(stub.call_order(), vec!["idea-screen", "idea-refine"]);
    }

    #[tokio::test]
    async fn test_gate_halts_without_error() {
        let stub = Arc::new(StubExecutor::new());
        let run = engine(stub.clone())
            .run(&IdeaScreen::new(), json!({}))
            .await
            .unwrap();

        let failure = run.outcome.gate_failure().unwrap();
        assert_eq!(failure.phase, "idea-screen");
        assert_eq!(run.state.status, RunStatus::Halted);
        assert_eq!(run.outcome.to_value()["success"], false);
        assert_eq!(stub.calls("idea-refine"), 0);
    }

    #[tokio::test]
    async fn test_executor_error_propagates() {
        let stub = Arc::new(StubExecutor::new().with_failure("idea-screen", "quota exceeded"));
        let err = engine(stub).run(&IdeaScreen::new(), json!({})).await.unwrap_err();
        assert_eq!(err.kind(), "Executor");
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_settle_records_failure() {
        let mut state = RunState::new("test/idea-screen");
        state.update_status(RunStatus::Running);

        let result: Result<ProcessOutcome> = Err(crate::Error::UnknownProcess("nope".to_string()));
        settle(&mut state, &result);

        assert_eq!(state.status, RunStatus::Failed);
        let recorded = state.error.as_ref().unwrap();
        assert_eq!(recorded.error_type, "UnknownProcess");
        assert_eq!(recorded.message, result.unwrap_err().to_string());
        assert!(state.halted_at.is_none());
    }

    #[test]
    fn test_settle_halted_and_completed() {
        let mut halted = RunState::new("p");
        let failure = QualityGate::new("idea-screen", "Collect more ideas")
            .at_least("ideas", 0, 2)
            .unwrap_err();
        settle(&mut halted, &Ok(failure.into()));
        assert_eq!(halted.status, RunStatus::Halted);
        assert_eq!(halted.halted_at.as_deref(), Some("idea-screen"));
        assert!(halted.error.is_none());

        let mut completed = RunState::new("p");
        settle(&mut completed, &Ok(ProcessOutcome::Completed(json!({}))));
        assert_eq!(completed.status, RunStatus::Completed);
    }
}
