use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, trace, warn, Level, Span};
use uuid::Uuid;

use crate::config::EngineSettings;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::review::{BreakpointContext, BreakpointRequest, ReviewRecord, Reviewer};
use crate::telemetry::add_metric;
use crate::workflow::artifact::{Artifact, ArtifactLog};
use crate::workflow::engine::ProcessOutcome;
use crate::workflow::parallel;
use crate::workflow::task::{TaskCall, TaskContext, TaskDefinition, TaskResult};

/// A human-review point, built by a process and handed to
/// [`RunContext::breakpoint`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Breakpoint {
    /// Short label
    pub title: String,
    /// The question put to the reviewer
    pub question: String,
    /// Key metrics so far
    pub summary: Map<String, Value>,
    /// Files shown at this breakpoint only; never added to the run's artifacts
    pub extra_files: Vec<Artifact>,
}

impl Breakpoint {
    /// Create a breakpoint
    pub fn new(title: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            question: question.into(),
            ..Default::default()
        }
    }

    /// Add a summary entry
    pub fn with_summary(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.summary.insert(key.to_string(), value.into());
        self
    }

    /// Show an extra file to the reviewer
    pub fn with_file(mut self, file: Artifact) -> Self {
        self.extra_files.push(file);
        self
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Nothing holds these locks across an await or a panic point
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Per-invocation state of one process run.
///
/// A context is created by [`WorkflowEngine::run`](crate::workflow::WorkflowEngine::run)
/// and lives exactly as long as the run. Every suspension point of a process
/// goes through it: [`task`](Self::task), [`parallel_all`](Self::parallel_all)
/// and [`breakpoint`](Self::breakpoint).
#[derive(Debug)]
pub struct RunContext {
    run_id: String,
    process_id: String,
    started: Instant,
    started_at: DateTime<Utc>,
    executor: Arc<dyn Executor>,
    reviewer: Arc<dyn Reviewer>,
    settings: EngineSettings,
    artifacts: Mutex<ArtifactLog>,
    reviews: Mutex<Vec<ReviewRecord>>,
    task_count: AtomicUsize,
}

impl RunContext {
    /// Create a context for a fresh run of `process_id`
    pub fn new(
        process_id: impl Into<String>,
        executor: Arc<dyn Executor>,
        reviewer: Arc<dyn Reviewer>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            process_id: process_id.into(),
            started: Instant::now(),
            started_at: Utc::now(),
            executor,
            reviewer,
            settings,
            artifacts: Mutex::new(ArtifactLog::new()),
            reviews: Mutex::new(Vec::new()),
            task_count: AtomicUsize::new(0),
        }
    }

    /// Unique identifier of this run
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Identifier of the running process
    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    /// Monotonic clock reading
    pub fn now(&self) -> Instant {
        Instant::now()
    }

    /// Wall-clock time at which the run started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.now().saturating_duration_since(self.started)
    }

    /// Emit a log line tagged with this run
    pub fn log(&self, level: Level, message: &str) {
        let run_id = self.run_id.as_str();
        let process_id = self.process_id.as_str();
        match level {
            Level::ERROR => error!(run.id = run_id, process.id = process_id, "{}", message),
            Level::WARN => warn!(run.id = run_id, process.id = process_id, "{}", message),
            Level::INFO => info!(run.id = run_id, process.id = process_id, "{}", message),
            Level::DEBUG => debug!(run.id = run_id, process.id = process_id, "{}", message),
            _ => trace!(run.id = run_id, process.id = process_id, "{}", message),
        }
    }

    /// Artifacts recorded so far, in production order
    pub fn artifacts(&self) -> Vec<Artifact> {
        lock(&self.artifacts).snapshot()
    }

    /// Breakpoint decisions recorded so far
    pub fn reviews(&self) -> Vec<ReviewRecord> {
        lock(&self.reviews).clone()
    }

    /// Number of task invocations that produced a valid result
    pub fn task_count(&self) -> usize {
        self.task_count.load(Ordering::SeqCst)
    }

    /// Invoke one task and wait for its validated result.
    ///
    /// The result's artifacts are appended to the run before this returns.
    pub async fn task(&self, definition: &TaskDefinition, args: Value) -> Result<TaskResult> {
        let result = self.invoke(definition, args).await?;
        lock(&self.artifacts).extend(result.artifacts.iter().cloned());
        Ok(result)
    }

    /// Invoke independent tasks concurrently and wait for all of them.
    ///
    /// Results come back in the order of `calls`, whatever order the branches
    /// finish in. The first failure fails the whole fan-out and no artifacts
    /// from it are recorded. On success artifacts are appended in call order.
    #[instrument(skip(self, calls), fields(run.id = %self.run_id, fanout.size = calls.len()))]
    pub async fn parallel_all(&self, calls: Vec<TaskCall>) -> Result<Vec<TaskResult>> {
        let fanout = calls.len();
        add_metric(
            "workflow_fanout_size",
            fanout as f64,
            &[("process_id", self.process_id.clone())],
        );

        let results = parallel::all(
            calls
                .into_iter()
                .map(|call| async move { self.invoke(&call.definition, call.args).await }),
            self.settings.max_parallel_tasks,
        )
        .await?;

        let mut log = lock(&self.artifacts);
        for result in &results {
            log.extend(result.artifacts.iter().cloned());
        }
        Ok(results)
    }

    /// Suspend the run until the reviewer resolves `breakpoint`.
    ///
    /// The decision is recorded but never changes what the process does next.
    #[instrument(skip(self, breakpoint), fields(run.id = %self.run_id, breakpoint.title = %breakpoint.title))]
    pub async fn breakpoint(&self, breakpoint: Breakpoint) -> Result<()> {
        let mut files = self.artifacts();
        files.extend(breakpoint.extra_files);

        let request = BreakpointRequest::new(
            breakpoint.title.clone(),
            breakpoint.question,
            BreakpointContext {
                run_id: self.run_id.clone(),
                files,
                summary: breakpoint.summary,
            },
        );
        let request_id = request.request_id.clone();
        info!("Waiting at breakpoint: {}", breakpoint.title);

        let start = Instant::now();
        let decision = self
            .reviewer
            .review(request)
            .await
            .map_err(|e| Error::Review {
                title: breakpoint.title.clone(),
                message: format!("{:#}", e),
            })?;
        add_metric(
            "workflow_breakpoint_wait_ms",
            start.elapsed().as_millis() as f64,
            &[("process_id", self.process_id.clone())],
        );

        if decision.is_rejected() {
            warn!(
                "Breakpoint rejected, continuing: {}, decision: {:?}",
                breakpoint.title, decision
            );
        } else {
            debug!("Breakpoint resolved: {}, decision: {:?}", breakpoint.title, decision);
        }

        lock(&self.reviews).push(ReviewRecord {
            request_id,
            title: breakpoint.title,
            decision,
            resolved_at: Utc::now(),
        });
        Ok(())
    }

    /// Build the successful outcome of the run.
    ///
    /// `fields` are the process's summarized phase outputs. The payload also
    /// carries `success`, every artifact, the run `duration` in milliseconds
    /// and a `metadata` block echoing `config`.
    pub fn complete(&self, fields: Value, config: Value) -> ProcessOutcome {
        let mut output = Map::new();
        output.insert("success".to_string(), Value::Bool(true));
        match fields {
            Value::Object(fields) => output.extend(fields),
            Value::Null => {}
            other => {
                output.insert("result".to_string(), other);
            }
        }
        output.insert("artifacts".to_string(), json!(self.artifacts()));
        output.insert(
            "duration".to_string(),
            json!(self.elapsed().as_millis() as u64),
        );
        output.insert(
            "metadata".to_string(),
            json!({
                "processId": self.process_id,
                "runId": self.run_id,
                "timestamp": Utc::now().to_rfc3339(),
                "config": config,
            }),
        );
        ProcessOutcome::Completed(Value::Object(output))
    }

    #[instrument(
        skip(self, definition, args),
        fields(run.id = %self.run_id, task.name = %definition.name(), task.effect_id = tracing::field::Empty)
    )]
    async fn invoke(&self, definition: &TaskDefinition, args: Value) -> Result<TaskResult> {
        let task_ctx = TaskContext::new(&self.settings.tasks_dir);
        let descriptor = definition.build(&args, &task_ctx);
        Span::current().record("task.effect_id", descriptor.effect_id.as_str());

        let schema = descriptor.compile_schema()?;

        let start = Instant::now();
        let outcome = self.executor.execute(&descriptor).await;
        add_metric(
            "workflow_task_duration_ms",
            start.elapsed().as_millis() as f64,
            &[
                ("task_name", descriptor.name.clone()),
                ("success", outcome.is_ok().to_string()),
            ],
        );

        let value = outcome.map_err(|e| {
            error!("Executor failed task: {}, error: {:#}", descriptor.name, e);
            Error::Executor {
                task: descriptor.name.clone(),
                message: format!("{:#}", e),
            }
        })?;

        let violations = schema.validate(&value);
        if !violations.is_empty() {
            error!(
                "Task result rejected: {}, violations: {}",
                descriptor.name,
                violations.len()
            );
            return Err(Error::SchemaViolation {
                task: descriptor.name,
                violations,
            });
        }

        let artifacts =
            Artifact::from_result(&value).map_err(|source| Error::InvalidArtifacts {
                task: descriptor.name.clone(),
                source,
            })?;

        self.task_count.fetch_add(1, Ordering::SeqCst);
        debug!("Task completed: {}, artifacts: {}", descriptor.name, artifacts.len());

        Ok(TaskResult {
            task: descriptor.name,
            effect_id: descriptor.effect_id,
            value,
            artifacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StubExecutor;
    use crate::review::{AutoReviewer, ChannelReviewer, ReviewDecision};
    use crate::workflow::task::{define_task, TaskDescriptor};

    fn findings_task(name: &'static str) -> TaskDefinition {
        define_task(name, move |args, ctx| {
            TaskDescriptor::agent(ctx, format!("Findings {}", name))
                .with_context(args.clone())
                .with_output_schema(json!({
                    "type": "object",
                    "required": ["findings", "artifacts"],
                    "properties": {
                        "findings": { "type": "array", "minItems": 1, "items": { "type": "string" } },
                        "artifacts": { "type": "array" }
                    }
                }))
        })
    }

    fn context(stub: StubExecutor, reviewer: Arc<dyn Reviewer>) -> RunContext {
        RunContext::new(
            "product-management/test",
            Arc::new(stub),
            reviewer,
            EngineSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_task_appends_artifacts() {
        let ctx = context(
            StubExecutor::new().with_artifacts("first", 2),
            Arc::new(AutoReviewer::new()),
        );

        let result = ctx.task(&findings_task("first"), json!({})).await.unwrap();
        assert_eq!(result.artifacts.len(), 2);
        assert_eq!(ctx.artifacts(), result.artifacts);
        assert_eq!(ctx.task_count(), 1);
    }

    #[tokio::test]
    async fn test_schema_violation_is_fatal() {
        let ctx = context(
            StubExecutor::new().with_response("first", json!({ "findings": [] })),
            Arc::new(AutoReviewer::new()),
        );

        let err = ctx.task(&findings_task("first"), json!({})).await.unwrap_err();
        match err {
            Error::SchemaViolation { task, violations } => {
                assert_eq!(task, "first");
                assert_eq!(violations[0].path, "findings");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(ctx.artifacts().is_empty());
        assert_eq!(ctx.task_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_artifacts_are_rejected() {
        let ctx = context(
            StubExecutor::new().with_response("first", json!({ "artifacts": [{ "label": "x" }] })),
            Arc::new(AutoReviewer::new()),
        );

        let err = ctx.task(&findings_task("first"), json!({})).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArtifacts { .. }));
    }

    #[tokio::test]
    async fn test_fanout_failure_records_nothing() {
        let ctx = context(
            StubExecutor::new().with_failure("b", "agent crashed"),
            Arc::new(AutoReviewer::new()),
        );

        let calls = vec![
            TaskCall::new(&findings_task("a"), json!({})),
            TaskCall::new(&findings_task("b"), json!({})),
        ];
        let err = ctx.parallel_all(calls).await.unwrap_err();
        assert_eq!(err.task(), Some("b"));
        assert!(err.to_string().contains("agent crashed"));
        assert!(ctx.artifacts().is_empty());
    }

    #[tokio::test]
    async fn test_fanout_future_is_send() {
        let ctx = context(StubExecutor::new(), Arc::new(AutoReviewer::new()));
        let calls = vec![
            TaskCall::new(&findings_task("a"), json!({ "index": 0 })),
            TaskCall::new(&findings_task("b"), json!({ "index": 1 })),
        ];

        // Processes await fan-outs from inside boxed `Send` futures
        let fanout: futures::future::BoxFuture<'_, Result<Vec<TaskResult>>> =
            Box::pin(async { ctx.parallel_all(calls).await });
        let results = fanout.await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].task, "a");
        assert_eq!(results[1].task, "b");
    }

    #[tokio::test]
    async fn test_breakpoint_shows_run_state_and_records_decision() {
        let reviewer = Arc::new(ChannelReviewer::new());
        let ctx = Arc::new(context(StubExecutor::new(), reviewer.clone()));
        ctx.task(&findings_task("first"), json!({})).await.unwrap();

        let waiting = {
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                ctx.breakpoint(
                    Breakpoint::new("Findings review", "Proceed?")
                        .with_summary("findings", 1)
                        .with_file(Artifact::new("review/notes.md", "markdown")),
                )
                .await
            })
        };

        let pending = loop {
            let pending = reviewer.pending().await;
            if !pending.is_empty() {
                break pending;
            }
            tokio::task::yield_now().await;
        };
        let request = &pending[0];
        assert_eq!(request.context.run_id, ctx.run_id());
        assert_eq!(request.context.files.len(), 2);
        assert_eq!(request.context.summary["findings"], 1);

        reviewer
            .resolve(
                &request.request_id,
                ReviewDecision::Rejected {
                    reason: "thin evidence".to_string(),
                },
            )
            .await
            .unwrap();
        waiting.await.unwrap().unwrap();

        assert_eq!(ctx.artifacts().len(), 1);
        let reviews = ctx.reviews();
        assert_eq!(reviews.len(), 1);
        assert!(reviews[0].decision.is_rejected());
    }

    #[tokio::test]
    async fn test_complete_payload() {
        let ctx = context(StubExecutor::new(), Arc::new(AutoReviewer::new()));
        ctx.task(&findings_task("first"), json!({})).await.unwrap();

        let outcome = ctx.complete(json!({ "findingCount": 1 }), json!({ "depth": "standard" }));
        let value = outcome.to_value();
        assert_eq!(value["success"], true);
        assert_eq!(value["findingCount"], 1);
        assert_eq!(value["artifacts"].as_array().unwrap().len(), 1);
        assert!(value["duration"].is_u64());
        assert_eq!(value["metadata"]["processId"], "product-management/test");
        assert_eq!(value["metadata"]["config"]["depth"], "standard");
    }
}
