use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::executor::Executor;
use crate::schema::{minimal_instance, Schema};
use crate::workflow::task::TaskDescriptor;

/// Executor that fabricates results from each task's output contract.
///
/// Every result starts as the minimal instance of the descriptor's schema.
/// Per-task overrides are laid over it field by field, and stub artifacts
/// are attached unless the override supplies its own. Calls are counted so
/// tests can assert which tasks ran.
#[derive(Debug)]
pub struct StubExecutor {
    overrides: HashMap<String, Value>,
    artifact_counts: HashMap<String, usize>,
    default_artifacts: usize,
    delays: HashMap<String, Duration>,
    failures: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl Default for StubExecutor {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
            artifact_counts: HashMap::new(),
            default_artifacts: 1,
            delays: HashMap::new(),
            failures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl StubExecutor {
    /// Create a stub producing one artifact per task
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay `fields` over the generated result of `task`
    pub fn with_response(mut self, task: &str, fields: Value) -> Self {
        self.overrides.insert(task.to_string(), fields);
        self
    }

    /// Number of artifacts attached to results of `task`
    pub fn with_artifacts(mut self, task: &str, count: usize) -> Self {
        self.artifact_counts.insert(task.to_string(), count);
        self
    }

    /// Number of artifacts attached to results of tasks without their own count
    pub fn with_default_artifacts(mut self, count: usize) -> Self {
        self.default_artifacts = count;
        self
    }

    /// Delay results of `task`
    pub fn with_delay(mut self, task: &str, delay: Duration) -> Self {
        self.delays.insert(task.to_string(), delay);
        self
    }

    /// Make `task` fail with `message`
    pub fn with_failure(mut self, task: &str, message: &str) -> Self {
        self.failures.insert(task.to_string(), message.to_string());
        self
    }

    /// How many times `task` was invoked
    pub fn calls(&self, task: &str) -> usize {
        self.lock_calls().iter().filter(|name| *name == task).count()
    }

    /// Total number of invocations
    pub fn total_calls(&self) -> usize {
        self.lock_calls().len()
    }

    /// Task names in invocation order
    pub fn call_order(&self) -> Vec<String> {
        self.lock_calls().clone()
    }

    /// Artifacts attached to a result of `task`
    pub fn artifact_count(&self, task: &str) -> usize {
        self.artifact_counts
            .get(task)
            .copied()
            .unwrap_or(self.default_artifacts)
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        // A poisoned lock only means a test panicked mid-call; the list is still usable
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fabricate(&self, descriptor: &TaskDescriptor) -> Result<Value> {
        let schema = Schema::compile(&descriptor.agent.output_schema)
            .map_err(|e| anyhow!("cannot stub task {}: {}", descriptor.name, e))?;
        let mut value = minimal_instance(&schema);

        let override_fields = self.overrides.get(&descriptor.name);
        if let Some(fields) = override_fields {
            match fields.as_object() {
                Some(overlay) if value.is_object() => {
                    if let Some(record) = value.as_object_mut() {
                        for (key, field) in overlay {
                            record.insert(key.clone(), field.clone());
                        }
                    }
                }
                _ => value = fields.clone(),
            }
        }

        let supplies_artifacts = matches!(override_fields, Some(v) if v.get("artifacts").is_some());
        if let Some(record) = value.as_object_mut().filter(|_| !supplies_artifacts) {
            let artifacts: Vec<Value> = (0..self.artifact_count(&descriptor.name))
                .map(|i| {
                    json!({
                        "path": format!("stub/{}/{}-{}.md", descriptor.name, descriptor.effect_id, i),
                        "format": "markdown",
                        "label": format!("{} #{}", descriptor.title, i + 1),
                    })
                })
                .collect();
            record.insert("artifacts".to_string(), Value::Array(artifacts));
        }

        Ok(value)
    }
}

#[async_trait]
impl Executor for StubExecutor {
    async fn execute(&self, descriptor: &TaskDescriptor) -> Result<Value> {
        self.lock_calls().push(descriptor.name.clone());
        debug!("Stub executing task: {}", descriptor.name);

        if let Some(delay) = self.delays.get(&descriptor.name) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(&descriptor.name) {
            bail!("{}", message);
        }

        self.fabricate(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::task::{define_task, TaskContext, TaskDefinition};

    fn plan_task() -> TaskDefinition {
        define_task("launch-plan", |args, ctx| {
            TaskDescriptor::agent(ctx, "Launch plan")
                .with_context(args.clone())
                .with_output_schema(json!({
                    "type": "object",
                    "required": ["milestones", "channel", "artifacts"],
                    "properties": {
                        "milestones": { "type": "array", "minItems": 2, "items": { "type": "string" } },
                        "channel": { "type": "string", "enum": ["direct", "partner"] },
                        "artifacts": { "type": "array" }
                    }
                }))
        })
    }

    #[tokio::test]
    async fn test_generated_result_conforms() {
        let stub = StubExecutor::new().with_default_artifacts(2);
        let descriptor = plan_task().build(&json!({}), &TaskContext::new("tasks"));

        let value = stub.execute(&descriptor).await.unwrap();
        let schema = descriptor.compile_schema().unwrap();
        assert!(schema.is_valid(&value), "{}", value);
        assert_eq!(value["channel"], "direct");
        assert_eq!(value["artifacts"].as_array().unwrap().len(), 2);
        assert_eq!(stub.calls("launch-plan"), 1);
    }

    #[tokio::test]
    async fn test_override_fields_and_failures() {
        let stub = StubExecutor::new()
            .with_response("launch-plan", json!({ "channel": "partner", "artifacts": [] }))
            .with_failure("other", "agent unavailable");
        let descriptor = plan_task().build(&json!({}), &TaskContext::new("tasks"));

        let value = stub.execute(&descriptor).await.unwrap();
        assert_eq!(value["channel"], "partner");
        assert_eq!(value["milestones"].as_array().unwrap().len(), 2);
        assert!(value["artifacts"].as_array().unwrap().is_empty());

        let other = define_task("other", |_, ctx| TaskDescriptor::agent(ctx, "Other"))
            .build(&json!({}), &TaskContext::new("tasks"));
        let err = stub.execute(&other).await.unwrap_err();
        assert_eq!(err.to_string(), "agent unavailable");
        assert_eq!(stub.call_order(), vec!["launch-plan", "other"]);
    }
}
