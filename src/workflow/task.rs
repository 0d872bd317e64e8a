use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::workflow::artifact::Artifact;

/// Per-invocation identity handed to a task builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    /// Opaque unique token for this invocation
    pub effect_id: String,

    /// Where the executor may record the invocation payloads
    pub io: TaskIo,
}

impl TaskContext {
    /// Create a context with a fresh effect id, rooted at `tasks_dir`
    pub fn new(tasks_dir: &str) -> Self {
        Self::with_effect_id(tasks_dir, Uuid::new_v4().to_string())
    }

    /// Create a context for a known effect id
    pub fn with_effect_id(tasks_dir: &str, effect_id: impl Into<String>) -> Self {
        let effect_id = effect_id.into();
        let dir = Path::new(tasks_dir).join(&effect_id);
        Self {
            io: TaskIo {
                input_json_path: dir.join("input.json").to_string_lossy().into_owned(),
                output_json_path: dir.join("result.json").to_string_lossy().into_owned(),
            },
            effect_id,
        }
    }
}

/// Storage-location hints for the executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIo {
    /// `tasks/<effectId>/input.json`
    pub input_json_path: String,
    /// `tasks/<effectId>/result.json`
    pub output_json_path: String,
}

/// Kind of delegated work a descriptor asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// Work performed by an LLM agent following natural-language instructions
    #[serde(rename = "agent")]
    DelegatedAgentWork,
}

/// What the agent is asked to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    /// Persona the agent adopts
    pub role: String,
    /// Ordered guidance; the engine never interprets these
    pub instructions: Vec<String>,
    /// Arguments assembled by the calling step
    pub context: Value,
    /// Format hint for the result
    pub output_format: String,
    /// JSON-Schema-like output contract
    pub output_schema: Value,
}

/// Immutable description of one unit of delegated work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    /// Name of the definition that produced this descriptor
    pub name: String,
    /// Identity of this invocation
    pub effect_id: String,
    /// Kind of work
    pub kind: TaskKind,
    /// Human readable title
    pub title: String,
    /// Agent request
    pub agent: AgentSpec,
    /// Free-form tags; never used for control flow
    pub labels: Vec<String>,
    /// Payload location hints
    pub io: TaskIo,
}

impl TaskDescriptor {
    /// Start an agent descriptor for the invocation described by `ctx`
    pub fn agent(ctx: &TaskContext, title: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            effect_id: ctx.effect_id.clone(),
            kind: TaskKind::DelegatedAgentWork,
            title: title.into(),
            agent: AgentSpec {
                role: String::new(),
                instructions: Vec::new(),
                context: Value::Null,
                output_format: "JSON".to_string(),
                output_schema: Value::Null,
            },
            labels: Vec::new(),
            io: ctx.io.clone(),
        }
    }

    /// Set the agent persona
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.agent.role = role.into();
        self
    }

    /// Set the instruction list
    pub fn with_instructions<I, S>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.agent.instructions = instructions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the context payload
    pub fn with_context(mut self, context: Value) -> Self {
        self.agent.context = context;
        self
    }

    /// Set the output format hint
    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.agent.output_format = format.into();
        self
    }

    /// Set the output contract
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.agent.output_schema = schema;
        self
    }

    /// Set the labels
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Compile the output contract
    pub fn compile_schema(&self) -> Result<Schema> {
        Schema::compile(&self.agent.output_schema).map_err(|source| Error::SchemaConfig {
            task: self.name.clone(),
            source,
        })
    }
}

type Builder = dyn Fn(&Value, &TaskContext) -> TaskDescriptor + Send + Sync;

/// A named, stateless template producing one descriptor per invocation
#[derive(Clone)]
pub struct TaskDefinition {
    name: String,
    builder: Arc<Builder>,
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("name", &self.name)
            .finish()
    }
}

impl TaskDefinition {
    /// Stable kebab-case name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produce the descriptor for one invocation.
    ///
    /// The descriptor's `name` is always the definition's name.
    pub fn build(&self, args: &Value, ctx: &TaskContext) -> TaskDescriptor {
        let mut descriptor = (self.builder)(args, ctx);
        descriptor.name = self.name.clone();
        descriptor
    }
}

/// Register a task definition
pub fn define_task<F>(name: &str, builder: F) -> TaskDefinition
where
    F: Fn(&Value, &TaskContext) -> TaskDescriptor + Send + Sync + 'static,
{
    TaskDefinition {
        name: name.to_string(),
        builder: Arc::new(builder),
    }
}

/// The validated value returned for one task invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    /// Name of the task definition
    pub task: String,
    /// Identity of the invocation
    pub effect_id: String,
    /// Full validated result
    pub value: Value,
    /// Artifacts listed in the result
    pub artifacts: Vec<Artifact>,
}

impl TaskResult {
    /// Read a field of the result
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    /// Length of an array field, zero when absent or not an array
    pub fn count(&self, field: &str) -> usize {
        self.value
            .get(field)
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Decode the result into a typed record
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.value.clone())?)
    }
}

/// One pending invocation for a fan-out
#[derive(Debug, Clone)]
pub struct TaskCall {
    /// Definition to invoke
    pub definition: TaskDefinition,
    /// Arguments for the builder
    pub args: Value,
}

impl TaskCall {
    /// Pair a definition with its arguments
    pub fn new(definition: &TaskDefinition, args: Value) -> Self {
        Self {
            definition: definition.clone(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary_task() -> TaskDefinition {
        define_task("summarize-findings", |args, ctx| {
            TaskDescriptor::agent(
                ctx,
                format!("Summarize findings for {}", args["productName"].as_str().unwrap_or("")),
            )
            .with_role("Product analyst")
            .with_instructions(["Read the findings", "Write a summary"])
            .with_context(args.clone())
            .with_output_schema(json!({
                "type": "object",
                "required": ["summary"],
                "properties": { "summary": { "type": "string" } }
            }))
            .with_labels(["product-management", "summary"])
        })
    }

    #[test]
    fn test_descriptor_shape_only_differs_by_identity() {
        let task = summary_task();
        let args = json!({ "productName": "Acme" });

        let first = task.build(&args, &TaskContext::with_effect_id("tasks", "effect-1"));
        let second = task.build(&args, &TaskContext::with_effect_id("tasks", "effect-2"));
        assert_ne!(first, second);
        assert_eq!(first.io.input_json_path, "tasks/effect-1/input.json");
        assert_eq!(second.io.output_json_path, "tasks/effect-2/result.json");

        let mut normalized = second.clone();
        normalized.effect_id = first.effect_id.clone();
        normalized.io = first.io.clone();
        assert_eq!(first, normalized);
    }

    #[test]
    fn test_descriptor_serializes_with_kind_tag() {
        let descriptor = summary_task().build(&json!({}), &TaskContext::new("tasks"));
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["kind"], "agent");
        assert_eq!(value["name"], "summarize-findings");
        assert_eq!(value["agent"]["instructions"][1], "Write a summary");
        assert!(value["io"]["inputJsonPath"].as_str().unwrap().ends_with("input.json"));
        assert!(descriptor.compile_schema().is_ok());
    }

    #[test]
    fn test_task_result_helpers() {
        let result = TaskResult {
            task: "job-identification".to_string(),
            effect_id: "e".to_string(),
            value: json!({ "coreJobs": [1, 2], "title": "x" }),
            artifacts: Vec::new(),
        };
        assert_eq!(result.count("coreJobs"), 2);
        assert_eq!(result.count("title"), 0);
        assert_eq!(result.count("missing"), 0);
    }
}
