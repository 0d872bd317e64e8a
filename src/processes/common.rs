use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::workflow::task::{define_task, TaskDefinition, TaskDescriptor};

/// Output contract of one artifact reference
pub(crate) fn artifact_schema() -> Value {
    json!({
        "type": "object",
        "required": ["path", "format"],
        "properties": {
            "path": { "type": "string" },
            "format": { "type": "string" },
            "label": { "type": "string" },
            "language": { "type": "string" }
        }
    })
}

/// Add the mandatory `artifacts` collection to an object contract
pub(crate) fn with_artifacts(mut schema: Value) -> Value {
    if let Some(node) = schema.as_object_mut() {
        let properties = node
            .entry("properties")
            .or_insert_with(|| json!({}));
        if let Some(properties) = properties.as_object_mut() {
            properties.insert(
                "artifacts".to_string(),
                json!({ "type": "array", "items": artifact_schema() }),
            );
        }
        let required = node.entry("required").or_insert_with(|| json!([]));
        if let Some(required) = required.as_array_mut() {
            if !required.iter().any(|r| r == "artifacts") {
                required.push(json!("artifacts"));
            }
        }
    }
    schema
}

/// Define an agent task whose title names the product from its arguments
pub(crate) fn agent_task(
    name: &'static str,
    title: &'static str,
    role: &'static str,
    instructions: &'static [&'static str],
    labels: &'static [&'static str],
    output_schema: Value,
) -> TaskDefinition {
    let schema = with_artifacts(output_schema);
    define_task(name, move |args, ctx| {
        let title = match args.get("productName").and_then(Value::as_str) {
            Some(product) => format!("{}: {}", title, product),
            None => title.to_string(),
        };
        TaskDescriptor::agent(ctx, title)
            .with_role(role)
            .with_instructions(instructions.iter().copied())
            .with_context(args.clone())
            .with_output_schema(schema.clone())
            .with_labels(labels.iter().copied())
    })
}

/// Decode process inputs, treating `null` as an empty record
pub(crate) fn decode_inputs<T: DeserializeOwned>(process: &str, inputs: Value) -> Result<T> {
    let inputs = match inputs {
        Value::Null => json!({}),
        other => other,
    };
    serde_json::from_value(inputs).map_err(|e| Error::InvalidInput {
        process: process.to_string(),
        message: e.to_string(),
    })
}

/// Reject an empty mandatory text input
pub(crate) fn require(process: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput {
            process: process.to_string(),
            message: format!("{} is required", field),
        });
    }
    Ok(())
}

/// Field of a task result, `null` when absent
pub(crate) fn field(value: &Value, name: &str) -> Value {
    value.get(name).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::workflow::task::TaskContext;
    use serde::Deserialize;

    #[test]
    fn test_with_artifacts_extends_contract() {
        let schema = with_artifacts(json!({
            "type": "object",
            "required": ["summary"],
            "properties": { "summary": { "type": "string" } }
        }));
        assert_eq!(schema["required"], json!(["summary", "artifacts"]));
        assert!(Schema::compile(&schema).is_ok());

        let bare = with_artifacts(json!({ "type": "object" }));
        assert_eq!(bare["required"], json!(["artifacts"]));
    }

    #[test]
    fn test_agent_task_title_names_product() {
        let task = agent_task(
            "demo-task",
            "Demo",
            "Analyst",
            &["Do the thing"],
            &["demo"],
            json!({ "type": "object" }),
        );
        let descriptor = task.build(&json!({ "productName": "Acme" }), &TaskContext::new("tasks"));
        assert_eq!(descriptor.title, "Demo: Acme");
        assert_eq!(descriptor.agent.role, "Analyst");
        assert_eq!(descriptor.labels, vec!["demo"]);
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Inputs {
        #[serde(default)]
        product_name: String,
    }

    #[test]
    fn test_decode_inputs() {
        let inputs: Inputs = decode_inputs("p", Value::Null).unwrap();
        assert!(inputs.product_name.is_empty());
        assert!(require("p", "productName", &inputs.product_name).is_err());

        let err = decode_inputs::<Inputs>("p", json!({ "productName": 3 })).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }
}
