//! Minimal conforming instances, used by the stub executor and dry runs.

use serde_json::{Map, Number, Value};

use super::types::Schema;

/// Build the smallest value that satisfies `schema`.
///
/// Objects get their required properties only, arrays get exactly
/// `minItems` elements, strings take the first enumerated value (or a
/// placeholder naming their field), numbers are clamped into range.
pub fn minimal_instance(schema: &Schema) -> Value {
    instance(schema, "value")
}

fn instance(schema: &Schema, name: &str) -> Value {
    match schema {
        Schema::Any => Value::Null,
        Schema::Boolean => Value::Bool(false),
        Schema::String { allowed } => match allowed.as_ref().and_then(|a| a.first()) {
            Some(first) => Value::String(first.clone()),
            None => Value::String(format!("stub {}", name)),
        },
        Schema::Number {
            integer,
            minimum,
            maximum,
            allowed,
        } => {
            if let Some(first) = allowed.as_ref().and_then(|a| a.first()) {
                return number(*first, *integer);
            }
            let mut n = minimum.unwrap_or(0.0).max(0.0);
            if let Some(max) = maximum {
                n = n.min(*max);
            }
            if let Some(min) = minimum {
                n = n.max(*min);
            }
            if *integer {
                n = n.ceil();
            }
            number(n, *integer)
        }
        Schema::Array {
            items, min_items, ..
        } => {
            let count = min_items.unwrap_or(0);
            let element = items
                .as_deref()
                .map(|s| instance(s, name))
                .unwrap_or(Value::Null);
            Value::Array(vec![element; count])
        }
        Schema::Object {
            properties,
            required,
            ..
        } => {
            let mut record = Map::new();
            // Compilation guarantees every required field is declared
            for field in required {
                if let Some(field_schema) = properties.get(field) {
                    record.insert(field.clone(), instance(field_schema, field));
                }
            }
            Value::Object(record)
        }
    }
}

fn number(n: f64, integer: bool) -> Value {
    if integer {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::Number(Number::from(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_instance_validates() {
        let schema = Schema::compile(&json!({
            "type": "object",
            "required": ["jobs", "confidence", "tier", "done"],
            "properties": {
                "jobs": {
                    "type": "array",
                    "minItems": 2,
                    "items": {
                        "type": "object",
                        "required": ["statement"],
                        "properties": { "statement": { "type": "string" } }
                    }
                },
                "confidence": { "type": "number", "minimum": 0.5, "maximum": 1 },
                "tier": { "type": "string", "enum": ["gold", "silver"] },
                "done": { "type": "boolean" },
                "notes": { "type": "string" }
            }
        }))
        .unwrap();

        let value = minimal_instance(&schema);
        assert!(schema.is_valid(&value), "{}", value);
        assert_eq!(value["jobs"].as_array().unwrap().len(), 2);
        assert_eq!(value["tier"], "gold");
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn test_integer_bounds() {
        let schema = Schema::compile(&json!({ "type": "integer", "minimum": 2.5, "maximum": 9 })).unwrap();
        assert_eq!(minimal_instance(&schema), json!(3));

        let negative = Schema::compile(&json!({ "type": "number", "maximum": -4 })).unwrap();
        assert!(negative.is_valid(&minimal_instance(&negative)));
    }
}
