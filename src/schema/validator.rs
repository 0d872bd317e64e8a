//! Compilation of JSON-Schema-like contracts and recursive validation.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use super::types::{Schema, SchemaError, SchemaType, Violation, ViolationKind};

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

fn schema_path(path: &str) -> String {
    if path.is_empty() {
        "#".to_string()
    } else {
        format!("#/{}", path)
    }
}

fn invalid(path: &str, keyword: &'static str, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidKeyword {
        path: schema_path(path),
        keyword,
        reason: reason.into(),
    }
}

fn optional_usize(
    node: &Map<String, Value>,
    keyword: &'static str,
    path: &str,
) -> Result<Option<usize>, SchemaError> {
    match node.get(keyword) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| invalid(path, keyword, "expected a non-negative integer")),
    }
}

fn optional_f64(
    node: &Map<String, Value>,
    keyword: &'static str,
    path: &str,
) -> Result<Option<f64>, SchemaError> {
    match node.get(keyword) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(path, keyword, "expected a number")),
    }
}

impl Schema {
    /// Compile a JSON-Schema-like literal into a [`Schema`] tree.
    ///
    /// Fails on anything outside the supported grammar, and enforces the
    /// definition-time invariants: every `required` name is declared under
    /// `properties`, and lower bounds do not exceed upper bounds.
    pub fn compile(raw: &Value) -> Result<Self, SchemaError> {
        compile_node(raw, "")
    }

    /// Validate `value`, returning every violation found (depth-first).
    ///
    /// An empty list means the value conforms.
    #[instrument(level = "trace", skip_all)]
    pub fn validate(&self, value: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        check(self, value, "", &mut violations);
        debug!(violations = violations.len(), "Validated value against schema");
        violations
    }

    /// Whether `value` conforms
    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(value).is_empty()
    }
}

/// Validate `value` against a raw schema literal.
///
/// `Err` means the schema itself is malformed; `Ok` carries the violation
/// list, which is empty when the value conforms.
pub fn validate(value: &Value, schema: &Value) -> Result<Vec<Violation>, SchemaError> {
    Ok(Schema::compile(schema)?.validate(value))
}

const OBJECT_KEYWORDS: [&str; 3] = ["properties", "required", "additionalProperties"];
const ARRAY_KEYWORDS: [&str; 3] = ["items", "minItems", "maxItems"];
const SCALAR_KEYWORDS: [&str; 3] = ["enum", "minimum", "maximum"];

/// Type of a node that omits `type`.
///
/// Object and array keywords imply their type. Scalar keywords are ambiguous
/// between string, number and integer, so they need an explicit `type`. A node
/// with none of these keywords accepts anything.
fn implied_type(node: &Map<String, Value>, path: &str) -> Result<Option<SchemaType>, SchemaError> {
    let has = |keywords: &[&str]| keywords.iter().any(|k| node.contains_key(*k));

    if let Some(keyword) = SCALAR_KEYWORDS.iter().find(|k| node.contains_key(**k)) {
        return Err(invalid(path, *keyword, "needs an explicit `type`"));
    }
    match (has(&OBJECT_KEYWORDS), has(&ARRAY_KEYWORDS)) {
        (true, true) => Err(invalid(
            path,
            "type",
            "object and array keywords are mixed without a `type`",
        )),
        (true, false) => Ok(Some(SchemaType::Object)),
        (false, true) => Ok(Some(SchemaType::Array)),
        (false, false) => Ok(None),
    }
}

fn compile_node(raw: &Value, path: &str) -> Result<Schema, SchemaError> {
    let node = raw.as_object().ok_or_else(|| SchemaError::NotAnObject {
        path: schema_path(path),
    })?;

    let schema_type = match node.get("type") {
        None => match implied_type(node, path)? {
            Some(implied) => implied,
            None => return Ok(Schema::Any),
        },
        Some(Value::String(name)) => {
            SchemaType::parse(name).ok_or_else(|| SchemaError::UnknownType {
                path: schema_path(path),
                type_name: name.clone(),
            })?
        }
        Some(other) => {
            return Err(SchemaError::UnknownType {
                path: schema_path(path),
                type_name: other.to_string(),
            })
        }
    };

    match schema_type {
        SchemaType::Object => compile_object(node, path),
        SchemaType::Array => compile_array(node, path),
        SchemaType::String => {
            let allowed = match node.get("enum") {
                None => None,
                Some(Value::Array(values)) => Some(
                    values
                        .iter()
                        .map(|v| {
                            v.as_str()
                                .map(str::to_string)
                                .ok_or_else(|| invalid(path, "enum", "expected string values"))
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                Some(_) => return Err(invalid(path, "enum", "expected an array")),
            };
            Ok(Schema::String { allowed })
        }
        SchemaType::Number | SchemaType::Integer => {
            let minimum = optional_f64(node, "minimum", path)?;
            let maximum = optional_f64(node, "maximum", path)?;
            if let (Some(min), Some(max)) = (minimum, maximum) {
                if min > max {
                    return Err(invalid(path, "minimum", format!("{} exceeds maximum {}", min, max)));
                }
            }
            let allowed = match node.get("enum") {
                None => None,
                Some(Value::Array(values)) => Some(
                    values
                        .iter()
                        .map(|v| {
                            v.as_f64()
                                .ok_or_else(|| invalid(path, "enum", "expected numeric values"))
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                Some(_) => return Err(invalid(path, "enum", "expected an array")),
            };
            Ok(Schema::Number {
                integer: schema_type == SchemaType::Integer,
                minimum,
                maximum,
                allowed,
            })
        }
        SchemaType::Boolean => Ok(Schema::Boolean),
    }
}

fn compile_object(node: &Map<String, Value>, path: &str) -> Result<Schema, SchemaError> {
    let mut properties = BTreeMap::new();
    match node.get("properties") {
        None => {}
        Some(Value::Object(props)) => {
            for (name, prop) in props {
                properties.insert(name.clone(), compile_node(prop, &child_path(path, name))?);
            }
        }
        Some(_) => return Err(invalid(path, "properties", "expected an object")),
    }

    let required = match node.get("required") {
        None => Vec::new(),
        Some(Value::Array(names)) => names
            .iter()
            .map(|n| {
                n.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(path, "required", "expected string entries"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(invalid(path, "required", "expected an array")),
    };

    if let Some(field) = required.iter().find(|name| !properties.contains_key(*name)) {
        return Err(SchemaError::RequiredNotDeclared {
            path: schema_path(path),
            field: field.clone(),
        });
    }

    let additional_properties = match node.get("additionalProperties") {
        None => true,
        Some(Value::Bool(allowed)) => *allowed,
        Some(Value::Object(_)) => {
            return Err(invalid(
                path,
                "additionalProperties",
                "schemas for additional properties are not supported, expected a boolean",
            ))
        }
        Some(_) => return Err(invalid(path, "additionalProperties", "expected a boolean")),
    };

    Ok(Schema::Object {
        properties,
        required,
        additional_properties,
    })
}

fn compile_array(node: &Map<String, Value>, path: &str) -> Result<Schema, SchemaError> {
    let items = match node.get("items") {
        None => None,
        Some(items) => Some(Box::new(compile_node(items, &format!("{}[]", path))?)),
    };
    let min_items = optional_usize(node, "minItems", path)?;
    let max_items = optional_usize(node, "maxItems", path)?;
    if let (Some(min), Some(max)) = (min_items, max_items) {
        if min > max {
            return Err(invalid(path, "minItems", format!("{} exceeds maxItems {}", min, max)));
        }
    }
    Ok(Schema::Array {
        items,
        min_items,
        max_items,
    })
}

fn mismatch(expected: SchemaType, value: &Value, path: &str, out: &mut Vec<Violation>) {
    out.push(Violation::new(
        path,
        ViolationKind::TypeMismatch {
            expected,
            found: SchemaType::describe(value).to_string(),
        },
    ));
}

fn check(schema: &Schema, value: &Value, path: &str, out: &mut Vec<Violation>) {
    match schema {
        Schema::Any => {}
        Schema::Boolean => {
            if !value.is_boolean() {
                mismatch(SchemaType::Boolean, value, path, out);
            }
        }
        Schema::String { allowed } => {
            let Some(s) = value.as_str() else {
                mismatch(SchemaType::String, value, path, out);
                return;
            };
            if let Some(allowed) = allowed {
                if !allowed.iter().any(|a| a == s) {
                    out.push(Violation::new(
                        path,
                        ViolationKind::EnumMismatch {
                            allowed: allowed.iter().cloned().map(Value::String).collect(),
                        },
                    ));
                }
            }
        }
        Schema::Number {
            integer,
            minimum,
            maximum,
            allowed,
        } => {
            let expected = if *integer {
                SchemaType::Integer
            } else {
                SchemaType::Number
            };
            let Some(n) = value.as_f64() else {
                mismatch(expected, value, path, out);
                return;
            };
            if *integer && n.fract() != 0.0 {
                mismatch(expected, value, path, out);
                return;
            }
            if let Some(allowed) = allowed {
                if !allowed.iter().any(|a| *a == n) {
                    out.push(Violation::new(
                        path,
                        ViolationKind::EnumMismatch {
                            allowed: allowed.iter().map(|a| Value::from(*a)).collect(),
                        },
                    ));
                }
            }
            if let Some(min) = minimum {
                if n < *min {
                    out.push(Violation::new(
                        path,
                        ViolationKind::BelowMinimum {
                            minimum: *min,
                            actual: n,
                        },
                    ));
                }
            }
            if let Some(max) = maximum {
                if n > *max {
                    out.push(Violation::new(
                        path,
                        ViolationKind::AboveMaximum {
                            maximum: *max,
                            actual: n,
                        },
                    ));
                }
            }
        }
        Schema::Array {
            items,
            min_items,
            max_items,
        } => {
            let Some(elements) = value.as_array() else {
                mismatch(SchemaType::Array, value, path, out);
                return;
            };
            if let Some(min) = min_items {
                if elements.len() < *min {
                    out.push(Violation::new(
                        path,
                        ViolationKind::TooFewItems {
                            min_items: *min,
                            actual: elements.len(),
                        },
                    ));
                }
            }
            if let Some(max) = max_items {
                if elements.len() > *max {
                    out.push(Violation::new(
                        path,
                        ViolationKind::TooManyItems {
                            max_items: *max,
                            actual: elements.len(),
                        },
                    ));
                }
            }
            if let Some(item_schema) = items {
                for (i, element) in elements.iter().enumerate() {
                    check(item_schema, element, &index_path(path, i), out);
                }
            }
        }
        Schema::Object {
            properties,
            required,
            additional_properties,
        } => {
            let Some(record) = value.as_object() else {
                mismatch(SchemaType::Object, value, path, out);
                return;
            };
            for name in required {
                if !record.contains_key(name) {
                    out.push(Violation::new(
                        &child_path(path, name),
                        ViolationKind::MissingRequired {
                            field: name.clone(),
                        },
                    ));
                }
            }
            for (name, field_value) in record {
                match properties.get(name) {
                    Some(field_schema) => {
                        check(field_schema, field_value, &child_path(path, name), out)
                    }
                    None if !additional_properties => out.push(Violation::new(
                        &child_path(path, name),
                        ViolationKind::UnexpectedProperty {
                            field: name.clone(),
                        },
                    )),
                    None => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dashboard_schema() -> Value {
        json!({
            "type": "object",
            "required": ["kpis", "dashboardType"],
            "properties": {
                "dashboardType": { "type": "string", "enum": ["operational", "strategic"] },
                "kpis": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "required": ["name", "thresholds"],
                        "properties": {
                            "name": { "type": "string" },
                            "weight": { "type": "number", "minimum": 0, "maximum": 1 },
                            "thresholds": {
                                "type": "object",
                                "required": ["warning"],
                                "properties": {
                                    "warning": { "type": "number" },
                                    "critical": { "type": "number" }
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_valid_value_has_no_violations() {
        let value = json!({
            "dashboardType": "operational",
            "kpis": [{ "name": "Activation", "weight": 0.5, "thresholds": { "warning": 0.3 } }]
        });
        assert!(validate(&value, &dashboard_schema()).unwrap().is_empty());
    }

    #[test]
    fn test_nested_path_is_reported() {
        let value = json!({
            "dashboardType": "operational",
            "kpis": [
                { "name": "a", "thresholds": { "warning": 1 } },
                { "name": "b", "thresholds": { "warning": 1 } },
                { "name": "c", "thresholds": { "warning": "high" } }
            ]
        });
        let violations = validate(&value, &dashboard_schema()).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "kpis[2].thresholds.warning");
        assert!(matches!(
            violations[0].kind,
            ViolationKind::TypeMismatch { expected: SchemaType::Number, .. }
        ));
    }

    #[test]
    fn test_missing_required_names_the_field() {
        let value = json!({ "kpis": [] });
        let violations = validate(&value, &dashboard_schema()).unwrap();
        assert!(violations
            .iter()
            .any(|v| v.field() == Some("dashboardType") && v.path == "dashboardType"));
        assert!(violations
            .iter()
            .any(|v| matches!(v.kind, ViolationKind::TooFewItems { min_items: 1, actual: 0 })));
    }

    #[test]
    fn test_enum_and_range() {
        let value = json!({
            "dashboardType": "tactical",
            "kpis": [{ "name": "x", "weight": 1.5, "thresholds": { "warning": 0 } }]
        });
        let violations = validate(&value, &dashboard_schema()).unwrap();
        assert_eq!(violations.len(), 2);
        assert!(violations
            .iter()
            .any(|v| v.path == "dashboardType" && matches!(v.kind, ViolationKind::EnumMismatch { .. })));
        assert!(violations
            .iter()
            .any(|v| v.path == "kpis[0].weight" && matches!(v.kind, ViolationKind::AboveMaximum { .. })));
    }

    #[test]
    fn test_integer_rejects_fraction() {
        let schema = json!({ "type": "integer", "minimum": 1 });
        assert!(validate(&json!(3), &schema).unwrap().is_empty());
        assert_eq!(validate(&json!(2.5), &schema).unwrap().len(), 1);
        assert_eq!(validate(&json!(0), &schema).unwrap().len(), 1);
    }

    #[test]
    fn test_additional_properties_false() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "additionalProperties": false
        });
        let violations = validate(&json!({ "a": "x", "b": 1 }), &schema).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field(), Some("b"));
    }

    #[test]
    fn test_max_items() {
        let schema = json!({ "type": "array", "maxItems": 2, "items": { "type": "boolean" } });
        let violations = validate(&json!([true, false, "x"]), &schema).unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[1].path, "[2]");
    }

    #[test]
    fn test_unknown_type_is_a_schema_error() {
        let schema = json!({
            "type": "object",
            "properties": { "when": { "type": "date" } }
        });
        let err = validate(&json!({}), &schema).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownType {
                path: "#/when".to_string(),
                type_name: "date".to_string()
            }
        );
    }

    #[test]
    fn test_required_must_be_declared() {
        let schema = json!({
            "type": "object",
            "required": ["summary"],
            "properties": { "title": { "type": "string" } }
        });
        assert!(matches!(
            Schema::compile(&schema),
            Err(SchemaError::RequiredNotDeclared { field, .. }) if field == "summary"
        ));
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let schema = json!({ "type": "array", "minItems": 3, "maxItems": 1 });
        assert!(matches!(
            Schema::compile(&schema),
            Err(SchemaError::InvalidKeyword { keyword: "minItems", .. })
        ));
    }

    #[test]
    fn test_object_keywords_imply_object_type() {
        let schema = json!({
            "type": "object",
            "required": ["kpi"],
            "properties": {
                "kpi": {
                    "required": ["name"],
                    "properties": { "name": { "type": "string" } }
                }
            }
        });

        let violations = validate(&json!({ "kpi": {} }), &schema).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "kpi.name");
        assert!(matches!(violations[0].kind, ViolationKind::MissingRequired { .. }));

        let violations = validate(&json!({ "kpi": "Activation" }), &schema).unwrap();
        assert!(matches!(
            violations[0].kind,
            ViolationKind::TypeMismatch { expected: SchemaType::Object, .. }
        ));
    }

    #[test]
    fn test_untyped_required_must_be_declared() {
        let schema = json!({ "required": ["summary"], "properties": {} });
        assert!(matches!(
            Schema::compile(&schema),
            Err(SchemaError::RequiredNotDeclared { field, .. }) if field == "summary"
        ));
    }

    #[test]
    fn test_array_keywords_imply_array_type() {
        let schema = json!({ "minItems": 1, "items": { "type": "string" } });
        assert!(validate(&json!(["a"]), &schema).unwrap().is_empty());
        assert!(matches!(
            validate(&json!([]), &schema).unwrap()[0].kind,
            ViolationKind::TooFewItems { min_items: 1, actual: 0 }
        ));
        assert_eq!(validate(&json!({}), &schema).unwrap().len(), 1);
    }

    #[test]
    fn test_untyped_scalar_keywords_are_rejected() {
        let schema = json!({
            "type": "object",
            "properties": { "weight": { "minimum": 0 } }
        });
        assert!(matches!(
            Schema::compile(&schema),
            Err(SchemaError::InvalidKeyword { keyword: "minimum", path, .. }) if path == "#/weight"
        ));
        assert!(matches!(
            Schema::compile(&json!({ "properties": {}, "items": {} })),
            Err(SchemaError::InvalidKeyword { keyword: "type", .. })
        ));
    }

    #[test]
    fn test_untyped_node_without_keywords_accepts_anything() {
        let schema = json!({ "description": "free-form notes" });
        assert!(validate(&json!([1, "two"]), &schema).unwrap().is_empty());
        assert!(validate(&json!(null), &schema).unwrap().is_empty());
    }

    #[test]
    fn test_additional_properties_schema_is_rejected() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "additionalProperties": { "type": "string" }
        });
        assert!(matches!(
            Schema::compile(&schema),
            Err(SchemaError::InvalidKeyword { keyword: "additionalProperties", .. })
        ));
    }

    #[test]
    fn test_root_type_mismatch_display() {
        let violations = validate(&json!([]), &json!({ "type": "object" })).unwrap();
        assert_eq!(violations[0].to_string(), "<root>: expected object, found array");
    }
}
