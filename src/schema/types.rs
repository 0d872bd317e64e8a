use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Primitive type names accepted in the `type` keyword of an output contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// JSON object
    Object,
    /// JSON array
    Array,
    /// JSON string
    String,
    /// Any JSON number
    Number,
    /// JSON number without a fractional part
    Integer,
    /// JSON boolean
    Boolean,
}

impl SchemaType {
    /// Parse a `type` keyword value
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// The `type` keyword spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    /// Describe the JSON type of a value using the same vocabulary
    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled output contract.
///
/// This is the closed grammar the engine understands. Anything outside of it
/// is rejected by [`Schema::compile`](crate::schema::Schema::compile) rather
/// than silently ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// A record with named properties
    Object {
        /// Declared properties, keyed by name
        properties: BTreeMap<String, Schema>,
        /// Names that must be present
        required: Vec<String>,
        /// Whether undeclared properties are tolerated
        additional_properties: bool,
    },
    /// A homogeneous list
    Array {
        /// Schema applied to every element
        items: Option<Box<Schema>>,
        /// Lower bound on the element count
        min_items: Option<usize>,
        /// Upper bound on the element count
        max_items: Option<usize>,
    },
    /// A string, optionally restricted to an enumeration
    String {
        /// Allowed values
        allowed: Option<Vec<String>>,
    },
    /// A number (`integer` is a number that must be whole)
    Number {
        /// Whether a fractional part is rejected
        integer: bool,
        /// Inclusive lower bound
        minimum: Option<f64>,
        /// Inclusive upper bound
        maximum: Option<f64>,
        /// Allowed values
        allowed: Option<Vec<f64>>,
    },
    /// A boolean
    Boolean,
    /// A schema with neither `type` nor a keyword implying one; accepts anything
    Any,
}

/// Rule broken by a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A required property is absent
    MissingRequired {
        /// The missing property name
        field: String,
    },
    /// The value has the wrong JSON type
    TypeMismatch {
        /// Type the contract declares
        expected: SchemaType,
        /// Type actually found
        found: String,
    },
    /// The value is not one of the enumerated values
    EnumMismatch {
        /// Allowed values
        allowed: Vec<Value>,
    },
    /// A number is below `minimum`
    BelowMinimum {
        /// Declared bound
        minimum: f64,
        /// Offending value
        actual: f64,
    },
    /// A number is above `maximum`
    AboveMaximum {
        /// Declared bound
        maximum: f64,
        /// Offending value
        actual: f64,
    },
    /// An array is shorter than `minItems`
    TooFewItems {
        /// Declared bound
        min_items: usize,
        /// Actual length
        actual: usize,
    },
    /// An array is longer than `maxItems`
    TooManyItems {
        /// Declared bound
        max_items: usize,
        /// Actual length
        actual: usize,
    },
    /// A property not declared under `additionalProperties: false`
    UnexpectedProperty {
        /// The undeclared property name
        field: String,
    },
}

/// A single validation failure, located by its path inside the value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted path with array indices, e.g. `kpis[2].thresholds.warning`.
    /// Empty for the root value.
    pub path: String,
    /// The rule that failed
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl Violation {
    pub(crate) fn new(path: &str, kind: ViolationKind) -> Self {
        Self {
            path: path.to_string(),
            kind,
        }
    }

    /// Name of the offending field, if the violation concerns a named property
    pub fn field(&self) -> Option<&str> {
        match &self.kind {
            ViolationKind::MissingRequired { field } | ViolationKind::UnexpectedProperty { field } => {
                Some(field)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.path.is_empty() { "<root>" } else { &self.path };
        match &self.kind {
            ViolationKind::MissingRequired { .. } => write!(f, "{}: missing required field", at),
            ViolationKind::TypeMismatch { expected, found } => {
                write!(f, "{}: expected {}, found {}", at, expected, found)
            }
            ViolationKind::EnumMismatch { allowed } => {
                let allowed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                write!(f, "{}: value not in [{}]", at, allowed.join(", "))
            }
            ViolationKind::BelowMinimum { minimum, actual } => {
                write!(f, "{}: {} is below minimum {}", at, actual, minimum)
            }
            ViolationKind::AboveMaximum { maximum, actual } => {
                write!(f, "{}: {} is above maximum {}", at, actual, maximum)
            }
            ViolationKind::TooFewItems { min_items, actual } => {
                write!(f, "{}: {} items, at least {} required", at, actual, min_items)
            }
            ViolationKind::TooManyItems { max_items, actual } => {
                write!(f, "{}: {} items, at most {} allowed", at, actual, max_items)
            }
            ViolationKind::UnexpectedProperty { .. } => write!(f, "{}: property not allowed", at),
        }
    }
}

/// Malformed output contract.
///
/// These are configuration errors in a task definition, never the fault of
/// the value being validated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A schema node is not a JSON object
    #[error("schema at `{path}` must be an object")]
    NotAnObject {
        /// Location of the node inside the schema
        path: String,
    },

    /// `type` names something outside the supported grammar
    #[error("schema at `{path}` has unknown type `{type_name}`")]
    UnknownType {
        /// Location of the node inside the schema
        path: String,
        /// The offending type name
        type_name: String,
    },

    /// A keyword carries a value of the wrong shape
    #[error("schema at `{path}` has invalid `{keyword}`: {reason}")]
    InvalidKeyword {
        /// Location of the node inside the schema
        path: String,
        /// The keyword
        keyword: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// A `required` entry is not declared under `properties`
    #[error("schema at `{path}` requires `{field}` but does not declare it")]
    RequiredNotDeclared {
        /// Location of the node inside the schema
        path: String,
        /// The undeclared field
        field: String,
    },
}

/// Render a list of violations on one line
pub fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
