//! Error types for pm-workflows
//!
//! Quality gate failures are deliberately absent: a failed gate is a normal
//! [`ProcessOutcome::Halted`](crate::workflow::ProcessOutcome::Halted) return,
//! not an error. Everything here aborts the run.

use thiserror::Error;

use crate::schema::{format_violations, SchemaError, Violation};

/// A specialized Result type for workflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a process run
#[derive(Debug, Error)]
pub enum Error {
    /// A task result does not conform to its output contract
    #[error("task `{task}` returned an invalid result: {}", format_violations(.violations))]
    SchemaViolation {
        /// Name of the task definition
        task: String,
        /// Every violation found
        violations: Vec<Violation>,
    },

    /// A task declares a malformed output contract
    #[error("task `{task}` declares an invalid output schema: {source}")]
    SchemaConfig {
        /// Name of the task definition
        task: String,
        /// What is wrong with the schema
        #[source]
        source: SchemaError,
    },

    /// The executor failed to produce a result
    #[error("executor failed task `{task}`: {message}")]
    Executor {
        /// Name of the task definition
        task: String,
        /// Rendered error chain from the executor
        message: String,
    },

    /// The `artifacts` field of a task result is malformed
    #[error("task `{task}` returned malformed artifacts: {source}")]
    InvalidArtifacts {
        /// Name of the task definition
        task: String,
        /// Decoding failure
        #[source]
        source: serde_json::Error,
    },

    /// A reviewer failed while handling a breakpoint
    #[error("breakpoint `{title}` failed: {message}")]
    Review {
        /// Breakpoint title
        title: String,
        /// Rendered error chain from the reviewer
        message: String,
    },

    /// Process inputs could not be decoded
    #[error("invalid inputs for `{process}`: {message}")]
    InvalidInput {
        /// Process identifier
        process: String,
        /// Decoding failure
        message: String,
    },

    /// No process is registered under the given identifier
    #[error("unknown process: {0}")]
    UnknownProcess(String),

    /// Settings could not be loaded
    #[error("config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Name of the task that caused the error, if any
    pub fn task(&self) -> Option<&str> {
        match self {
            Error::SchemaViolation { task, .. }
            | Error::SchemaConfig { task, .. }
            | Error::Executor { task, .. }
            | Error::InvalidArtifacts { task, .. } => Some(task),
            _ => None,
        }
    }

    /// Short name of the error category
    pub fn kind(&self) -> &'static str {
        match self {
            Error::SchemaViolation { .. } => "SchemaViolation",
            Error::SchemaConfig { .. } => "SchemaConfig",
            Error::Executor { .. } => "Executor",
            Error::InvalidArtifacts { .. } => "InvalidArtifacts",
            Error::Review { .. } => "Review",
            Error::InvalidInput { .. } => "InvalidInput",
            Error::UnknownProcess(_) => "UnknownProcess",
            Error::Config(_) => "Config",
            Error::Io(_) => "Io",
            Error::Json(_) => "Json",
            Error::Yaml(_) => "Yaml",
        }
    }
}
