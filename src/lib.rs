#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::bare_urls)]
#![deny(clippy::missing_panics_doc)]

//! PM-Workflows runs product-management processes as sequences of
//! schema-validated tasks delegated to an executor, with quality gates that
//! can end a run early and breakpoints that pause it for human review.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pm_workflows::{processes, AutoReviewer, StubExecutor, WorkflowEngine};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Run against the stub executor, approving every breakpoint
//!     let engine = WorkflowEngine::new(
//!         Arc::new(StubExecutor::new()),
//!         Arc::new(AutoReviewer::new()),
//!     );
//!
//!     let process = processes::find("jtbd-analysis")?;
//!     let run = engine
//!         .run(process.as_ref(), json!({ "productName": "Acme", "minimumJobCount": 0 }))
//!         .await?;
//!
//!     println!("{}", run.outcome.to_value());
//!     println!("{} artifacts from {} tasks", run.artifacts.len(), run.task_count);
//!
//!     Ok(())
//! }
//! ```

/// Configuration management
pub mod config;

/// Error types for PM-Workflows
pub mod error;

/// The executor collaborator and its decorators
pub mod executor;

/// Registered product-management processes
pub mod processes;

/// Breakpoint review
pub mod review;

/// Output contracts and their validation
pub mod schema;

/// Telemetry and observability
pub mod telemetry;

/// Workflow engine for running processes and tracking run state
pub mod workflow;

// Re-export workflow types
pub use workflow::{
    define_task, Artifact, Breakpoint, GateFailure, Process, ProcessOutcome, ProcessRun,
    QualityGate, RunContext, RunState, RunStatus, TaskCall, TaskDefinition, TaskDescriptor,
    TaskResult, WorkflowEngine,
};

// Re-export error types
pub use error::{Error, Result};

/// Re-export executor types for easier access
pub use executor::{Executor, RetryConfig, RetryingExecutor, StubExecutor};

/// Re-export review types for easier access
pub use review::{
    AutoReviewer, BreakpointRequest, ChannelReviewer, ConsoleReviewer, ReviewDecision, Reviewer,
};

/// Re-export schema types for easier access
pub use schema::{validate, Schema, SchemaError, Violation};

/// Re-export telemetry types and functions for easier access
pub use telemetry::{add_metric, init_telemetry, span_duration, TelemetryConfig};
