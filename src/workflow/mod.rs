//! Workflow engine for running product-management processes.
//!
//! A process is an ordinary async function over a [`RunContext`]. It issues
//! task units, fans them out, pauses at breakpoints and checks quality
//! gates, while the context validates every result and accumulates
//! artifacts for the run.

/// Artifact references and the per-run accumulator
pub mod artifact;
/// Per-run context handed to processes
pub mod context;
/// Process trait and the engine that runs processes
pub mod engine;
/// Quality gates
pub mod gate;
/// Index-preserving concurrent join
pub mod parallel;
/// Run state tracking
pub mod state;
/// Task definitions and descriptors
pub mod task;

// Re-export key components
pub use artifact::{Artifact, ArtifactLog};
pub use context::{Breakpoint, RunContext};
pub use engine::{Process, ProcessOutcome, ProcessRun, WorkflowEngine};
pub use gate::{GateFailure, QualityGate};
pub use state::{RunError, RunState, RunStatus};
pub use task::{
    define_task, AgentSpec, TaskCall, TaskContext, TaskDefinition, TaskDescriptor, TaskIo,
    TaskKind, TaskResult,
};
