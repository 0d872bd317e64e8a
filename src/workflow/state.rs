use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a process run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created, not started
    Initialized,
    /// Process function executing
    Running,
    /// Ran to completion
    Completed,
    /// Stopped early by a quality gate
    Halted,
    /// Aborted by an error
    Failed,
}

impl RunStatus {
    /// Whether the run has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Halted | Self::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Halted => "halted",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Error information recorded on a failed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunError {
    /// Kind of failure
    #[serde(rename = "type")]
    pub error_type: String,
    /// Rendered error
    pub message: String,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}

/// Represents the current state of a process run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    /// Current status
    pub status: RunStatus,

    /// Process being run
    pub process_id: String,

    /// Timestamp of the last update
    pub updated_at: Option<DateTime<Utc>>,

    /// Error information if the run failed
    pub error: Option<RunError>,

    /// Phase whose gate halted the run
    pub halted_at: Option<String>,
}

impl RunState {
    /// Create a new run state
    pub fn new(process_id: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Initialized,
            process_id: process_id.into(),
            updated_at: None,
            error: None,
            halted_at: None,
        }
    }

    /// Update the status of the run
    pub fn update_status(&mut self, status: RunStatus) {
        self.status = status;
        self.updated_at = Some(Utc::now());
    }

    /// Mark the run as stopped by the gate guarding `phase`
    pub fn halt(&mut self, phase: &str) {
        self.halted_at = Some(phase.to_string());
        self.update_status(RunStatus::Halted);
    }

    /// Record an error and mark the run as failed
    pub fn record_error(&mut self, error_type: &str, message: &str) {
        self.error = Some(RunError {
            error_type: error_type.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        });
        self.update_status(RunStatus::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut state = RunState::new("product-management/jtbd-analysis");
        assert_eq!(state.status, RunStatus::Initialized);
        assert!(state.updated_at.is_none());

        state.update_status(RunStatus::Running);
        assert!(!state.status.is_terminal());

        state.halt("job-identification");
        assert!(state.status.is_terminal());
        assert_eq!(state.halted_at.as_deref(), Some("job-identification"));
        assert_eq!(state.status.to_string(), "halted");
    }

    #[test]
    fn test_record_error() {
        let mut state = RunState::new("p");
        state.record_error("SchemaViolation", "task `x` returned an invalid result");

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"]["type"], "SchemaViolation");
    }
}
