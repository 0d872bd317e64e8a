use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured payload returned when a quality gate stops a process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateFailure {
    /// Always `false`
    pub success: bool,
    /// What went wrong
    pub error: String,
    /// Phase whose gate failed
    pub phase: String,
    /// How to remediate
    pub recommendation: String,
    /// Measured values behind the decision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl GateFailure {
    /// Create a failure payload
    pub fn new(
        phase: impl Into<String>,
        error: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: error.into(),
            phase: phase.into(),
            recommendation: recommendation.into(),
            details: None,
        }
    }

    /// Attach measured values
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// A business-rule check that can end a process early.
///
/// Gates never raise errors. A failed check produces a [`GateFailure`] that
/// the process returns as its normal outcome.
#[derive(Debug, Clone)]
pub struct QualityGate {
    phase: String,
    recommendation: String,
}

impl QualityGate {
    /// Create a gate guarding `phase`
    pub fn new(phase: impl Into<String>, recommendation: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            recommendation: recommendation.into(),
        }
    }

    /// Phase name
    pub fn phase(&self) -> &str {
        &self.phase
    }

    /// Pass when `passed` holds, fail with `error` otherwise
    pub fn check(&self, passed: bool, error: impl Into<String>) -> Result<(), GateFailure> {
        if passed {
            Ok(())
        } else {
            Err(GateFailure::new(&self.phase, error, &self.recommendation))
        }
    }

    /// Require at least `minimum` items of `what`
    pub fn at_least(&self, what: &str, actual: usize, minimum: usize) -> Result<(), GateFailure> {
        self.check(
            actual >= minimum,
            format!("Only {} {} identified, at least {} required", actual, what, minimum),
        )
        .map_err(|failure| {
            failure.with_details(serde_json::json!({
                "actual": actual,
                "minimum": minimum,
            }))
        })
    }
}
