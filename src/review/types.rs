use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::workflow::artifact::Artifact;

/// Snapshot presented to the reviewer at a breakpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointContext {
    /// Run the breakpoint belongs to
    pub run_id: String,

    /// Artifacts produced so far, plus any breakpoint-only files
    pub files: Vec<Artifact>,

    /// Key metrics so far
    pub summary: Map<String, Value>,
}

/// A request for human review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointRequest {
    /// Unique identifier for this request
    pub request_id: String,

    /// Short label
    pub title: String,

    /// The question put to the reviewer
    pub question: String,

    /// State of the run at this point
    pub context: BreakpointContext,

    /// When the breakpoint was reached
    pub created_at: DateTime<Utc>,
}

impl BreakpointRequest {
    /// Create a new request
    pub fn new(
        title: impl Into<String>,
        question: impl Into<String>,
        context: BreakpointContext,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            title: title.into(),
            question: question.into(),
            context,
            created_at: Utc::now(),
        }
    }
}

/// How a reviewer resolved a breakpoint.
///
/// The engine records the decision but does not branch on it: every
/// resolution lets the run continue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ReviewDecision {
    /// The reviewer is satisfied
    Approved,
    /// The reviewer objects
    Rejected {
        /// Why
        reason: String,
    },
    /// The reviewer postponed a decision
    Deferred,
}

impl ReviewDecision {
    /// Whether the reviewer objected
    pub fn is_rejected(&self) -> bool {
        matches!(self, ReviewDecision::Rejected { .. })
    }

    /// Parse a free-form console answer.
    ///
    /// Empty input and `y`/`yes`/`approve` approve, `d`/`defer` defers,
    /// `n`/`no`/`reject` optionally followed by a reason rejects. Anything
    /// else is kept verbatim as a rejection reason.
    pub fn parse(answer: &str) -> Self {
        let answer = answer.trim();
        let (head, rest) = match answer.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (answer, ""),
        };
        match head.to_ascii_lowercase().as_str() {
            "" | "y" | "yes" | "approve" | "approved" | "ok" => ReviewDecision::Approved,
            "d" | "defer" | "later" => ReviewDecision::Deferred,
            "n" | "no" | "reject" | "rejected" => ReviewDecision::Rejected {
                reason: rest.to_string(),
            },
            _ => ReviewDecision::Rejected {
                reason: answer.to_string(),
            },
        }
    }
}

/// Record of one resolved breakpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    /// ID of the original request
    pub request_id: String,

    /// Breakpoint title
    pub title: String,

    /// The reviewer's decision
    #[serde(flatten)]
    pub decision: ReviewDecision,

    /// When the decision arrived
    pub resolved_at: DateTime<Utc>,
}

/// Resolves breakpoints.
///
/// `review` suspends the caller until the reviewer responds. There is no
/// engine-level timeout: an implementation that never answers leaves the
/// run pending.
#[async_trait]
pub trait Reviewer: Send + Sync + std::fmt::Debug {
    /// Present a breakpoint and wait for its resolution
    async fn review(&self, request: BreakpointRequest) -> anyhow::Result<ReviewDecision>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_answers() {
        assert_eq!(ReviewDecision::parse(""), ReviewDecision::Approved);
        assert_eq!(ReviewDecision::parse("  Yes "), ReviewDecision::Approved);
        assert_eq!(ReviewDecision::parse("defer"), ReviewDecision::Deferred);
        assert_eq!(
            ReviewDecision::parse("no  board is too large"),
            ReviewDecision::Rejected {
                reason: "board is too large".to_string()
            }
        );
        assert_eq!(
            ReviewDecision::parse("needs another pass"),
            ReviewDecision::Rejected {
                reason: "needs another pass".to_string()
            }
        );
    }

    #[test]
    fn test_request_payload_shape() {
        let mut summary = Map::new();
        summary.insert("coreJobs".to_string(), json!(4));
        let request = BreakpointRequest::new(
            "Job identification",
            "Review the identified jobs?",
            BreakpointContext {
                run_id: "run-1".to_string(),
                files: vec![Artifact::new("jobs.md", "markdown")],
                summary,
            },
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["question"], "Review the identified jobs?");
        assert_eq!(value["context"]["runId"], "run-1");
        assert_eq!(value["context"]["files"][0]["path"], "jobs.md");
        assert_eq!(value["context"]["summary"]["coreJobs"], 4);
    }

    #[test]
    fn test_record_flattens_decision() {
        let record = ReviewRecord {
            request_id: "r".to_string(),
            title: "Sign-off".to_string(),
            decision: ReviewDecision::Rejected {
                reason: "budget".to_string(),
            },
            resolved_at: Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["decision"], "rejected");
        assert_eq!(value["reason"], "budget");
    }
}
