use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::review::types::{BreakpointRequest, ReviewDecision, Reviewer};

/// Reviewer that approves every breakpoint immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoReviewer;

impl AutoReviewer {
    /// Create a new auto-approving reviewer
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Reviewer for AutoReviewer {
    async fn review(&self, request: BreakpointRequest) -> Result<ReviewDecision> {
        info!(
            "Auto-approving breakpoint: title={}, files={}",
            request.title,
            request.context.files.len()
        );
        Ok(ReviewDecision::Approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::types::BreakpointContext;
    use serde_json::Map;

    #[test]
    fn test_approves_without_waiting() {
        let request = BreakpointRequest::new(
            "Launch readiness",
            "Ship it?",
            BreakpointContext {
                run_id: "run".to_string(),
                files: Vec::new(),
                summary: Map::new(),
            },
        );

        let decision = tokio_test::block_on(AutoReviewer::new().review(request)).unwrap();
        assert_eq!(decision, ReviewDecision::Approved);
    }
}
