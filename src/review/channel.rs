use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, instrument};

use crate::review::types::{BreakpointRequest, ReviewDecision, Reviewer};

/// A breakpoint waiting for a decision
#[derive(Debug)]
struct PendingReview {
    /// The request as presented
    request: BreakpointRequest,

    /// Channel sender for resolving the waiting breakpoint
    sender: oneshot::Sender<ReviewDecision>,
}

/// Reviewer that parks every breakpoint until someone calls [`resolve`].
///
/// Useful for embedding the engine behind an external review UI, and in
/// tests that need to observe a suspended run.
///
/// [`resolve`]: ChannelReviewer::resolve
#[derive(Debug, Clone, Default)]
pub struct ChannelReviewer {
    /// Map of request id to pending reviews
    pending: Arc<Mutex<HashMap<String, PendingReview>>>,
}

/// Remove reviews whose waiting side has been dropped
fn prune_abandoned(pending: &mut HashMap<String, PendingReview>) {
    pending.retain(|request_id, p| {
        let awaited = !p.sender.is_closed();
        if !awaited {
            debug!(request_id = %request_id, "Dropping abandoned breakpoint: {}", p.request.title);
        }
        awaited
    });
}

impl ChannelReviewer {
    /// Create a new channel reviewer
    pub fn new() -> Self {
        Self::default()
    }

    /// Breakpoints currently waiting, oldest first
    ///
    /// Reviews whose caller stopped waiting are dropped here.
    pub async fn pending(&self) -> Vec<BreakpointRequest> {
        let mut pending = self.pending.lock().await;
        prune_abandoned(&mut pending);
        let mut requests: Vec<BreakpointRequest> =
            pending.values().map(|p| p.request.clone()).collect();
        requests.sort_by_key(|r| r.created_at);
        requests
    }

    /// Resolve a waiting breakpoint
    #[instrument(skip(self, decision))]
    pub async fn resolve(&self, request_id: &str, decision: ReviewDecision) -> Result<()> {
        let pending = self
            .pending
            .lock()
            .await
            .remove(request_id)
            .ok_or_else(|| anyhow!("No pending breakpoint with id {}", request_id))?;

        debug!("Resolving breakpoint: {}", pending.request.title);
        pending
            .sender
            .send(decision)
            .map_err(|_| anyhow!("Breakpoint {} is no longer awaited", request_id))
    }

    /// Resolve every waiting breakpoint with the same decision, returning how many were resolved
    pub async fn resolve_all(&self, decision: ReviewDecision) -> usize {
        let drained: Vec<PendingReview> = {
            let mut pending = self.pending.lock().await;
            pending.drain().map(|(_, p)| p).collect()
        };

        drained
            .into_iter()
            .map(|p| p.sender.send(decision.clone()).is_ok())
            .filter(|sent| *sent)
            .count()
    }
}

#[async_trait]
impl Reviewer for ChannelReviewer {
    #[instrument(skip(self, request), fields(breakpoint.title = %request.title))]
    async fn review(&self, request: BreakpointRequest) -> Result<ReviewDecision> {
        let (sender, receiver) = oneshot::channel();

        {
            let mut pending = self.pending.lock().await;
            prune_abandoned(&mut pending);
            pending.insert(
                request.request_id.clone(),
                PendingReview { request, sender },
            );
        }

        debug!("Waiting for review");
        receiver
            .await
            .map_err(|_| anyhow!("Review channel closed"))
    }
}
