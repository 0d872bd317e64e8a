//! The executor seam.
//!
//! An [`Executor`] performs the work a [`TaskDescriptor`] describes, usually
//! by handing it to an LLM agent runtime, and returns the raw result. The
//! engine validates whatever comes back; executors are not trusted to
//! honour the output contract.
//!
//! Retry and timeout policy belong here, not in the engine: wrap any
//! executor in a [`RetryingExecutor`] to opt in.

mod retry;
mod stub;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::workflow::task::TaskDescriptor;

pub use retry::{RetryConfig, RetryingExecutor};
pub use stub::StubExecutor;

/// Performs delegated work
#[async_trait]
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Execute one task invocation and return its raw result
    async fn execute(&self, descriptor: &TaskDescriptor) -> anyhow::Result<Value>;
}

#[async_trait]
impl<E: Executor + ?Sized> Executor for Arc<E> {
    async fn execute(&self, descriptor: &TaskDescriptor) -> anyhow::Result<Value> {
        (**self).execute(descriptor).await
    }
}
