//! Fan-out helpers.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;

/// Run every future concurrently, at most `limit` at a time, and collect the
/// results in input order.
///
/// Fails fast: the first error is returned and the outstanding futures are
/// dropped.
pub async fn all<I, F, T, E>(futures: I, limit: usize) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    stream::iter(futures)
        .buffered(limit.max(1))
        .try_collect()
        .await
}
