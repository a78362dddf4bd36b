//! Concurrent multi-source fan-out: launch one task per registered adapter
//! and join all before the caller proceeds. This is the one explicit
//! parallelism point in the crate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::domain::{Source, Topic};
use crate::error::TopicsError;
use crate::sources::{Fetcher, SourceAdapter};

/// The outcome of fetching one source during a fan-out: either its
/// rank-sorted topics, or the error that prevented fetching them. Never
/// fails the whole fan-out — callers decide how to treat a mix of
/// successes and failures.
pub struct FetchAttempt {
    pub source: Source,
    pub result: Result<Vec<Topic>, TopicsError>,
}

/// Fetch every registered adapter concurrently via `tokio::spawn`, then
/// join all of them. A task that panics (it should never happen in normal
/// operation) is folded into that source's attempt as a provider error
/// rather than propagating and losing the other sources' results.
pub async fn fetch_all(
    adapters: &[Arc<dyn SourceAdapter>],
    fetcher: Arc<dyn Fetcher>,
    fetched_at: DateTime<Utc>,
) -> Vec<FetchAttempt> {
    let tasks = adapters.iter().map(|adapter| {
        let adapter = adapter.clone();
        let fetcher = fetcher.clone();
        tokio::spawn(async move {
            let result = adapter.fetch_topics(fetcher.as_ref(), fetched_at).await;
            (adapter.source(), result)
        })
    });

    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| match joined {
            Ok((source, result)) => FetchAttempt { source, result },
            Err(join_err) => FetchAttempt {
                // The source is unknown once the task has panicked before
                // reporting it; `Source::Weibo` is an arbitrary placeholder
                // that is never read because `result` is always `Err` here,
                // and merge/cache-write paths only consult `result`.
                source: Source::Weibo,
                result: Err(TopicsError::provider(format!("fetch task panicked: {join_err}"))),
            },
        })
        .collect()
}

/// Merge fetch attempts across sources by adapter registration order,
/// breaking ties by rank. Identical topics across sources are never
/// deduplicated.
pub fn merge_across_sources(adapters: &[Arc<dyn SourceAdapter>], attempts: &[FetchAttempt]) -> Vec<Topic> {
    let order: std::collections::HashMap<Source, usize> = adapters
        .iter()
        .enumerate()
        .map(|(i, a)| (a.source(), i))
        .collect();

    let mut merged: Vec<Topic> = attempts
        .iter()
        .filter_map(|a| a.result.as_ref().ok())
        .flat_map(|topics| topics.iter().cloned())
        .collect();

    merged.sort_by_key(|t| (order.get(&t.source).copied().unwrap_or(usize::MAX), t.rank));
    merged
}
