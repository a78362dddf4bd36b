//! SQLite-backed hot-topics repository: concurrent multi-source fetch,
//! two-layer cache (in-memory TTL + durable fallback), and the merge
//! across sources described in the aggregator's design.

mod schema;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::cache::{Clock, HotTopicsCache, SystemClock};
use crate::domain::{
    contains_ignore_case, normalize_query, HotTopicsRepository, Source, Topic, ALL_SOURCES,
};
use crate::error::TopicsError;
use crate::orchestrator;
use crate::sources::{default_adapters, Fetcher, ReqwestFetcher, SourceAdapter};
use crate::Result;

const DEFAULT_TTL_MINUTES: i64 = 10;

/// Row shape for `hot_topics` reads, hydrated with `sqlx::query_as`.
#[derive(sqlx::FromRow)]
struct HotTopicRow {
    source: String,
    rank: i64,
    title: String,
    url: Option<String>,
    hot_value: Option<f64>,
    description: Option<String>,
    fetched_at_ms: i64,
}

impl HotTopicRow {
    /// Silently drops a row that doesn't parse into a valid `Topic` (unknown
    /// source, non-positive rank, or an unrepresentable timestamp) rather
    /// than failing the whole read.
    fn into_domain(self) -> Option<Topic> {
        let source = Source::parse(&self.source).ok()?;
        if self.rank <= 0 {
            return None;
        }
        let fetched_at = DateTime::<Utc>::from_timestamp_millis(self.fetched_at_ms)?;
        Topic::new(
            source,
            self.rank as u32,
            self.title,
            self.url,
            self.hot_value,
            self.description,
            fetched_at,
        )
        .ok()
    }
}

/// Durable, cache-fronted store of hot topics across the four registered
/// sources.
pub struct SqliteHotTopicsRepository {
    pool: SqlitePool,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    fetcher: Arc<dyn Fetcher>,
    cache: HotTopicsCache,
    clock: Arc<dyn Clock>,
    ttl: ChronoDuration,
}

impl SqliteHotTopicsRepository {
    /// Open (creating if absent) a file-backed database with default
    /// adapters, a real HTTP fetcher, the system clock, and a 10-minute TTL.
    pub async fn connect(database_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);
        Self::from_options(options, default_adapters(), Arc::new(ReqwestFetcher::default())).await
    }

    /// A private, in-memory database, for tests.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true).foreign_keys(true);
        Self::from_options(options, default_adapters(), Arc::new(ReqwestFetcher::default())).await
    }

    /// An in-memory database with injected adapters/fetcher/clock/TTL, for
    /// deterministic testing without a network.
    pub async fn in_memory_with(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
        ttl: ChronoDuration,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true).foreign_keys(true);
        let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;
        schema::ensure_schema(&pool).await?;
        let cache = HotTopicsCache::new(ttl, clock.clone())?;
        Ok(Self {
            pool,
            adapters,
            fetcher,
            cache,
            clock,
            ttl,
        })
    }

    async fn from_options(
        options: SqliteConnectOptions,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;
        schema::ensure_schema(&pool).await?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ttl = ChronoDuration::minutes(DEFAULT_TTL_MINUTES);
        let cache = HotTopicsCache::new(ttl, clock.clone())?;
        Ok(Self {
            pool,
            adapters,
            fetcher,
            cache,
            clock,
            ttl,
        })
    }

    fn find_adapter(&self, source: Source) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.iter().find(|a| a.source() == source)
    }

    /// The set of sources this repository expects readings for, derived
    /// from registered adapters (or every known source if none registered).
    fn expected_sources(&self) -> Vec<Source> {
        if self.adapters.is_empty() {
            return ALL_SOURCES.to_vec();
        }
        self.adapters.iter().map(|a| a.source()).collect()
    }

    async fn fetch_one(&self, source: Source) -> Result<Vec<Topic>> {
        let adapter = self
            .find_adapter(source)
            .ok_or_else(|| TopicsError::invalid_argument(format!("no adapter registered for {source}")))?;
        adapter.fetch_topics(self.fetcher.as_ref(), self.clock.now()).await
    }

    /// A durable read is "fresh" when every source it covers has a maximum
    /// `fetched_at` within the TTL window of now. Returns `None` when the
    /// window can't be satisfied (missing source, stale source, or no rows
    /// at all).
    async fn read_fresh_from_sqlite(&self, source: Option<Source>) -> Result<Option<Vec<Topic>>> {
        let now = self.clock.now();
        let threshold_ms = (now - self.ttl).timestamp_millis();

        match source {
            Some(source) => {
                let (max_ms,): (Option<i64>,) =
                    sqlx::query_as("SELECT MAX(fetched_at_ms) FROM hot_topics WHERE source = ?")
                        .bind(source.as_str())
                        .fetch_one(&self.pool)
                        .await?;
                match max_ms {
                    Some(ms) if ms >= threshold_ms => {
                        let topics = self.list_from_sqlite(Some(source)).await?;
                        Ok((!topics.is_empty()).then_some(topics))
                    }
                    _ => Ok(None),
                }
            }
            None => {
                let rows: Vec<(String, Option<i64>)> =
                    sqlx::query_as("SELECT source, MAX(fetched_at_ms) FROM hot_topics GROUP BY source")
                        .fetch_all(&self.pool)
                        .await?;
                let max_by_source: std::collections::HashMap<String, i64> =
                    rows.into_iter().filter_map(|(source, ms)| ms.map(|ms| (source, ms))).collect();

                for expected in self.expected_sources() {
                    match max_by_source.get(expected.as_str()) {
                        Some(ms) if *ms >= threshold_ms => {}
                        _ => return Ok(None),
                    }
                }
                let topics = self.list_from_sqlite(None).await?;
                Ok((!topics.is_empty()).then_some(topics))
            }
        }
    }

    async fn read_any_from_sqlite(&self, source: Option<Source>) -> Result<Option<Vec<Topic>>> {
        let topics = self.list_from_sqlite(source).await?;
        Ok((!topics.is_empty()).then_some(topics))
    }

    async fn list_from_sqlite(&self, source: Option<Source>) -> Result<Vec<Topic>> {
        let rows: Vec<HotTopicRow> = match source {
            Some(source) => {
                sqlx::query_as(
                    "SELECT source, rank, title, url, hot_value, description, fetched_at_ms \
                     FROM hot_topics WHERE source = ? ORDER BY rank ASC",
                )
                .bind(source.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                let order_sql = case_order_clause("source", &self.expected_sources());
                let sql = format!(
                    "SELECT source, rank, title, url, hot_value, description, fetched_at_ms \
                     FROM hot_topics ORDER BY {order_sql}, rank ASC"
                );
                sqlx::query_as(&sql).fetch_all(&self.pool).await?
            }
        };

        Ok(rows.into_iter().filter_map(HotTopicRow::into_domain).collect())
    }

    /// Delete and re-insert every row for `source`, atomically. Never
    /// touches other sources' rows.
    async fn replace_topics(&self, source: Source, topics: &[Topic]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        replace_topics_tx(&mut tx, source, topics).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Replace rows for every successfully-fetched source in one
    /// transaction; a per-source failure simply omits that source.
    async fn replace_many(&self, attempts: &[orchestrator::FetchAttempt]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for attempt in attempts {
            if let Ok(topics) = &attempt.result {
                replace_topics_tx(&mut tx, attempt.source, topics).await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn replace_topics_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    source: Source,
    topics: &[Topic],
) -> Result<()> {
    sqlx::query("DELETE FROM hot_topics WHERE source = ?")
        .bind(source.as_str())
        .execute(&mut **tx)
        .await?;
    for topic in topics {
        if topic.source != source {
            continue;
        }
        sqlx::query(
            "INSERT INTO hot_topics(id, source, rank, title, url, hot_value, description, fetched_at_ms) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(topic.id())
        .bind(topic.source.as_str())
        .bind(topic.rank as i64)
        .bind(&topic.title)
        .bind(&topic.url)
        .bind(topic.hot_value)
        .bind(&topic.description)
        .bind(topic.fetched_at.timestamp_millis())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// `CASE source WHEN 'weibo' THEN 0 WHEN 'zhihu' THEN 1 ... ELSE n END` —
/// orders rows by adapter registration index, the same technique the
/// article repository uses to preserve an `IN (...)` hydration order.
fn case_order_clause(column: &str, sources: &[Source]) -> String {
    let mut clause = format!("CASE {column}");
    for (i, source) in sources.iter().enumerate() {
        clause.push_str(&format!(" WHEN '{}' THEN {}", source.as_str(), i));
    }
    clause.push_str(&format!(" ELSE {} END", sources.len()));
    clause
}

#[async_trait]
impl HotTopicsRepository for SqliteHotTopicsRepository {
    async fn get_hot_topics(&self, source: Option<Source>, force_refresh: bool) -> Result<Vec<Topic>> {
        if !force_refresh {
            if let Some(cached) = self.cache.hot.get(&HotTopicsCache::hot_key(source)) {
                return Ok(cached);
            }
            if let Some(topics) = self.read_fresh_from_sqlite(source).await? {
                self.cache.hot.set(HotTopicsCache::hot_key(source), topics.clone());
                return Ok(topics);
            }
        }

        match source {
            Some(source) => match self.fetch_one(source).await {
                Ok(topics) => {
                    self.replace_topics(source, &topics).await?;
                    self.cache.hot.set(HotTopicsCache::hot_key(Some(source)), topics.clone());
                    Ok(topics)
                }
                Err(err) => {
                    if !force_refresh {
                        if let Some(fallback) = self.read_any_from_sqlite(Some(source)).await? {
                            self.cache
                                .hot
                                .set(HotTopicsCache::hot_key(Some(source)), fallback.clone());
                            return Ok(fallback);
                        }
                    }
                    Err(err)
                }
            },
            None => {
                let attempts = orchestrator::fetch_all(&self.adapters, self.fetcher.clone(), self.clock.now()).await;
                let merged = orchestrator::merge_across_sources(&self.adapters, &attempts);

                if merged.is_empty() {
                    if let Some(first_err) = attempts.iter().find_map(|a| a.result.as_ref().err()) {
                        if !force_refresh {
                            if let Some(fallback) = self.read_any_from_sqlite(None).await? {
                                self.cache.hot.set(HotTopicsCache::hot_key(None), fallback.clone());
                                return Ok(fallback);
                            }
                        }
                        return Err(TopicsError::provider(format!(
                            "all hot-topic sources failed: {first_err}"
                        )));
                    }
                }

                self.replace_many(&attempts).await?;
                self.cache.hot.set(HotTopicsCache::hot_key(None), merged.clone());
                for attempt in &attempts {
                    if let Ok(topics) = &attempt.result {
                        if !topics.is_empty() {
                            self.cache
                                .hot
                                .set(HotTopicsCache::hot_key(Some(attempt.source)), topics.clone());
                        }
                    }
                }
                Ok(merged)
            }
        }
    }

    async fn refresh_hot_topics(&self, source: Option<Source>) -> Result<Vec<Topic>> {
        self.cache.invalidate_for_refresh(source);
        self.get_hot_topics(source, true).await
    }

    async fn search_hot_topics(
        &self,
        query: &str,
        source: Option<Source>,
        force_refresh: bool,
    ) -> Result<Vec<Topic>> {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return self.get_hot_topics(source, force_refresh).await;
        }

        if !force_refresh {
            if let Some(cached) = self.cache.search.get(&HotTopicsCache::search_key(source, &normalized)) {
                return Ok(cached);
            }
        }

        let base = self.get_hot_topics(source, force_refresh).await?;
        let filtered: Vec<Topic> = base
            .into_iter()
            .filter(|topic| {
                contains_ignore_case(&topic.title, &normalized)
                    || topic
                        .description
                        .as_deref()
                        .is_some_and(|d| contains_ignore_case(d, &normalized))
            })
            .collect();

        self.cache
            .search
            .set(HotTopicsCache::search_key(source, &normalized), filtered.clone());
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::FetchResponse;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FixedClock(AtomicI64);

    impl FixedClock {
        fn new(ms: i64) -> Self {
            Self(AtomicI64::new(ms))
        }

        fn advance(&self, ms: i64) {
            self.0.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::<Utc>::from_timestamp_millis(self.0.load(Ordering::SeqCst)).unwrap()
        }
    }

    struct CannedAdapter {
        source: Source,
        topics: Vec<(u32, &'static str)>,
        fails: bool,
    }

    impl SourceAdapter for CannedAdapter {
        fn source(&self) -> Source {
            self.source
        }
        fn url(&self) -> &str {
            "https://example.invalid"
        }
        fn parse(&self, _body: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Topic>> {
            if self.fails {
                return Err(TopicsError::provider("adapter failure"));
            }
            Ok(self
                .topics
                .iter()
                .map(|(rank, title)| Topic::new(self.source, *rank, *title, None, None, None, fetched_at).unwrap())
                .collect())
        }
    }

    struct OkFetcher;

    #[async_trait]
    impl Fetcher for OkFetcher {
        async fn fetch(&self, _url: &str) -> Result<FetchResponse> {
            Ok(FetchResponse {
                status: 200,
                body: "{}".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn get_all_merges_by_registration_order_and_ignores_a_failing_source() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(CannedAdapter {
                source: Source::Weibo,
                topics: vec![(2, "w2"), (1, "w1")],
                fails: false,
            }),
            Arc::new(CannedAdapter {
                source: Source::Zhihu,
                topics: vec![],
                fails: true,
            }),
        ];
        let repo = SqliteHotTopicsRepository::in_memory_with(
            adapters,
            Arc::new(OkFetcher),
            Arc::new(FixedClock::new(0)),
            ChronoDuration::minutes(10),
        )
        .await
        .unwrap();

        let topics = repo.get_hot_topics(None, false).await.unwrap();
        let titles: Vec<&str> = topics.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["w1", "w2"]);

        let weibo_rows = repo.list_from_sqlite(Some(Source::Weibo)).await.unwrap();
        assert_eq!(weibo_rows.len(), 2);
        let zhihu_rows = repo.list_from_sqlite(Some(Source::Zhihu)).await.unwrap();
        assert!(zhihu_rows.is_empty());
    }

    #[tokio::test]
    async fn single_source_failure_falls_back_to_durable_rows_unless_forced() {
        let adapter: Arc<dyn SourceAdapter> = Arc::new(CannedAdapter {
            source: Source::Weibo,
            topics: vec![(1, "stale")],
            fails: false,
        });
        let clock = Arc::new(FixedClock::new(0));
        let repo = SqliteHotTopicsRepository::in_memory_with(
            vec![adapter.clone()],
            Arc::new(OkFetcher),
            clock.clone(),
            ChronoDuration::milliseconds(1),
        )
        .await
        .unwrap();

        // Prime durable storage, then advance time well past the TTL so
        // both the cache entry and the "fresh" durable read go stale.
        repo.get_hot_topics(Some(Source::Weibo), false).await.unwrap();
        clock.advance(100);

        let failing_adapter: Arc<dyn SourceAdapter> = Arc::new(CannedAdapter {
            source: Source::Weibo,
            topics: vec![],
            fails: true,
        });
        let repo2 = SqliteHotTopicsRepository {
            adapters: vec![failing_adapter],
            ..repo
        };

        let topics = repo2.get_hot_topics(Some(Source::Weibo), false).await.unwrap();
        assert_eq!(topics[0].title, "stale");

        let err = repo2.get_hot_topics(Some(Source::Weibo), true).await.unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Provider);
    }

    #[tokio::test]
    async fn search_empty_query_degrades_to_get() {
        let adapter: Arc<dyn SourceAdapter> = Arc::new(CannedAdapter {
            source: Source::Weibo,
            topics: vec![(1, "hello")],
            fails: false,
        });
        let repo = SqliteHotTopicsRepository::in_memory_with(
            vec![adapter],
            Arc::new(OkFetcher),
            Arc::new(FixedClock::new(0)),
            ChronoDuration::minutes(10),
        )
        .await
        .unwrap();

        let via_search = repo.search_hot_topics("", None, false).await.unwrap();
        assert_eq!(via_search.len(), 1);
        assert_eq!(via_search[0].title, "hello");
    }

    #[tokio::test]
    async fn search_filters_case_insensitively_without_reranking() {
        let adapter: Arc<dyn SourceAdapter> = Arc::new(CannedAdapter {
            source: Source::Weibo,
            topics: vec![(1, "Breaking News"), (2, "Sports Update")],
            fails: false,
        });
        let repo = SqliteHotTopicsRepository::in_memory_with(
            vec![adapter],
            Arc::new(OkFetcher),
            Arc::new(FixedClock::new(0)),
            ChronoDuration::minutes(10),
        )
        .await
        .unwrap();

        let results = repo.search_hot_topics("BREAKING", None, false).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Breaking News");
    }
}
