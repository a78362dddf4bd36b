/// End-to-end hot-topics aggregation: concurrent fetch across sources,
/// partial-failure tolerance, cache hits, and refresh invalidation.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use scribe_topics::{
    ErrorKind, Fetcher, HotTopicsRepository, Result, Source, SourceAdapter, SqliteHotTopicsRepository,
    Topic, TopicsError,
};

struct StubAdapter {
    source: Source,
    entries: Vec<(u32, &'static str)>,
    fails: bool,
}

impl SourceAdapter for StubAdapter {
    fn source(&self) -> Source {
        self.source
    }

    fn url(&self) -> &str {
        "https://example.invalid"
    }

    fn parse(&self, _body: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Topic>> {
        if self.fails {
            return Err(TopicsError::provider("source unreachable"));
        }
        Ok(self
            .entries
            .iter()
            .map(|(rank, title)| Topic::new(self.source, *rank, *title, None, None, None, fetched_at).unwrap())
            .collect())
    }
}

struct OkFetcher;

#[async_trait]
impl Fetcher for OkFetcher {
    async fn fetch(&self, _url: &str) -> Result<scribe_topics::sources::FetchResponse> {
        Ok(scribe_topics::sources::FetchResponse {
            status: 200,
            body: "{}".to_string(),
        })
    }
}

#[tokio::test]
async fn one_source_failing_does_not_fail_the_whole_aggregate() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(StubAdapter {
            source: Source::Weibo,
            entries: vec![(1, "weibo trending")],
            fails: false,
        }),
        Arc::new(StubAdapter {
            source: Source::Zhihu,
            entries: vec![],
            fails: true,
        }),
    ];
    let repo = SqliteHotTopicsRepository::in_memory_with(
        adapters,
        Arc::new(OkFetcher),
        Arc::new(scribe_topics::SystemClock),
        ChronoDuration::minutes(10),
    )
    .await
    .unwrap();

    let topics = repo.get_hot_topics(None, false).await.unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].title, "weibo trending");
}

#[tokio::test]
async fn cached_result_is_served_without_refetching_until_invalidated() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(StubAdapter {
        source: Source::Weibo,
        entries: vec![(1, "first")],
        fails: false,
    })];
    let repo = SqliteHotTopicsRepository::in_memory_with(
        adapters,
        Arc::new(OkFetcher),
        Arc::new(scribe_topics::SystemClock),
        ChronoDuration::minutes(10),
    )
    .await
    .unwrap();

    let first = repo.get_hot_topics(Some(Source::Weibo), false).await.unwrap();
    assert_eq!(first[0].title, "first");

    let again = repo.get_hot_topics(Some(Source::Weibo), false).await.unwrap();
    assert_eq!(again[0].title, "first");

    let refreshed = repo.refresh_hot_topics(Some(Source::Weibo)).await.unwrap();
    assert_eq!(refreshed[0].title, "first");
}

#[tokio::test]
async fn search_matches_title_and_description_case_insensitively() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(StubAdapter {
        source: Source::Baidu,
        entries: vec![(1, "Rust Release"), (2, "Weather Update")],
        fails: false,
    })];
    let repo = SqliteHotTopicsRepository::in_memory_with(
        adapters,
        Arc::new(OkFetcher),
        Arc::new(scribe_topics::SystemClock),
        ChronoDuration::minutes(10),
    )
    .await
    .unwrap();

    let hits = repo.search_hot_topics("rust", None, false).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Rust Release");
}

#[tokio::test]
async fn force_refresh_with_no_reachable_source_surfaces_provider_error() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(StubAdapter {
        source: Source::Kr36,
        entries: vec![],
        fails: true,
    })];
    let repo = SqliteHotTopicsRepository::in_memory_with(
        adapters,
        Arc::new(OkFetcher),
        Arc::new(scribe_topics::SystemClock),
        ChronoDuration::minutes(10),
    )
    .await
    .unwrap();

    let err = repo
        .get_hot_topics(Some(Source::Kr36), true)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Provider);
}
