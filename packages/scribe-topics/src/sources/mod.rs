//! Hot-topic source adapters: one per provider, each built on the same
//! narrow `Fetcher` trait so they're testable against a canned response
//! without a network.

pub mod baidu;
pub mod kr36;
pub mod parsing;
pub mod weibo;
pub mod zhihu;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Source, Topic};
use crate::error::TopicsError;
use crate::Result;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";
const ACCEPT_HEADER: &str = "application/json, text/plain, */*";
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// A single HTTP response, reduced to what adapters need to judge success
/// and parse the body.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The transport every source adapter sits on top of, so adapters can be
/// tested against a canned fetcher without a network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// The real transport: a browser-like GET with a bounded timeout.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url)
            .header("Accept", ACCEPT_HEADER)
            .header("User-Agent", BROWSER_USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchResponse { status, body })
    }
}

/// One provider's hot-list adapter.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;
    fn url(&self) -> &str;

    async fn fetch_topics(&self, fetcher: &dyn Fetcher, fetched_at: DateTime<Utc>) -> Result<Vec<Topic>> {
        let response = fetcher.fetch(self.url()).await?;
        if !response.is_success() {
            tracing::warn!(source = %self.source(), status = response.status, "hot list fetch failed");
            return Err(TopicsError::provider(format!(
                "{} hot list failed: {}",
                self.source(),
                response.status
            )));
        }
        let mut topics = self.parse(&response.body, fetched_at)?;
        topics.sort_by_key(|t| t.rank);
        Ok(topics)
    }

    /// Parse a raw response body into a flat, rank-ordered topic list.
    /// Implementations never fail outright on a single malformed entry —
    /// entries are individually skipped; only a wholly malformed body (not
    /// valid JSON at all) surfaces as an error.
    fn parse(&self, body: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Topic>>;
}

/// The four adapters, in the fixed registration order the aggregator merges
/// by. `Arc`-wrapped so the fan-out can move a handle into each spawned
/// task without cloning adapter state.
pub fn default_adapters() -> Vec<std::sync::Arc<dyn SourceAdapter>> {
    vec![
        std::sync::Arc::new(weibo::WeiboAdapter::default()),
        std::sync::Arc::new(zhihu::ZhihuAdapter::default()),
        std::sync::Arc::new(baidu::BaiduAdapter::default()),
        std::sync::Arc::new(kr36::Kr36Adapter::default()),
    ]
}
