//! Domain types for the hot-topics aggregator: sources, topics, and the
//! pagination/filter inputs the repository accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TopicsError;
use crate::Result;

/// One of the four hot-list providers this crate aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Weibo,
    Zhihu,
    Baidu,
    Kr36,
}

/// Adapters are registered (and merged) in this fixed order.
pub const ALL_SOURCES: [Source; 4] = [Source::Weibo, Source::Zhihu, Source::Baidu, Source::Kr36];

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Weibo => "weibo",
            Source::Zhihu => "zhihu",
            Source::Baidu => "baidu",
            Source::Kr36 => "36kr",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "weibo" => Ok(Source::Weibo),
            "zhihu" => Ok(Source::Zhihu),
            "baidu" => Ok(Source::Baidu),
            "36kr" | "kr36" => Ok(Source::Kr36),
            other => Err(TopicsError::invalid_argument(format!("unknown source: {other}"))),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One trending item from one source at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub source: Source,
    pub rank: u32,
    pub title: String,
    pub url: Option<String>,
    pub hot_value: Option<f64>,
    pub description: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl Topic {
    /// Construct a topic, rejecting the two invariants adapters can't
    /// already guarantee from raw JSON: non-blank title, positive rank.
    /// Adapters skip (not propagate) entries that fail this.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Source,
        rank: u32,
        title: impl Into<String>,
        url: Option<String>,
        hot_value: Option<f64>,
        description: Option<String>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(TopicsError::invalid_argument("topic title must not be blank"));
        }
        if rank == 0 {
            return Err(TopicsError::invalid_argument("topic rank must be positive"));
        }
        Ok(Self {
            source,
            rank,
            title,
            url,
            hot_value,
            description,
            fetched_at,
        })
    }

    /// `<source>:<url-if-present-else-normalized-title>` — stable across
    /// fetches of the same real-world topic even as rank/hot-value churn.
    pub fn id(&self) -> String {
        match &self.url {
            Some(url) if !url.is_empty() => format!("{}:{}", self.source, url),
            _ => format!("{}:{}", self.source, normalize_title(&self.title)),
        }
    }
}

/// Lowercase and collapse internal whitespace runs to a single space.
pub fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Normalize a search query the same way the cache keys it: trim then
/// lowercase.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Case-insensitive substring match used by search's post-filter. An empty
/// (already-normalized) query matches everything.
pub fn contains_ignore_case(text: &str, normalized_query: &str) -> bool {
    if normalized_query.is_empty() {
        return true;
    }
    text.to_lowercase().contains(normalized_query)
}

/// The hot-topics repository's single entry point: fetch, refresh, and
/// search, each resolving a concurrent multi-source fetch through a
/// two-layer cache and durable fallback. One cohesive trait rather than
/// narrow capabilities — unlike the article repository, these three
/// operations share one read/write/fan-out path and are never used in
/// isolation by callers.
#[async_trait::async_trait]
pub trait HotTopicsRepository: Send + Sync {
    /// Fetch topics for one source, or all sources when `source` is `None`.
    ///
    /// Not `force_refresh`: try the in-memory cache, then a still-fresh
    /// durable read, before hitting the network. `force_refresh`: always
    /// fetch, and never fall back to stale durable rows on failure.
    async fn get_hot_topics(&self, source: Option<Source>, force_refresh: bool) -> Result<Vec<Topic>>;

    /// Invalidate the cache for `source` (or every source) and the entire
    /// search cache, then force-refresh.
    async fn refresh_hot_topics(&self, source: Option<Source>) -> Result<Vec<Topic>>;

    /// Case-insensitive substring search over title then description. An
    /// empty (post-trim) query degrades to `get_hot_topics`.
    async fn search_hot_topics(
        &self,
        query: &str,
        source: Option<Source>,
        force_refresh: bool,
    ) -> Result<Vec<Topic>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_parse_roundtrip() {
        for source in ALL_SOURCES {
            assert_eq!(Source::parse(source.as_str()).unwrap(), source);
        }
    }

    #[test]
    fn source_parse_rejects_unknown() {
        assert!(Source::parse("reddit").is_err());
    }

    #[test]
    fn topic_id_prefers_url() {
        let t = Topic {
            source: Source::Weibo,
            rank: 1,
            title: "Some Title".into(),
            url: Some("https://weibo.com/x".into()),
            hot_value: None,
            description: None,
            fetched_at: Utc::now(),
        };
        assert_eq!(t.id(), "weibo:https://weibo.com/x");
    }

    #[test]
    fn topic_id_falls_back_to_normalized_title() {
        let t = Topic {
            source: Source::Zhihu,
            rank: 1,
            title: "  Some   Title  ".into(),
            url: None,
            hot_value: None,
            description: None,
            fetched_at: Utc::now(),
        };
        assert_eq!(t.id(), "zhihu:some title");
    }

    #[test]
    fn same_source_and_normalized_title_implies_same_id() {
        let make = |title: &str| Topic {
            source: Source::Baidu,
            rank: 1,
            title: title.to_string(),
            url: None,
            hot_value: None,
            description: None,
            fetched_at: Utc::now(),
        };
        assert_eq!(make("Breaking   News").id(), make("breaking news").id());
    }

    #[test]
    fn contains_ignore_case_matches_regardless_of_case() {
        assert!(contains_ignore_case("Breaking News", "breaking"));
        assert!(!contains_ignore_case("Breaking News", "sports"));
    }

    #[test]
    fn contains_ignore_case_empty_query_matches_everything() {
        assert!(contains_ignore_case("anything", ""));
    }
}
