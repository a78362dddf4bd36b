//! 36Kr hot-rank adapter. The list key has drifted across API versions, so
//! the adapter tries several nesting shapes before giving up.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::parsing::{as_float, as_list, as_map, as_string, non_blank};
use super::SourceAdapter;
use crate::domain::{Source, Topic};
use crate::Result;

const DEFAULT_URL: &str = "https://gateway.36kr.com/api/mis/nav/home/nav/rank/hot";

pub struct Kr36Adapter {
    url: String,
}

impl Default for Kr36Adapter {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
        }
    }
}

impl Kr36Adapter {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Try a fixed set of keys, in order, for the first one present as a list.
fn find_list<'a>(
    map: &'a serde_json::Map<String, Value>,
    keys: &[&str],
) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| map.get(*key).and_then(as_list))
}

impl SourceAdapter for Kr36Adapter {
    fn source(&self) -> Source {
        Source::Kr36
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn parse(&self, body: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Topic>> {
        let decoded: Value = serde_json::from_str(body)?;
        let root = as_map(&decoded);
        let data = root.and_then(|r| r.get("data")).and_then(as_map).or(root);

        const LIST_KEYS: &[&str] = &["hotRankList", "items", "list", "data"];
        let list = data
            .and_then(|d| find_list(d, LIST_KEYS))
            .or_else(|| {
                data.and_then(|d| d.get("data"))
                    .and_then(as_map)
                    .and_then(|inner| find_list(inner, &["hotRankList", "items", "list"]))
            })
            .cloned()
            .unwrap_or_default();

        let mut out = Vec::with_capacity(list.len());
        for (i, raw) in list.iter().enumerate() {
            let Some(item) = as_map(raw) else { continue };

            let title = item
                .get("title")
                .and_then(as_string)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| item.get("name").and_then(as_string))
                .filter(|s| !s.trim().is_empty())
                .or_else(|| item.get("word").and_then(as_string))
                .unwrap_or_default();

            let url = item
                .get("url")
                .and_then(as_string)
                .or_else(|| item.get("link").and_then(as_string))
                .and_then(non_blank);

            let hot_value = item
                .get("hotValue")
                .and_then(as_float)
                .or_else(|| item.get("score").and_then(as_float))
                .or_else(|| item.get("hot").and_then(as_float))
                .or_else(|| item.get("hotRank").and_then(as_float));

            let description = item
                .get("desc")
                .and_then(as_string)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| item.get("summary").and_then(as_string))
                .filter(|s| !s.trim().is_empty())
                .or_else(|| item.get("description").and_then(as_string))
                .and_then(non_blank);

            let rank = (i + 1) as u32;
            if let Ok(topic) = Topic::new(Source::Kr36, rank, title, url, hot_value, description, fetched_at)
            {
                out.push(topic);
            }
        }
        Ok(out)
    }
}
