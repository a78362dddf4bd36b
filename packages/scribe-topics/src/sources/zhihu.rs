//! Zhihu "hot list" adapter.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::parsing::{as_list, as_map, as_string, non_blank, try_parse_float_from_text};
use super::SourceAdapter;
use crate::domain::{Source, Topic};
use crate::Result;

const DEFAULT_URL: &str =
    "https://www.zhihu.com/api/v3/feed/topstory/hot-lists/total?limit=50&desktop=true";

pub struct ZhihuAdapter {
    url: String,
}

impl Default for ZhihuAdapter {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
        }
    }
}

impl ZhihuAdapter {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl SourceAdapter for ZhihuAdapter {
    fn source(&self) -> Source {
        Source::Zhihu
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn parse(&self, body: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Topic>> {
        let decoded: Value = serde_json::from_str(body)?;
        let items = as_map(&decoded)
            .and_then(|root| root.get("data"))
            .and_then(as_list)
            .cloned()
            .unwrap_or_default();

        let mut out = Vec::with_capacity(items.len());
        for (i, raw) in items.iter().enumerate() {
            let Some(item) = as_map(raw) else { continue };
            let target = item.get("target").and_then(as_map);

            let title = target
                .and_then(|t| t.get("title"))
                .and_then(as_string)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| item.get("title").and_then(as_string))
                .unwrap_or_default();

            let description = target
                .and_then(|t| t.get("excerpt"))
                .and_then(as_string)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| target.and_then(|t| t.get("excerpt_new")).and_then(as_string))
                .filter(|s| !s.trim().is_empty())
                .or_else(|| target.and_then(|t| t.get("description")).and_then(as_string))
                .and_then(non_blank);

            let url = target
                .and_then(|t| t.get("url"))
                .and_then(as_string)
                .or_else(|| item.get("url").and_then(as_string))
                .or_else(|| target.and_then(|t| t.get("url_token")).and_then(as_string))
                .or_else(|| target.and_then(|t| t.get("urlToken")).and_then(as_string))
                .and_then(non_blank);

            let hot_value = item
                .get("detail_text")
                .and_then(as_string)
                .or_else(|| item.get("detailText").and_then(as_string))
                .or_else(|| item.get("heat").and_then(as_string))
                .and_then(|s| try_parse_float_from_text(&s));

            let rank = (i + 1) as u32;
            if let Ok(topic) = Topic::new(Source::Zhihu, rank, title, url, hot_value, description, fetched_at)
            {
                out.push(topic);
            }
        }
        Ok(out)
    }
}
