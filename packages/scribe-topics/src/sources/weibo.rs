//! Weibo realtime hot-search adapter.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::parsing::{as_float, as_int, as_list, as_map, as_string, non_blank, try_parse_float_from_text};
use super::SourceAdapter;
use crate::domain::{Source, Topic};
use crate::Result;

const DEFAULT_URL: &str = "https://weibo.com/ajax/side/hotSearch";

pub struct WeiboAdapter {
    url: String,
}

impl Default for WeiboAdapter {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
        }
    }
}

impl WeiboAdapter {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl SourceAdapter for WeiboAdapter {
    fn source(&self) -> Source {
        Source::Weibo
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn parse(&self, body: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Topic>> {
        let decoded: Value = serde_json::from_str(body)?;
        let realtime = as_map(&decoded)
            .and_then(|root| root.get("data"))
            .and_then(as_map)
            .and_then(|data| data.get("realtime"))
            .and_then(as_list)
            .cloned()
            .unwrap_or_default();

        let mut out = Vec::with_capacity(realtime.len());
        for (i, raw) in realtime.iter().enumerate() {
            let Some(item) = as_map(raw) else { continue };

            let title = item
                .get("note")
                .and_then(as_string)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| item.get("word").and_then(as_string))
                .unwrap_or_default();

            let rank = item
                .get("rank")
                .and_then(as_int)
                .or_else(|| item.get("realpos").and_then(as_int))
                .or_else(|| item.get("num").and_then(as_int))
                .filter(|r| *r > 0)
                .map(|r| r as u32)
                .unwrap_or((i + 1) as u32);

            let url = item
                .get("link")
                .and_then(as_string)
                .or_else(|| item.get("url").and_then(as_string))
                .and_then(non_blank);

            let hot_value = item
                .get("raw_hot")
                .and_then(as_float)
                .or_else(|| item.get("rawHot").and_then(as_float))
                .or_else(|| item.get("hot").and_then(as_float))
                .or_else(|| item.get("num").and_then(as_float))
                .or_else(|| {
                    item.get("raw_hot")
                        .and_then(as_string)
                        .and_then(|s| try_parse_float_from_text(&s))
                });

            if let Ok(topic) = Topic::new(Source::Weibo, rank, title, url, hot_value, None, fetched_at) {
                out.push(topic);
            }
        }
        Ok(out)
    }
}
