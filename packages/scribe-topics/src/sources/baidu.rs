//! Baidu realtime hot-board adapter. Entries sit two levels deep: a list of
//! cards, each carrying a `content` list of entries.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::parsing::{as_float, as_list, as_map, as_string, non_blank};
use super::SourceAdapter;
use crate::domain::{Source, Topic};
use crate::Result;

const DEFAULT_URL: &str = "https://top.baidu.com/api/board?platform=wise&tab=realtime";

pub struct BaiduAdapter {
    url: String,
}

impl Default for BaiduAdapter {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
        }
    }
}

impl BaiduAdapter {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl SourceAdapter for BaiduAdapter {
    fn source(&self) -> Source {
        Source::Baidu
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn parse(&self, body: &str, fetched_at: DateTime<Utc>) -> Result<Vec<Topic>> {
        let decoded: Value = serde_json::from_str(body)?;
        let cards = as_map(&decoded)
            .and_then(|root| root.get("data"))
            .and_then(as_map)
            .and_then(|data| data.get("cards"))
            .and_then(as_list)
            .cloned()
            .unwrap_or_default();

        let mut entries = Vec::new();
        for card in &cards {
            let Some(card) = as_map(card) else { continue };
            if let Some(content) = card.get("content").and_then(as_list) {
                for item in content {
                    if let Some(item) = as_map(item) {
                        entries.push(item);
                    }
                }
            }
        }

        let mut out = Vec::with_capacity(entries.len());
        for (i, item) in entries.iter().enumerate() {
            let title = item
                .get("word")
                .and_then(as_string)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| item.get("keyword").and_then(as_string))
                .filter(|s| !s.trim().is_empty())
                .or_else(|| item.get("title").and_then(as_string))
                .unwrap_or_default();

            let url = item
                .get("url")
                .and_then(as_string)
                .or_else(|| item.get("link").and_then(as_string))
                .and_then(non_blank);

            let hot_value = item
                .get("hotScore")
                .and_then(as_float)
                .or_else(|| item.get("hot_score").and_then(as_float))
                .or_else(|| item.get("hotValue").and_then(as_float))
                .or_else(|| item.get("score").and_then(as_float));

            let description = item
                .get("desc")
                .and_then(as_string)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| item.get("desc1").and_then(as_string))
                .filter(|s| !s.trim().is_empty())
                .or_else(|| item.get("summary").and_then(as_string))
                .and_then(non_blank);

            let rank = (i + 1) as u32;
            if let Ok(topic) = Topic::new(Source::Baidu, rank, title, url, hot_value, description, fetched_at)
            {
                out.push(topic);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_cards_into_entries() {
        let body = serde_json::json!({
            "data": {
                "cards": [
                    {"content": [{"word": "First", "hotScore": "12345"}]},
                    {"content": [{"keyword": "Second", "url": "https://b.example/2"}]},
                ]
            }
        })
        .to_string();

        let adapter = BaiduAdapter::default();
        let topics = adapter.parse(&body, Utc::now()).unwrap();

        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].title, "First");
        assert_eq!(topics[0].hot_value, Some(12345.0));
        assert_eq!(topics[1].title, "Second");
        assert_eq!(topics[1].url.as_deref(), Some("https://b.example/2"));
    }

    #[test]
    fn missing_cards_yields_empty() {
        let body = serde_json::json!({"data": {}}).to_string();
        let adapter = BaiduAdapter::default();
        assert!(adapter.parse(&body, Utc::now()).unwrap().is_empty());
    }
}
