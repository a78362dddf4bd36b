//! Field normalization and validation shared by every repository write path.
//!
//! All failures here signal `ErrorKind::InvalidArgument`; callers rely on no
//! partial mutation having occurred before validation completes, so these
//! functions are pure and side-effect free.

use crate::domain::{ArticleStatus, MAX_CONTENT_LENGTH, MAX_TAG_COUNT, MAX_TAG_LENGTH, MAX_TITLE_LENGTH};
use crate::error::ArticleError;
use crate::Result;

/// Lowercase, trim, and reject empty or over-length tag names.
pub fn normalize_tag_name(name: &str) -> Result<String> {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ArticleError::invalid_argument("tag name must not be empty"));
    }
    if normalized.chars().count() > MAX_TAG_LENGTH {
        return Err(ArticleError::invalid_argument(format!(
            "tag name exceeds {MAX_TAG_LENGTH} characters"
        )));
    }
    Ok(normalized)
}

/// Normalize a whole tag list: per-name normalization, first-seen dedup
/// (case-insensitive, since normalization already lowercases), and an
/// overall count ceiling.
///
/// `normalize(normalize(xs)) == normalize(xs)` for every input: normalization
/// is idempotent because it only ever lowercases, trims, and deduplicates an
/// already-normalized set.
pub fn normalize_tag_names(names: &[String]) -> Result<Vec<String>> {
    if names.len() > MAX_TAG_COUNT {
        return Err(ArticleError::invalid_argument(format!(
            "too many tags: max {MAX_TAG_COUNT}"
        )));
    }
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let normalized = normalize_tag_name(name)?;
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }
    Ok(out)
}

/// Validate title/content against length bounds and the status-dependent
/// non-blank rule. Trimming happens here only for the blank check; callers
/// persist the original (untrimmed) strings.
pub fn validate_article_fields(status: ArticleStatus, title: &str, content: &str) -> Result<()> {
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ArticleError::invalid_argument(format!(
            "title exceeds {MAX_TITLE_LENGTH} characters"
        )));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(ArticleError::invalid_argument(format!(
            "content exceeds {MAX_CONTENT_LENGTH} characters"
        )));
    }
    if matches!(status, ArticleStatus::Published) {
        if title.trim().is_empty() {
            return Err(ArticleError::invalid_argument(
                "published article requires a non-blank title",
            ));
        }
        if content.trim().is_empty() {
            return Err(ArticleError::invalid_argument(
                "published article requires non-blank content",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_tag_name_trims_and_lowercases() {
        assert_eq!(normalize_tag_name("  Go  ").unwrap(), "go");
    }

    #[test]
    fn normalize_tag_name_rejects_empty() {
        assert!(normalize_tag_name("   ").is_err());
    }

    #[test]
    fn normalize_tag_name_rejects_overlong() {
        let long = "a".repeat(MAX_TAG_LENGTH + 1);
        assert!(normalize_tag_name(&long).is_err());
    }

    #[test]
    fn normalize_tag_names_dedups_case_insensitively_preserving_first_seen() {
        let names = vec!["Go".to_string(), "go".to_string(), "SQLite".to_string()];
        let normalized = normalize_tag_names(&names).unwrap();
        assert_eq!(normalized, vec!["go", "sqlite"]);
    }

    #[test]
    fn normalize_tag_names_rejects_too_many() {
        let names: Vec<String> = (0..MAX_TAG_COUNT + 1).map(|i| format!("tag{i}")).collect();
        assert!(normalize_tag_names(&names).is_err());
    }

    #[test]
    fn normalize_is_idempotent() {
        let names = vec!["Go".to_string(), "go".to_string(), "rust".to_string()];
        let once = normalize_tag_names(&names).unwrap();
        let twice = normalize_tag_names(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn validate_draft_allows_blank_fields() {
        assert!(validate_article_fields(ArticleStatus::Draft, "", "").is_ok());
    }

    #[test]
    fn validate_published_rejects_blank_title() {
        let err = validate_article_fields(ArticleStatus::Published, "  ", "content").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn validate_published_rejects_blank_content() {
        assert!(validate_article_fields(ArticleStatus::Published, "title", "  ").is_err());
    }

    #[test]
    fn validate_published_accepts_non_blank_fields() {
        assert!(validate_article_fields(ArticleStatus::Published, "title", "content").is_ok());
    }

    #[test]
    fn validate_rejects_overlong_title() {
        let long = "a".repeat(MAX_TITLE_LENGTH + 1);
        assert!(validate_article_fields(ArticleStatus::Draft, &long, "c").is_err());
    }
}
