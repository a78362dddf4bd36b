//! Domain layer for the article repository.
//!
//! # Domain Models
//!
//! - `Article`: current state of one article (title, content, status, tags, version).
//! - `ArticleVersion`: immutable snapshot of an article at a past version.
//! - `Tag`: a shared, case-insensitive label.
//!
//! # Repository traits
//!
//! The storage contract is split into narrow capability traits
//! (`ArticleCreator`, `ArticleUpdater`, `ArticleDeleter`, `ArticleGetter`,
//! `ArticleLister`, `ArticleSearcher`, `TagLister`, `VersionManager`) so that
//! callers can depend on only the operations they use. `ArticleRepository`
//! is the union every concrete store implements.
//!
//! # Examples
//!
//! ```rust,ignore
//! use scribe_articles::domain::{ArticleRepository, ArticleStatus, CreateArticleParams};
//!
//! async fn example(repo: impl ArticleRepository) -> scribe_articles::Result<()> {
//!     let article = repo
//!         .create_article(CreateArticleParams::new("a1", "Hello", "World", ArticleStatus::Draft))
//!         .await?;
//!     assert_eq!(article.current_version, 1);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Maximum allowed title length, in characters.
pub const MAX_TITLE_LENGTH: usize = 500;
/// Maximum allowed content length, in characters.
pub const MAX_CONTENT_LENGTH: usize = 1_000_000;
/// Maximum number of tags on one article.
pub const MAX_TAG_COUNT: usize = 50;
/// Maximum length of one tag name.
pub const MAX_TAG_LENGTH: usize = 100;

/// Publication state of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
        }
    }

    /// Parse a status literal, rejecting anything but the two known values.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(ArticleStatus::Draft),
            "published" => Ok(ArticleStatus::Published),
            other => Err(crate::ArticleError::invalid_argument(format!(
                "invalid status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current state of one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    pub status: ArticleStatus,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_version: i64,
}

/// Immutable snapshot of an article at a past version.
///
/// Versions never mutate once written; `(article_id, version)` is the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleVersion {
    pub article_id: String,
    pub version: i64,
    pub title: String,
    pub content: String,
    pub status: ArticleStatus,
    /// Tag names at the time of this version, comma-joined.
    pub tags_csv: String,
    pub created_at: DateTime<Utc>,
    pub is_autosave: bool,
}

impl ArticleVersion {
    /// Split the comma-joined tag snapshot back into individual names.
    pub fn tag_names(&self) -> Vec<String> {
        if self.tags_csv.is_empty() {
            return Vec::new();
        }
        self.tags_csv.split(',').map(|s| s.to_string()).collect()
    }
}

/// A shared, case-insensitive tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Inputs for creating a new article.
///
/// `created_at`/`updated_at` default to "now" when `None`, matching the
/// zero-timestamp-means-now rule for the durable store.
#[derive(Debug, Clone)]
pub struct CreateArticleParams {
    pub id: String,
    pub title: String,
    pub content: String,
    pub status: ArticleStatus,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CreateArticleParams {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        status: ArticleStatus,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            status,
            tags: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Inputs for a partial article update. Every field is `Option`: `None` means
/// "leave unchanged", distinct from an empty string or empty tag list.
#[derive(Debug, Clone, Default)]
pub struct UpdateArticleParams {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<ArticleStatus>,
    pub tags: Option<Vec<String>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_autosave: bool,
}

/// Pagination + filters shared by list and search.
#[derive(Debug, Clone, Default)]
pub struct ListArticlesParams {
    pub status: Option<ArticleStatus>,
    pub tag: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct SearchArticlesParams {
    pub query: String,
    pub status: Option<ArticleStatus>,
    pub tag: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Repository traits
// ═══════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait ArticleCreator: Send + Sync {
    /// Create a new article with version 1. Fails with `conflict` if the ID
    /// is already taken, `invalid-argument` if fields or tags fail validation.
    async fn create_article(&self, params: CreateArticleParams) -> Result<Article>;
}

#[async_trait]
pub trait ArticleGetter: Send + Sync {
    /// Fetch one article by ID, with its tags ordered by name. `not-found` if absent.
    async fn get_article(&self, id: &str) -> Result<Article>;
}

#[async_trait]
pub trait ArticleUpdater: Send + Sync {
    /// Apply a partial update, bumping `current_version` by one. `not-found`
    /// if the article does not exist.
    async fn update_article(&self, id: &str, params: UpdateArticleParams) -> Result<Article>;
}

#[async_trait]
pub trait ArticleDeleter: Send + Sync {
    /// Delete an article and cascade to its versions and tag associations.
    async fn delete_article(&self, id: &str) -> Result<()>;
}

#[async_trait]
pub trait ArticleLister: Send + Sync {
    /// Page through articles ordered by `updated_at` descending.
    async fn list_articles(&self, params: ListArticlesParams) -> Result<Vec<Article>>;
}

#[async_trait]
pub trait ArticleSearcher: Send + Sync {
    /// Full-text search, ordered by BM25 relevance (most relevant first).
    async fn search_articles(&self, params: SearchArticlesParams) -> Result<Vec<Article>>;
}

#[async_trait]
pub trait TagLister: Send + Sync {
    /// All known tags, ordered by name.
    async fn list_tags(&self) -> Result<Vec<Tag>>;
}

#[async_trait]
pub trait VersionManager: Send + Sync {
    /// Versions for one article, ordered newest-first, paginated.
    async fn list_versions(
        &self,
        article_id: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<ArticleVersion>>;

    /// A single version. `invalid-argument` for non-positive version numbers,
    /// `not-found` if the article or version does not exist.
    async fn get_version(&self, article_id: &str, version: i64) -> Result<ArticleVersion>;

    /// Roll the article forward to a new version carrying an old version's
    /// fields, re-validated against current rules.
    async fn restore_version(&self, article_id: &str, version: i64) -> Result<Article>;
}

/// The union of every capability a concrete durable repository satisfies.
pub trait ArticleRepository:
    ArticleCreator
    + ArticleUpdater
    + ArticleDeleter
    + ArticleGetter
    + ArticleLister
    + ArticleSearcher
    + TagLister
    + VersionManager
{
}

impl<T> ArticleRepository for T where
    T: ArticleCreator
        + ArticleUpdater
        + ArticleDeleter
        + ArticleGetter
        + ArticleLister
        + ArticleSearcher
        + TagLister
        + VersionManager
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_roundtrip() {
        assert_eq!(ArticleStatus::parse("draft").unwrap(), ArticleStatus::Draft);
        assert_eq!(
            ArticleStatus::parse("published").unwrap(),
            ArticleStatus::Published
        );
        assert!(ArticleStatus::parse("archived").is_err());
    }

    #[test]
    fn status_display() {
        assert_eq!(ArticleStatus::Draft.to_string(), "draft");
        assert_eq!(ArticleStatus::Published.to_string(), "published");
    }

    #[test]
    fn create_params_builder() {
        let params = CreateArticleParams::new("a1", "Hello", "World", ArticleStatus::Draft)
            .with_tags(vec!["go".into(), "sqlite".into()]);
        assert_eq!(params.id, "a1");
        assert_eq!(params.tags, vec!["go", "sqlite"]);
        assert!(params.created_at.is_none());
    }

    #[test]
    fn version_tag_names_splits_csv() {
        let version = ArticleVersion {
            article_id: "a1".into(),
            version: 1,
            title: "t".into(),
            content: "c".into(),
            status: ArticleStatus::Draft,
            tags_csv: "go,sqlite".into(),
            created_at: Utc::now(),
            is_autosave: false,
        };
        assert_eq!(version.tag_names(), vec!["go", "sqlite"]);
    }

    #[test]
    fn version_tag_names_empty() {
        let version = ArticleVersion {
            article_id: "a1".into(),
            version: 1,
            title: "t".into(),
            content: "c".into(),
            status: ArticleStatus::Draft,
            tags_csv: String::new(),
            created_at: Utc::now(),
            is_autosave: false,
        };
        assert!(version.tag_names().is_empty());
    }
}
