//! Article storage: create/update/delete articles, keep a full version
//! history of every successful write, and serve full-text search over
//! title/content/tags via SQLite FTS5.
//!
//! ```rust,ignore
//! use scribe_articles::{ArticleRepository, CreateArticleParams, ArticleStatus, SqliteArticleRepository};
//!
//! # async fn run() -> scribe_articles::Result<()> {
//! let repo = SqliteArticleRepository::connect("articles.db").await?;
//! let article = repo
//!     .create_article(
//!         CreateArticleParams::new("a1", "Hello", "World", ArticleStatus::Draft)
//!             .with_tags(vec!["rust".into()]),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod validators;

pub use domain::{
    Article, ArticleCreator, ArticleDeleter, ArticleGetter, ArticleLister, ArticleRepository,
    ArticleSearcher, ArticleStatus, ArticleUpdater, ArticleVersion, CreateArticleParams,
    ListArticlesParams, SearchArticlesParams, Tag, TagLister, UpdateArticleParams, VersionManager,
};
pub use error::{ArticleError, ErrorKind, Result};
pub use infrastructure::SqliteArticleRepository;
