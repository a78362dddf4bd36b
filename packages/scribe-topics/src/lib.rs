//! Hot-topics aggregation: concurrent fetch across multiple ranked-list
//! providers, a two-layer cache (in-memory TTL plus durable SQLite
//! fallback), and tolerant merge across partial source failures.
//!
//! ```rust,ignore
//! use scribe_topics::{HotTopicsRepository, SqliteHotTopicsRepository};
//!
//! # async fn run() -> scribe_topics::Result<()> {
//! let repo = SqliteHotTopicsRepository::connect("topics.db").await?;
//! let topics = repo.get_hot_topics(None, false).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod orchestrator;
pub mod sources;

pub use cache::{Clock, HotTopicsCache, SystemClock, TtlCache};
pub use domain::{HotTopicsRepository, Source, Topic, ALL_SOURCES};
pub use error::{ErrorKind, Result, TopicsError};
pub use infrastructure::SqliteHotTopicsRepository;
pub use sources::{default_adapters, Fetcher, ReqwestFetcher, SourceAdapter};
