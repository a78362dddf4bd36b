//! Infrastructure layer - storage adapters.

pub mod sqlite;

pub use sqlite::SqliteHotTopicsRepository;
