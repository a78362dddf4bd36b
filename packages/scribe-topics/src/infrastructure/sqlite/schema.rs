//! DDL for the hot-topics durable cache table.

use sqlx::SqlitePool;

use crate::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS hot_topics (
    id            TEXT PRIMARY KEY,
    source        TEXT NOT NULL,
    rank          INTEGER NOT NULL,
    title         TEXT NOT NULL,
    url           TEXT,
    hot_value     REAL,
    description   TEXT,
    fetched_at_ms INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_hot_topics_source_rank ON hot_topics(source, rank);
CREATE INDEX IF NOT EXISTS idx_hot_topics_source_fetched ON hot_topics(source, fetched_at_ms DESC);
"#;

/// Create the table/indexes this crate needs, if absent. Idempotent: safe
/// to call on every repository construction.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
