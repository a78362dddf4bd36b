//! DDL for the article repository's durable schema.

use sqlx::SqlitePool;

use crate::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    id              TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    content         TEXT NOT NULL,
    status          TEXT NOT NULL,
    created_at_ms   INTEGER NOT NULL,
    updated_at_ms   INTEGER NOT NULL,
    current_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS article_versions (
    article_id    TEXT NOT NULL,
    version       INTEGER NOT NULL,
    title         TEXT NOT NULL,
    content       TEXT NOT NULL,
    status        TEXT NOT NULL,
    tags_csv      TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    is_autosave   INTEGER NOT NULL,
    PRIMARY KEY (article_id, version),
    FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS tags (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    created_at_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS article_tags (
    article_id TEXT NOT NULL,
    tag_id     TEXT NOT NULL,
    PRIMARY KEY (article_id, tag_id),
    FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

CREATE VIRTUAL TABLE IF NOT EXISTS article_fts USING fts5(
    title,
    content,
    tags,
    article_id UNINDEXED
);

CREATE INDEX IF NOT EXISTS idx_article_tags_tag ON article_tags(tag_id);
"#;

/// Create every table/index/virtual-table this crate needs, if absent.
/// Idempotent: safe to call on every repository construction.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
