//! Wraps the `article_fts` virtual table: upsert/delete inside the caller's
//! transaction, and a search query that normalizes free text into an FTS5
//! match expression.

use sqlx::sqlite::SqliteConnection;

use crate::error::ArticleError;
use crate::Result;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

/// Delete any existing FTS row for this article, then insert a fresh one.
/// Must run inside the caller's transaction so it stays consistent with the
/// row and tag changes in the same operation.
pub async fn upsert_tx(
    conn: &mut SqliteConnection,
    article_id: &str,
    title: &str,
    content: &str,
    tags_joined: &str,
) -> Result<()> {
    delete_tx(conn, article_id).await?;
    sqlx::query("INSERT INTO article_fts (article_id, title, content, tags) VALUES (?, ?, ?, ?)")
        .bind(article_id)
        .bind(title)
        .bind(content)
        .bind(tags_joined)
        .execute(conn)
        .await?;
    Ok(())
}

/// Remove every FTS row for this article (there should be at most one).
pub async fn delete_tx(conn: &mut SqliteConnection, article_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM article_fts WHERE article_id = ?")
        .bind(article_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Strip FTS5 special characters and wrap the remainder in double quotes for
/// phrase matching. Returns an empty string if nothing is left after
/// stripping, signalling "no results" to the caller.
pub fn normalize_query(query: &str) -> String {
    let stripped: String = query
        .chars()
        .filter(|c| !matches!(c, '"' | '*' | '-' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | ':'))
        .collect();
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\"{trimmed}\"")
    }
}

/// Search the FTS index, returning matching article IDs ordered by BM25
/// ascending (most relevant first). An empty normalized query yields no
/// results rather than matching everything.
pub async fn search(
    conn: &mut SqliteConnection,
    query: &str,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<Vec<String>> {
    let normalized = normalize_query(query);
    if normalized.is_empty() {
        return Ok(Vec::new());
    }

    let limit = match limit {
        Some(0) => return Err(ArticleError::invalid_argument("limit must be at least 1")),
        Some(l) if l > MAX_LIMIT => MAX_LIMIT,
        Some(l) => l,
        None => DEFAULT_LIMIT,
    };
    let offset = offset.unwrap_or(0);

    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT article_id FROM article_fts WHERE article_fts MATCH ? \
         ORDER BY bm25(article_fts) ASC LIMIT ? OFFSET ?",
    )
    .bind(&normalized)
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_query_strips_special_characters() {
        assert_eq!(normalize_query("rust (fts5)*"), "\"rust fts5\"");
    }

    #[test]
    fn normalize_query_wraps_in_quotes() {
        assert_eq!(normalize_query("hello world"), "\"hello world\"");
    }

    #[test]
    fn normalize_query_empty_after_stripping() {
        assert_eq!(normalize_query("***---"), "");
    }

    #[test]
    fn normalize_query_trims_whitespace() {
        assert_eq!(normalize_query("  hi  "), "\"hi\"");
    }
}
