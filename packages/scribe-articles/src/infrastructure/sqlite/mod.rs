//! SQLite-backed implementation of the article repository.
//!
//! Every public operation here corresponds to one method on the narrow
//! capability traits in [`crate::domain`]; multi-statement operations run
//! inside one transaction so the article row, its tags, its version
//! history, and the FTS index never diverge.

mod schema;
mod search_index;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::domain::{
    Article, ArticleCreator, ArticleDeleter, ArticleGetter, ArticleLister, ArticleSearcher,
    ArticleStatus, ArticleUpdater, ArticleVersion, CreateArticleParams, ListArticlesParams,
    SearchArticlesParams, Tag, TagLister, UpdateArticleParams, VersionManager,
};
use crate::error::ArticleError;
use crate::validators::{normalize_tag_name, normalize_tag_names, validate_article_fields};
use crate::Result;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

/// Durable, transactional store for articles, tags, and version history.
///
/// Holds a single-connection [`SqlitePool`] (`max_connections(1)`), matching
/// the single-writer model the version counter relies on for correctness.
pub struct SqliteArticleRepository {
    pool: SqlitePool,
}

impl SqliteArticleRepository {
    /// Open (creating if absent) a file-backed database.
    pub async fn connect(database_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);
        Self::from_options(options).await
    }

    /// A private, in-memory database. Useful for tests; each instance is its
    /// own isolated database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true).foreign_keys(true);
        Self::from_options(options).await
    }

    async fn from_options(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        schema::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn hydrate_articles(
        &self,
        ids: &[String],
        status: Option<ArticleStatus>,
        tag: Option<&str>,
    ) -> Result<Vec<Article>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let (case_sql, in_sql) = case_order_clause("a.id", ids.len());

        let mut sql = String::from(
            "SELECT a.id, a.title, a.content, a.status, a.created_at_ms, a.updated_at_ms, a.current_version \
             FROM articles a",
        );
        if tag.is_some() {
            sql.push_str(" JOIN article_tags at ON at.article_id = a.id JOIN tags t ON t.id = at.tag_id");
        }
        sql.push_str(&format!(" WHERE a.id IN ({in_sql})"));
        if tag.is_some() {
            sql.push_str(" AND t.name = ?");
        }
        if status.is_some() {
            sql.push_str(" AND a.status = ?");
        }
        sql.push_str(&format!(" ORDER BY {case_sql}"));

        let mut query = sqlx::query_as::<_, ArticleRow>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        if let Some(tag) = tag {
            query = query.bind(normalize_tag_name(tag)?);
        }
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }
        for id in ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let tags_by_article = self.fetch_tags_by_articles(ids).await?;
        rows.into_iter()
            .map(|row| {
                let tags = tags_by_article.get(&row.id).cloned().unwrap_or_default();
                row.into_domain(tags)
            })
            .collect()
    }

    async fn fetch_tags_by_articles(&self, ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let in_sql = vec!["?"; ids.len()].join(",");
        let sql = format!(
            "SELECT at.article_id, t.name FROM article_tags at JOIN tags t ON t.id = at.tag_id \
             WHERE at.article_id IN ({in_sql}) ORDER BY at.article_id, t.name ASC"
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (article_id, name) in rows {
            map.entry(article_id).or_default().push(name);
        }
        Ok(map)
    }
}

#[async_trait]
impl ArticleCreator for SqliteArticleRepository {
    async fn create_article(&self, params: CreateArticleParams) -> Result<Article> {
        validate_article_fields(params.status, &params.title, &params.content)?;
        let tags = normalize_tag_names(&params.tags)?;

        let created_at = params.created_at.unwrap_or_else(Utc::now);
        let updated_at = params.updated_at.unwrap_or(created_at);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO articles (id, title, content, status, created_at_ms, updated_at_ms, current_version) \
             VALUES (?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(&params.id)
        .bind(&params.title)
        .bind(&params.content)
        .bind(params.status.as_str())
        .bind(created_at.timestamp_millis())
        .bind(updated_at.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        replace_tags_tx(&mut tx, &params.id, &tags).await?;

        sqlx::query(
            "INSERT INTO article_versions (article_id, version, title, content, status, tags_csv, created_at_ms, is_autosave) \
             VALUES (?, 1, ?, ?, ?, ?, ?, 0)",
        )
        .bind(&params.id)
        .bind(&params.title)
        .bind(&params.content)
        .bind(params.status.as_str())
        .bind(tags.join(","))
        .bind(created_at.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        search_index::upsert_tx(&mut *tx, &params.id, &params.title, &params.content, &tags.join(" ")).await?;

        tx.commit().await?;

        Ok(Article {
            id: params.id,
            title: params.title,
            content: params.content,
            status: params.status,
            tags,
            created_at,
            updated_at,
            current_version: 1,
        })
    }
}

#[async_trait]
impl ArticleGetter for SqliteArticleRepository {
    async fn get_article(&self, id: &str) -> Result<Article> {
        let row: Option<ArticleRow> = sqlx::query_as(
            "SELECT id, title, content, status, created_at_ms, updated_at_ms, current_version \
             FROM articles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let row = row.ok_or_else(|| ArticleError::not_found(format!("article not found: {id}")))?;
        let mut conn = self.pool.acquire().await?;
        let tags = fetch_tag_names(&mut conn, id).await?;
        row.into_domain(tags)
    }
}

#[async_trait]
impl ArticleUpdater for SqliteArticleRepository {
    async fn update_article(&self, id: &str, params: UpdateArticleParams) -> Result<Article> {
        let mut tx = self.pool.begin().await?;

        let current: Option<ArticleRow> = sqlx::query_as(
            "SELECT id, title, content, status, created_at_ms, updated_at_ms, current_version \
             FROM articles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let current = current.ok_or_else(|| ArticleError::not_found(format!("article not found: {id}")))?;

        let title = params.title.clone().unwrap_or_else(|| current.title.clone());
        let content = params.content.clone().unwrap_or_else(|| current.content.clone());
        let status = match params.status {
            Some(status) => status,
            None => ArticleStatus::parse(&current.status)?,
        };
        validate_article_fields(status, &title, &content)?;

        let tags = match &params.tags {
            Some(tags) => normalize_tag_names(tags)?,
            None => fetch_tag_names(&mut tx, id).await?,
        };

        let updated_at = params.updated_at.unwrap_or_else(Utc::now);
        let new_version = current.current_version + 1;

        sqlx::query(
            "UPDATE articles SET title = ?, content = ?, status = ?, updated_at_ms = ?, current_version = ? \
             WHERE id = ?",
        )
        .bind(&title)
        .bind(&content)
        .bind(status.as_str())
        .bind(updated_at.timestamp_millis())
        .bind(new_version)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if params.tags.is_some() {
            replace_tags_tx(&mut tx, id, &tags).await?;
        }

        sqlx::query(
            "INSERT INTO article_versions (article_id, version, title, content, status, tags_csv, created_at_ms, is_autosave) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(new_version)
        .bind(&title)
        .bind(&content)
        .bind(status.as_str())
        .bind(tags.join(","))
        .bind(updated_at.timestamp_millis())
        .bind(params.is_autosave)
        .execute(&mut *tx)
        .await?;

        search_index::upsert_tx(&mut *tx, id, &title, &content, &tags.join(" ")).await?;

        tx.commit().await?;

        Ok(Article {
            id: id.to_string(),
            title,
            content,
            status,
            tags,
            created_at: ms_to_datetime(current.created_at_ms),
            updated_at,
            current_version: new_version,
        })
    }
}

#[async_trait]
impl ArticleDeleter for SqliteArticleRepository {
    async fn delete_article(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        search_index::delete_tx(&mut *tx, id).await?;
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ArticleError::not_found(format!("article not found: {id}")));
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ArticleLister for SqliteArticleRepository {
    async fn list_articles(&self, params: ListArticlesParams) -> Result<Vec<Article>> {
        let limit = clamp_limit(params.limit)?;
        let offset = params.offset.unwrap_or(0);

        let mut sql = String::from("SELECT a.id FROM articles a");
        let mut conditions = Vec::new();
        if params.tag.is_some() {
            sql.push_str(" JOIN article_tags at ON at.article_id = a.id JOIN tags t ON t.id = at.tag_id");
            conditions.push("t.name = ?");
        }
        if params.status.is_some() {
            conditions.push("a.status = ?");
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY a.updated_at_ms DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query_as::<_, (String,)>(&sql);
        if let Some(tag) = &params.tag {
            query = query.bind(normalize_tag_name(tag)?);
        }
        if let Some(status) = params.status {
            query = query.bind(status.as_str());
        }
        query = query.bind(limit).bind(offset);

        let ids: Vec<String> = query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|(id,)| id)
            .collect();

        self.hydrate_articles(&ids, None, None).await
    }
}

#[async_trait]
impl ArticleSearcher for SqliteArticleRepository {
    async fn search_articles(&self, params: SearchArticlesParams) -> Result<Vec<Article>> {
        let ids = {
            let mut conn = self.pool.acquire().await?;
            search_index::search(&mut conn, &params.query, params.limit, params.offset).await?
        };
        self.hydrate_articles(&ids, params.status, params.tag.as_deref()).await
    }
}

#[async_trait]
impl TagLister for SqliteArticleRepository {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let rows: Vec<(String, String, i64)> =
            sqlx::query_as("SELECT id, name, created_at_ms FROM tags ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, created_at_ms)| Tag {
                id,
                name,
                created_at: ms_to_datetime(created_at_ms),
            })
            .collect())
    }
}

#[async_trait]
impl VersionManager for SqliteArticleRepository {
    async fn list_versions(
        &self,
        article_id: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<ArticleVersion>> {
        let limit = clamp_limit(limit)?;
        let offset = offset.unwrap_or(0);
        let rows: Vec<VersionRow> = sqlx::query_as(
            "SELECT article_id, version, title, content, status, tags_csv, created_at_ms, is_autosave \
             FROM article_versions WHERE article_id = ? ORDER BY version DESC LIMIT ? OFFSET ?",
        )
        .bind(article_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(VersionRow::into_domain).collect()
    }

    async fn get_version(&self, article_id: &str, version: i64) -> Result<ArticleVersion> {
        if version <= 0 {
            return Err(ArticleError::invalid_argument("version must be positive"));
        }
        let row: Option<VersionRow> = sqlx::query_as(
            "SELECT article_id, version, title, content, status, tags_csv, created_at_ms, is_autosave \
             FROM article_versions WHERE article_id = ? AND version = ?",
        )
        .bind(article_id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;
        let row = row.ok_or_else(|| {
            ArticleError::not_found(format!("version not found: {article_id}@{version}"))
        })?;
        row.into_domain()
    }

    async fn restore_version(&self, article_id: &str, version: i64) -> Result<Article> {
        let target = self.get_version(article_id, version).await?;
        validate_article_fields(target.status, &target.title, &target.content)?;
        let tags = normalize_tag_names(&target.tag_names())?;

        let mut tx = self.pool.begin().await?;
        let current: Option<ArticleRow> = sqlx::query_as(
            "SELECT id, title, content, status, created_at_ms, updated_at_ms, current_version \
             FROM articles WHERE id = ?",
        )
        .bind(article_id)
        .fetch_optional(&mut *tx)
        .await?;
        let current = current
            .ok_or_else(|| ArticleError::not_found(format!("article not found: {article_id}")))?;

        let new_version = current.current_version + 1;
        let now = Utc::now();

        sqlx::query(
            "UPDATE articles SET title = ?, content = ?, status = ?, updated_at_ms = ?, current_version = ? \
             WHERE id = ?",
        )
        .bind(&target.title)
        .bind(&target.content)
        .bind(target.status.as_str())
        .bind(now.timestamp_millis())
        .bind(new_version)
        .bind(article_id)
        .execute(&mut *tx)
        .await?;

        replace_tags_tx(&mut tx, article_id, &tags).await?;

        sqlx::query(
            "INSERT INTO article_versions (article_id, version, title, content, status, tags_csv, created_at_ms, is_autosave) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(article_id)
        .bind(new_version)
        .bind(&target.title)
        .bind(&target.content)
        .bind(target.status.as_str())
        .bind(tags.join(","))
        .bind(now.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        search_index::upsert_tx(&mut *tx, article_id, &target.title, &target.content, &tags.join(" ")).await?;

        tx.commit().await?;

        Ok(Article {
            id: article_id.to_string(),
            title: target.title,
            content: target.content,
            status: target.status,
            tags,
            created_at: ms_to_datetime(current.created_at_ms),
            updated_at: now,
            current_version: new_version,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Row types and free-standing helpers shared by the trait impls above.
// ═══════════════════════════════════════════════════════════════════════════

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: String,
    title: String,
    content: String,
    status: String,
    created_at_ms: i64,
    updated_at_ms: i64,
    current_version: i64,
}

impl ArticleRow {
    fn into_domain(self, tags: Vec<String>) -> Result<Article> {
        Ok(Article {
            id: self.id,
            title: self.title,
            content: self.content,
            status: ArticleStatus::parse(&self.status)?,
            tags,
            created_at: ms_to_datetime(self.created_at_ms),
            updated_at: ms_to_datetime(self.updated_at_ms),
            current_version: self.current_version,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VersionRow {
    article_id: String,
    version: i64,
    title: String,
    content: String,
    status: String,
    tags_csv: String,
    created_at_ms: i64,
    is_autosave: bool,
}

impl VersionRow {
    fn into_domain(self) -> Result<ArticleVersion> {
        Ok(ArticleVersion {
            article_id: self.article_id,
            version: self.version,
            title: self.title,
            content: self.content,
            status: ArticleStatus::parse(&self.status)?,
            tags_csv: self.tags_csv,
            created_at: ms_to_datetime(self.created_at_ms),
            is_autosave: self.is_autosave,
        })
    }
}

/// Upsert every tag by normalized name, first clearing existing associations.
/// Runs inside the caller's transaction.
async fn replace_tags_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    article_id: &str,
    tag_names: &[String],
) -> Result<()> {
    sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut **tx)
        .await?;
    for name in tag_names {
        let tag_id = upsert_tag_tx(tx, name).await?;
        sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(&tag_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Select a tag by normalized name, inserting it on first use. A unique-key
/// race with a concurrent inserter is benign: re-select and return theirs.
async fn upsert_tag_tx(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, name: &str) -> Result<String> {
    if let Some((id,)) = sqlx::query_as::<_, (String,)>("SELECT id FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?
    {
        return Ok(id);
    }

    let id = generate_id();
    let inserted = sqlx::query("INSERT INTO tags (id, name, created_at_ms) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(name)
        .bind(now_ms())
        .execute(&mut **tx)
        .await;

    match inserted {
        Ok(_) => Ok(id),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            let (id,): (String,) = sqlx::query_as("SELECT id FROM tags WHERE name = ?")
                .bind(name)
                .fetch_one(&mut **tx)
                .await?;
            Ok(id)
        }
        Err(err) => Err(err.into()),
    }
}

async fn fetch_tag_names(
    conn: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
    article_id: &str,
) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT t.name FROM tags t JOIN article_tags at ON at.tag_id = t.id \
         WHERE at.article_id = ? ORDER BY t.name ASC",
    )
    .bind(article_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Builds a `CASE column WHEN ? THEN 0 WHEN ? THEN 1 ... END` ordering
/// expression plus an `n`-placeholder `IN` list, so a `WHERE id IN (...)`
/// query can be re-ordered to match the order the IDs were supplied in. Used
/// both here and, in an identical shape, by the hot-topics repository to
/// order merged topics by adapter registration index.
fn case_order_clause(column: &str, n: usize) -> (String, String) {
    let in_sql = vec!["?"; n].join(",");
    let whens: Vec<String> = (0..n).map(|i| format!("WHEN ? THEN {i}")).collect();
    let case_sql = format!("CASE {column} {} END", whens.join(" "));
    (case_sql, in_sql)
}

fn clamp_limit(limit: Option<u32>) -> Result<u32> {
    match limit {
        Some(0) => Err(ArticleError::invalid_argument("limit must be at least 1")),
        Some(l) if l > MAX_LIMIT => Ok(MAX_LIMIT),
        Some(l) => Ok(l),
        None => Ok(DEFAULT_LIMIT),
    }
}

fn generate_id() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArticleStatus, CreateArticleParams, UpdateArticleParams};

    async fn repo() -> SqliteArticleRepository {
        SqliteArticleRepository::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let repo = repo().await;
        let created = repo
            .create_article(
                CreateArticleParams::new("a1", "Hello Go", "Full text search", ArticleStatus::Draft)
                    .with_tags(vec!["Go".into(), "SQLite".into()]),
            )
            .await
            .unwrap();
        assert_eq!(created.current_version, 1);
        assert_eq!(created.tags, vec!["go", "sqlite"]);

        let fetched = repo.get_article("a1").await.unwrap();
        assert_eq!(fetched.title, "Hello Go");
        assert_eq!(fetched.tags, vec!["go", "sqlite"]);
    }

    #[tokio::test]
    async fn create_published_with_blank_title_fails() {
        let repo = repo().await;
        let err = repo
            .create_article(CreateArticleParams::new("a1", "", "content", ArticleStatus::Published))
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
        assert!(repo.get_article("a1").await.is_err());
    }

    #[tokio::test]
    async fn duplicate_id_is_conflict() {
        let repo = repo().await;
        repo.create_article(CreateArticleParams::new("a1", "t", "c", ArticleStatus::Draft))
            .await
            .unwrap();
        let err = repo
            .create_article(CreateArticleParams::new("a1", "t2", "c2", ArticleStatus::Draft))
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn update_bumps_version_and_preserves_unspecified_fields() {
        let repo = repo().await;
        repo.create_article(
            CreateArticleParams::new("a1", "Hello Go", "Full text search", ArticleStatus::Draft)
                .with_tags(vec!["go".into(), "sqlite".into()]),
        )
        .await
        .unwrap();

        let updated = repo
            .update_article(
                "a1",
                UpdateArticleParams {
                    title: Some("Hello Go Updated".into()),
                    tags: Some(vec!["go".into(), "fts".into()]),
                    is_autosave: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.current_version, 2);
        assert_eq!(updated.title, "Hello Go Updated");
        assert_eq!(updated.content, "Full text search");
        assert_eq!(updated.tags, vec!["fts", "go"]);

        let versions = repo.list_versions("a1", None, None).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, 2);
        assert!(versions[0].is_autosave);
        assert_eq!(versions[1].version, 1);
        assert!(!versions[1].is_autosave);
    }

    #[tokio::test]
    async fn restore_reverts_fields_and_bumps_version() {
        let repo = repo().await;
        repo.create_article(
            CreateArticleParams::new("a1", "Hello Go", "Full text search", ArticleStatus::Draft)
                .with_tags(vec!["go".into(), "sqlite".into()]),
        )
        .await
        .unwrap();
        repo.update_article(
            "a1",
            UpdateArticleParams {
                title: Some("Hello Go Updated".into()),
                tags: Some(vec!["go".into(), "fts".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let restored = repo.restore_version("a1", 1).await.unwrap();
        assert_eq!(restored.current_version, 3);
        assert_eq!(restored.title, "Hello Go");
        assert_eq!(restored.tags, vec!["go", "sqlite"]);
    }

    #[tokio::test]
    async fn delete_removes_article_and_versions() {
        let repo = repo().await;
        repo.create_article(CreateArticleParams::new("a1", "t", "c", ArticleStatus::Draft))
            .await
            .unwrap();
        repo.delete_article("a1").await.unwrap();
        assert_eq!(
            repo.get_article("a1").await.unwrap_err().kind,
            crate::error::ErrorKind::NotFound
        );
        assert!(repo.list_versions("a1", None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_missing_article_is_not_found() {
        let repo = repo().await;
        let err = repo.delete_article("missing").await.unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn search_finds_then_loses_updated_text() {
        let repo = repo().await;
        repo.create_article(CreateArticleParams::new(
            "a1",
            "Hello Go",
            "Full text search",
            ArticleStatus::Draft,
        ))
        .await
        .unwrap();

        let hits = repo
            .search_articles(SearchArticlesParams {
                query: "Hello".into(),
                status: None,
                tag: None,
                limit: None,
                offset: None,
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a1");

        repo.update_article(
            "a1",
            UpdateArticleParams {
                title: Some("Hello Go Updated".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let stale_hits = repo
            .search_articles(SearchArticlesParams {
                query: "Updated".into(),
                status: None,
                tag: None,
                limit: None,
                offset: None,
            })
            .await
            .unwrap();
        assert_eq!(stale_hits.len(), 1);

        repo.delete_article("a1").await.unwrap();
        let gone = repo
            .search_articles(SearchArticlesParams {
                query: "Updated".into(),
                status: None,
                tag: None,
                limit: None,
                offset: None,
            })
            .await
            .unwrap();
        assert!(gone.is_empty());
    }

    #[tokio::test]
    async fn list_filters_by_tag_and_status() {
        let repo = repo().await;
        repo.create_article(
            CreateArticleParams::new("a1", "t1", "c1", ArticleStatus::Draft)
                .with_tags(vec!["go".into()]),
        )
        .await
        .unwrap();
        repo.create_article(
            CreateArticleParams::new("a2", "t2", "c2", ArticleStatus::Published)
                .with_tags(vec!["rust".into()]),
        )
        .await
        .unwrap();

        let by_tag = repo
            .list_articles(ListArticlesParams {
                tag: Some("go".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].id, "a1");

        let by_status = repo
            .list_articles(ListArticlesParams {
                status: Some(ArticleStatus::Published),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].id, "a2");
    }

    #[tokio::test]
    async fn get_version_rejects_non_positive_version() {
        let repo = repo().await;
        repo.create_article(CreateArticleParams::new("a1", "t", "c", ArticleStatus::Draft))
            .await
            .unwrap();
        let err = repo.get_version("a1", 0).await.unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
    }
}
