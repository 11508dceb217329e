//! Content item persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{connect, parse_datetime, parse_string_list, Result, RepositoryError};
use crate::models::{ContentItem, SourceType, FAILURE_SENTINEL_PREFIX};

/// SQLite-backed content item repository.
#[derive(Clone)]
pub struct ContentRepository {
    db_path: PathBuf,
}

impl ContentRepository {
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn connect(&self) -> Result<Connection> {
        connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS content_items (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                url TEXT NOT NULL,
                normalized_url TEXT NOT NULL,
                source_type TEXT NOT NULL,
                title TEXT,
                author TEXT,
                duration_secs INTEGER,
                view_count INTEGER,
                full_text TEXT,
                detected_tone TEXT,
                tags TEXT,
                analysis_language TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_content_normalized_url
                ON content_items(normalized_url, created_at);
            CREATE INDEX IF NOT EXISTS idx_content_user
                ON content_items(user_id);
            "#,
        )?;
        Ok(())
    }

    /// Insert or fully update a content item.
    pub fn save(&self, item: &ContentItem) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO content_items
                (id, user_id, url, normalized_url, source_type, title, author,
                 duration_secs, view_count, full_text, detected_tone, tags,
                 analysis_language, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                duration_secs = excluded.duration_secs,
                view_count = excluded.view_count,
                full_text = excluded.full_text,
                detected_tone = excluded.detected_tone,
                tags = excluded.tags,
                analysis_language = excluded.analysis_language,
                updated_at = excluded.updated_at
            "#,
            params![
                item.id,
                item.user_id,
                item.url,
                item.normalized_url,
                item.source_type.as_str(),
                item.title,
                item.author,
                item.duration_secs,
                item.view_count,
                item.full_text,
                item.detected_tone,
                serde_json::to_string(&item.tags).unwrap_or_else(|_| "[]".to_string()),
                item.analysis_language,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a content item by ID.
    pub fn get(&self, id: &str) -> Result<Option<ContentItem>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM content_items WHERE id = ?")?;
        let item = stmt.query_row(params![id], row_to_item).optional()?;
        item.transpose()
    }

    /// Find the requesting user's existing item for a normalized URL.
    pub fn get_by_url_for_user(
        &self,
        normalized_url: &str,
        user_id: Option<&str>,
    ) -> Result<Option<ContentItem>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM content_items
             WHERE normalized_url = ?1 AND user_id IS ?2
             ORDER BY created_at DESC LIMIT 1",
        )?;
        let item = stmt
            .query_row(params![normalized_url, user_id], row_to_item)
            .optional()?;
        item.transpose()
    }

    /// Cross-user cache candidates: recent, non-failed items for the same
    /// normalized URL owned by *other* users, newest first.
    pub fn find_cache_candidates(
        &self,
        normalized_url: &str,
        exclude_user: Option<&str>,
        source_type: SourceType,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ContentItem>> {
        let cutoff = now - Duration::days(source_type.cache_staleness_days());
        let conn = self.connect()?;
        let sentinel_pattern = format!("{FAILURE_SENTINEL_PREFIX}%");
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM content_items
            WHERE normalized_url = ?1
              AND (?2 IS NULL OR user_id IS NULL OR user_id != ?2)
              AND full_text IS NOT NULL
              AND full_text != ''
              AND full_text NOT LIKE ?3
              AND created_at >= ?4
            ORDER BY created_at DESC
            LIMIT ?5
            "#,
        )?;
        let rows = stmt.query_map(
            params![
                normalized_url,
                exclude_user,
                sentinel_pattern,
                cutoff.to_rfc3339(),
                limit as i64
            ],
            row_to_item,
        )?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row??);
        }
        // Exclude items actually owned by the requesting user. The SQL
        // filter already handles named users; this also covers the case
        // where both sides are anonymous.
        if exclude_user.is_none() {
            items.retain(|i| i.user_id.is_some());
        }
        Ok(items)
    }

    /// Update just the acquired text and metadata after acquisition.
    pub fn update_acquired(&self, item: &ContentItem) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            UPDATE content_items
            SET title = ?2, author = ?3, duration_secs = ?4, view_count = ?5,
                full_text = ?6, detected_tone = ?7, tags = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
            params![
                item.id,
                item.title,
                item.author,
                item.duration_secs,
                item.view_count,
                item.full_text,
                item.detected_tone,
                serde_json::to_string(&item.tags).unwrap_or_else(|_| "[]".to_string()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Store the detected tone for an item.
    pub fn set_tone(&self, id: &str, tone: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE content_items SET detected_tone = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, tone, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Store generated tags for an item.
    pub fn set_tags(&self, id: &str, tags: &[String]) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE content_items SET tags = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                id,
                serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string()),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

fn row_to_item(row: &Row) -> rusqlite::Result<Result<ContentItem>> {
    Ok(build_item(row))
}

fn build_item(row: &Row) -> Result<ContentItem> {
    let source_type_raw: String = row.get("source_type")?;
    let source_type = SourceType::from_str(&source_type_raw)
        .ok_or_else(|| RepositoryError::Corrupt(format!("bad source_type {source_type_raw:?}")))?;
    let created_at_raw: String = row.get("created_at")?;
    let updated_at_raw: String = row.get("updated_at")?;
    Ok(ContentItem {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        url: row.get("url")?,
        normalized_url: row.get("normalized_url")?,
        source_type,
        title: row.get("title")?,
        author: row.get("author")?,
        duration_secs: row.get("duration_secs")?,
        view_count: row.get("view_count")?,
        full_text: row.get("full_text")?,
        detected_tone: row.get("detected_tone")?,
        tags: parse_string_list(row.get("tags")?),
        analysis_language: row.get("analysis_language")?,
        created_at: parse_datetime(&created_at_raw)?,
        updated_at: parse_datetime(&updated_at_raw)?,
    })
}
