//! Summary persistence.
//!
//! One row per `(content_id, language)`. Section writes are independent
//! idempotent upserts so a failing section never blocks the others.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{connect, parse_datetime, Result, RepositoryError};
use crate::models::{ProcessingStatus, SectionKind, Summary};

/// SQLite-backed summary repository.
#[derive(Clone)]
pub struct SummaryRepository {
    db_path: PathBuf,
}

impl SummaryRepository {
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
            CREATE TABLE IF NOT EXISTS summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content_id TEXT NOT NULL,
                language TEXT NOT NULL,
                overview TEXT,
                triage TEXT,
                mid_summary TEXT,
                detailed_summary TEXT,
                auto_tags TEXT,
                truth_check TEXT,
                action_items TEXT,
                processing_status TEXT NOT NULL DEFAULT 'none',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(content_id, language)
            );
            "#,
        )?;
        Ok(())
    }

    /// Get the summary for a content item and language.
    pub fn get(&self, content_id: &str, language: &str) -> Result<Option<Summary>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT * FROM summaries WHERE content_id = ?1 AND language = ?2")?;
        let summary = stmt
            .query_row(params![content_id, language], row_to_summary)
            .optional()?;
        summary.transpose()
    }

    /// Ensure a summary row exists, returning its current state.
    pub fn ensure(&self, content_id: &str, language: &str) -> Result<Summary> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO summaries (content_id, language, processing_status, created_at, updated_at)
            VALUES (?1, ?2, 'none', ?3, ?3)
            ON CONFLICT(content_id, language) DO NOTHING
            "#,
            params![content_id, language, now],
        )?;
        drop(conn);
        self.get(content_id, language)?.ok_or_else(|| {
            RepositoryError::Corrupt(format!("summary vanished for {content_id}/{language}"))
        })
    }

    /// Upsert one section value. Creates the row on first write.
    pub fn upsert_section(
        &self,
        content_id: &str,
        language: &str,
        kind: SectionKind,
        value: &str,
    ) -> Result<()> {
        self.ensure(content_id, language)?;
        let conn = self.connect()?;
        // Column name comes from a fixed enum, never from input.
        let sql = format!(
            "UPDATE summaries SET {} = ?3, updated_at = ?4 WHERE content_id = ?1 AND language = ?2",
            kind.as_str()
        );
        conn.execute(
            &sql,
            params![content_id, language, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Set the processing status, creating the row if needed.
    pub fn set_status(
        &self,
        content_id: &str,
        language: &str,
        status: ProcessingStatus,
    ) -> Result<()> {
        self.ensure(content_id, language)?;
        let conn = self.connect()?;
        conn.execute(
            "UPDATE summaries SET processing_status = ?3, updated_at = ?4
             WHERE content_id = ?1 AND language = ?2",
            params![content_id, language, status.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Clear all sections for a regeneration. Status resets to `none`.
    pub fn clear(&self, content_id: &str, language: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            UPDATE summaries SET
                overview = NULL, triage = NULL, mid_summary = NULL,
                detailed_summary = NULL, auto_tags = NULL, truth_check = NULL,
                action_items = NULL, processing_status = 'none', updated_at = ?3
            WHERE content_id = ?1 AND language = ?2
            "#,
            params![content_id, language, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Clone all sections and status from another summary row.
    /// Used by the cross-user cache resolver; writes in one statement.
    pub fn clone_from(&self, source: &Summary, content_id: &str) -> Result<()> {
        self.ensure(content_id, &source.language)?;
        let conn = self.connect()?;
        conn.execute(
            r#"
            UPDATE summaries SET
                overview = ?3, triage = ?4, mid_summary = ?5, detailed_summary = ?6,
                auto_tags = ?7, truth_check = ?8, action_items = ?9,
                processing_status = ?10, updated_at = ?11
            WHERE content_id = ?1 AND language = ?2
            "#,
            params![
                content_id,
                source.language,
                source.overview,
                source.triage,
                source.mid_summary,
                source.detailed_summary,
                source.auto_tags,
                source.truth_check,
                source.action_items,
                source.processing_status.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

fn row_to_summary(row: &Row) -> rusqlite::Result<Result<Summary>> {
    Ok(build_summary(row))
}

fn build_summary(row: &Row) -> Result<Summary> {
    let status_raw: String = row.get("processing_status")?;
    let status = ProcessingStatus::from_str(&status_raw)
        .ok_or_else(|| RepositoryError::Corrupt(format!("bad processing_status {status_raw:?}")))?;
    let created_at_raw: String = row.get("created_at")?;
    let updated_at_raw: String = row.get("updated_at")?;
    Ok(Summary {
        id: row.get("id")?,
        content_id: row.get("content_id")?,
        language: row.get("language")?,
        overview: row.get("overview")?,
        triage: row.get("triage")?,
        mid_summary: row.get("mid_summary")?,
        detailed_summary: row.get("detailed_summary")?,
        auto_tags: row.get("auto_tags")?,
        truth_check: row.get("truth_check")?,
        action_items: row.get("action_items")?,
        processing_status: status,
        created_at: parse_datetime(&created_at_raw)?,
        updated_at: parse_datetime(&updated_at_raw)?,
    })
}
