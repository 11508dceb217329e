//! Moderation flag persistence.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, Row};

use super::{connect, parse_datetime, Result};
use crate::models::ModerationFlag;

/// SQLite-backed moderation flag repository.
#[derive(Clone)]
pub struct ModerationRepository {
    db_path: PathBuf,
}

impl ModerationRepository {
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
            CREATE TABLE IF NOT EXISTS moderation_flags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content_id TEXT NOT NULL,
                section TEXT NOT NULL,
                reason TEXT NOT NULL,
                excerpt TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_moderation_content
                ON moderation_flags(content_id);
            "#,
        )?;
        Ok(())
    }

    pub fn add(&self, flag: &ModerationFlag) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO moderation_flags (content_id, section, reason, excerpt, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                flag.content_id,
                flag.section,
                flag.reason,
                flag.excerpt,
                flag.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn get_for_content(&self, content_id: &str) -> Result<Vec<ModerationFlag>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT * FROM moderation_flags WHERE content_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![content_id], row_to_flag)?;
        let mut flags = Vec::new();
        for row in rows {
            flags.push(row??);
        }
        Ok(flags)
    }
}

fn row_to_flag(row: &Row) -> rusqlite::Result<Result<ModerationFlag>> {
    let created_at_raw: String = row.get("created_at")?;
    Ok((|| {
        Ok(ModerationFlag {
            id: row.get("id")?,
            content_id: row.get("content_id")?,
            section: row.get("section")?,
            reason: row.get("reason")?,
            excerpt: row.get("excerpt")?,
            created_at: parse_datetime(&created_at_raw)?,
        })
    })())
}
