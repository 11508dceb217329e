//! Claim persistence.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use super::{connect, parse_datetime, parse_string_list, Result, RepositoryError};
use crate::models::{Claim, ClaimSeverity, ClaimStatus};

/// SQLite-backed claim repository.
#[derive(Clone)]
pub struct ClaimRepository {
    db_path: PathBuf,
}

impl ClaimRepository {
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
            CREATE TABLE IF NOT EXISTS claims (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content_id TEXT NOT NULL,
                user_id TEXT,
                claim_text TEXT NOT NULL,
                normalized_text TEXT NOT NULL,
                status TEXT NOT NULL,
                severity TEXT NOT NULL,
                sources TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_claims_content ON claims(content_id);
            CREATE INDEX IF NOT EXISTS idx_claims_normalized ON claims(normalized_text);
            "#,
        )?;
        Ok(())
    }

    /// Replace all claims for a content item (delete-then-insert, one
    /// transaction). Claims are never merged across regenerations.
    pub fn replace_for_content(&self, content_id: &str, claims: &[Claim]) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM claims WHERE content_id = ?1", params![content_id])?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO claims
                    (content_id, user_id, claim_text, normalized_text, status, severity, sources, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;
            for claim in claims {
                stmt.execute(params![
                    claim.content_id,
                    claim.user_id,
                    claim.claim_text,
                    claim.normalized_text,
                    claim.status.as_str(),
                    claim.severity.as_str(),
                    serde_json::to_string(&claim.sources).unwrap_or_else(|_| "[]".to_string()),
                    claim.created_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Get all claims for a content item.
    pub fn get_for_content(&self, content_id: &str) -> Result<Vec<Claim>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT * FROM claims WHERE content_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![content_id], row_to_claim)?;
        let mut claims = Vec::new();
        for row in rows {
            claims.push(row??);
        }
        Ok(claims)
    }
}

fn row_to_claim(row: &Row) -> rusqlite::Result<Result<Claim>> {
    Ok(build_claim(row))
}

fn build_claim(row: &Row) -> Result<Claim> {
    let status_raw: String = row.get("status")?;
    let severity_raw: String = row.get("severity")?;
    let created_at_raw: String = row.get("created_at")?;
    Ok(Claim {
        id: row.get("id")?,
        content_id: row.get("content_id")?,
        user_id: row.get("user_id")?,
        claim_text: row.get("claim_text")?,
        normalized_text: row.get("normalized_text")?,
        status: ClaimStatus::from_str(&status_raw)
            .ok_or_else(|| RepositoryError::Corrupt(format!("bad claim status {status_raw:?}")))?,
        severity: ClaimSeverity::from_str(&severity_raw).ok_or_else(|| {
            RepositoryError::Corrupt(format!("bad claim severity {severity_raw:?}"))
        })?,
        sources: parse_string_list(row.get("sources")?),
        created_at: parse_datetime(&created_at_raw)?,
    })
}
