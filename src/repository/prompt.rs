//! Analysis prompt persistence.
//!
//! Read-only from the pipeline's perspective; seeded on `init` and
//! editable out-of-band.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{connect, parse_datetime, Result};
use crate::models::AnalysisPrompt;

/// SQLite-backed prompt repository.
#[derive(Clone)]
pub struct PromptRepository {
    db_path: PathBuf,
}

impl PromptRepository {
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
            CREATE TABLE IF NOT EXISTS analysis_prompts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                section TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                system_text TEXT NOT NULL,
                user_template TEXT NOT NULL,
                model TEXT NOT NULL,
                temperature REAL NOT NULL,
                max_tokens INTEGER NOT NULL,
                expect_json INTEGER NOT NULL DEFAULT 0,
                use_web_search INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                UNIQUE(section, version)
            );
            "#,
        )?;
        Ok(())
    }

    /// Get the latest version of a section's prompt.
    pub fn get_latest(&self, section: &str) -> Result<Option<AnalysisPrompt>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM analysis_prompts WHERE section = ?1 ORDER BY version DESC LIMIT 1",
        )?;
        let prompt = stmt.query_row(params![section], row_to_prompt).optional()?;
        prompt.transpose()
    }

    /// Insert a prompt if no version exists for its section yet.
    /// Used to seed built-in defaults without clobbering tuned prompts.
    pub fn seed(&self, prompt: &AnalysisPrompt) -> Result<bool> {
        if self.get_latest(&prompt.section)?.is_some() {
            return Ok(false);
        }
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO analysis_prompts
                (section, version, system_text, user_template, model, temperature,
                 max_tokens, expect_json, use_web_search, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                prompt.section,
                prompt.version,
                prompt.system_text,
                prompt.user_template,
                prompt.model,
                prompt.temperature,
                prompt.max_tokens,
                prompt.expect_json,
                prompt.use_web_search,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(true)
    }

    /// Insert a new prompt version for a section (fails on a duplicate
    /// section/version pair).
    pub fn insert_version(&self, prompt: &AnalysisPrompt) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO analysis_prompts
                (section, version, system_text, user_template, model, temperature,
                 max_tokens, expect_json, use_web_search, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                prompt.section,
                prompt.version,
                prompt.system_text,
                prompt.user_template,
                prompt.model,
                prompt.temperature,
                prompt.max_tokens,
                prompt.expect_json,
                prompt.use_web_search,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// List the latest version of every section prompt.
    pub fn list_latest(&self) -> Result<Vec<AnalysisPrompt>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT p.* FROM analysis_prompts p
            JOIN (SELECT section, MAX(version) AS v FROM analysis_prompts GROUP BY section) m
              ON p.section = m.section AND p.version = m.v
            ORDER BY p.section
            "#,
        )?;
        let rows = stmt.query_map([], row_to_prompt)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row??);
        }
        Ok(out)
    }
}

fn row_to_prompt(row: &Row) -> rusqlite::Result<Result<AnalysisPrompt>> {
    Ok(build_prompt(row))
}

fn build_prompt(row: &Row) -> Result<AnalysisPrompt> {
    let updated_at_raw: String = row.get("updated_at")?;
    Ok(AnalysisPrompt {
        id: row.get("id")?,
        section: row.get("section")?,
        version: row.get("version")?,
        system_text: row.get("system_text")?,
        user_template: row.get("user_template")?,
        model: row.get("model")?,
        temperature: row.get("temperature")?,
        max_tokens: row.get("max_tokens")?,
        expect_json: row.get("expect_json")?,
        use_web_search: row.get("use_web_search")?,
        updated_at: parse_datetime(&updated_at_raw)?,
    })
}
