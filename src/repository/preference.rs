//! User analysis preference persistence.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{connect, parse_string_list, Result};
use crate::models::UserPreferences;

/// SQLite-backed preference repository.
#[derive(Clone)]
pub struct PreferenceRepository {
    db_path: PathBuf,
}

impl PreferenceRepository {
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
            CREATE TABLE IF NOT EXISTS user_preferences (
                user_id TEXT PRIMARY KEY,
                custom_instructions TEXT,
                focus_areas TEXT NOT NULL DEFAULT '[]',
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM user_preferences WHERE user_id = ?1")?;
        let prefs = stmt
            .query_row(params![user_id], row_to_prefs)
            .optional()?;
        Ok(prefs)
    }

    pub fn save(&self, prefs: &UserPreferences) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO user_preferences (user_id, custom_instructions, focus_areas, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id) DO UPDATE SET
                custom_instructions = excluded.custom_instructions,
                focus_areas = excluded.focus_areas,
                updated_at = excluded.updated_at
            "#,
            params![
                prefs.user_id,
                prefs.custom_instructions,
                serde_json::to_string(&prefs.focus_areas).unwrap_or_else(|_| "[]".to_string()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

fn row_to_prefs(row: &Row) -> rusqlite::Result<UserPreferences> {
    Ok(UserPreferences {
        user_id: row.get("user_id")?,
        custom_instructions: row.get("custom_instructions")?,
        focus_areas: parse_string_list(row.get("focus_areas")?),
    })
}
