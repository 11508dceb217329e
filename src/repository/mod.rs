//! Repository layer for SQLite persistence.
//!
//! Each repository owns the database path and opens a connection per
//! call. Schema initialization is idempotent; every repository's `new`
//! ensures its tables exist.

mod claim;
mod content;
mod domain;
mod moderation;
mod preference;
mod prompt;
mod summary;

pub use claim::ClaimRepository;
pub use content::ContentRepository;
pub use domain::{DomainStatsRepository, RatingBucket};
pub use moderation::ModerationRepository;
pub use preference::PreferenceRepository;
pub use prompt::PromptRepository;
pub use summary::SummaryRepository;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;

/// Repository result type.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Open a connection with standard pragmas.
pub(crate) fn connect(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

/// Parse an RFC 3339 timestamp column.
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Corrupt(format!("bad timestamp {s:?}: {e}")))
}

/// Parse a JSON string-array column, tolerating NULL.
pub(crate) fn parse_string_list(s: Option<String>) -> Vec<String> {
    s.and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2026-01-02T03:04:05Z").unwrap();
        assert_eq!(dt.timestamp(), 1767323045);
        assert!(parse_datetime("garbage").is_err());
    }

    #[test]
    fn test_parse_string_list() {
        assert_eq!(
            parse_string_list(Some("[\"a\",\"b\"]".to_string())),
            vec!["a", "b"]
        );
        assert!(parse_string_list(None).is_empty());
        assert!(parse_string_list(Some("not json".to_string())).is_empty());
    }
}
