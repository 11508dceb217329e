//! Domain credibility statistics persistence.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{connect, parse_datetime, Result};
use crate::models::DomainStats;

/// Rating bucket recorded per completed truth-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingBucket {
    Accurate,
    MostlyAccurate,
    Mixed,
    Questionable,
    Unreliable,
}

impl RatingBucket {
    /// Map a truth-check overall rating string to a bucket.
    pub fn from_rating(rating: &str) -> Option<Self> {
        match rating.to_lowercase().replace([' ', '-'], "_").as_str() {
            "accurate" | "high" => Some(Self::Accurate),
            "mostly_accurate" => Some(Self::MostlyAccurate),
            "mixed" | "partially_accurate" => Some(Self::Mixed),
            "questionable" | "low" => Some(Self::Questionable),
            "unreliable" | "false" => Some(Self::Unreliable),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Self::Accurate => "accurate_count",
            Self::MostlyAccurate => "mostly_accurate_count",
            Self::Mixed => "mixed_count",
            Self::Questionable => "questionable_count",
            Self::Unreliable => "unreliable_count",
        }
    }
}

/// SQLite-backed domain statistics repository.
#[derive(Clone)]
pub struct DomainStatsRepository {
    db_path: PathBuf,
}

impl DomainStatsRepository {
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
            CREATE TABLE IF NOT EXISTS domain_stats (
                domain TEXT PRIMARY KEY,
                analysis_count INTEGER NOT NULL DEFAULT 0,
                total_quality_score INTEGER NOT NULL DEFAULT 0,
                accurate_count INTEGER NOT NULL DEFAULT 0,
                mostly_accurate_count INTEGER NOT NULL DEFAULT 0,
                mixed_count INTEGER NOT NULL DEFAULT 0,
                questionable_count INTEGER NOT NULL DEFAULT 0,
                unreliable_count INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Get stats for a domain.
    pub fn get(&self, domain: &str) -> Result<Option<DomainStats>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM domain_stats WHERE domain = ?1")?;
        let stats = stmt.query_row(params![domain], row_to_stats).optional()?;
        stats.transpose()
    }

    /// Record one completed truth-check for a domain, atomically.
    pub fn record_analysis(
        &self,
        domain: &str,
        quality_score: i64,
        bucket: RatingBucket,
    ) -> Result<()> {
        let conn = self.connect()?;
        // Bucket column comes from a fixed enum, never from input.
        let sql = format!(
            r#"
            INSERT INTO domain_stats (domain, analysis_count, total_quality_score, {col}, updated_at)
            VALUES (?1, 1, ?2, 1, ?3)
            ON CONFLICT(domain) DO UPDATE SET
                analysis_count = analysis_count + 1,
                total_quality_score = total_quality_score + excluded.total_quality_score,
                {col} = {col} + 1,
                updated_at = excluded.updated_at
            "#,
            col = bucket.column()
        );
        conn.execute(&sql, params![domain, quality_score, Utc::now().to_rfc3339()])?;
        Ok(())
    }

    /// List all domains ordered by analysis count.
    pub fn list(&self, limit: usize) -> Result<Vec<DomainStats>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT * FROM domain_stats ORDER BY analysis_count DESC LIMIT ?1")?;
        let rows = stmt.query_map(params![limit as i64], row_to_stats)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row??);
        }
        Ok(out)
    }
}

fn row_to_stats(row: &Row) -> rusqlite::Result<Result<DomainStats>> {
    Ok(build_stats(row))
}

fn build_stats(row: &Row) -> Result<DomainStats> {
    let updated_at_raw: String = row.get("updated_at")?;
    Ok(DomainStats {
        domain: row.get("domain")?,
        analysis_count: row.get("analysis_count")?,
        total_quality_score: row.get("total_quality_score")?,
        accurate_count: row.get("accurate_count")?,
        mostly_accurate_count: row.get("mostly_accurate_count")?,
        mixed_count: row.get("mixed_count")?,
        questionable_count: row.get("questionable_count")?,
        unreliable_count: row.get("unreliable_count")?,
        updated_at: parse_datetime(&updated_at_raw)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_analysis_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let repo = DomainStatsRepository::new(&dir.path().join("test.db")).unwrap();

        repo.record_analysis("example.com", 80, RatingBucket::Accurate).unwrap();
        repo.record_analysis("example.com", 20, RatingBucket::Unreliable).unwrap();
        repo.record_analysis("example.com", 30, RatingBucket::Questionable).unwrap();

        let stats = repo.get("example.com").unwrap().unwrap();
        assert_eq!(stats.analysis_count, 3);
        assert_eq!(stats.total_quality_score, 130);
        assert_eq!(stats.accurate_count, 1);
        assert_eq!(stats.unreliable_count, 1);
        assert_eq!(stats.questionable_count, 1);
        // 2 of 3 bad and count >= 3 triggers the warning
        assert!(stats.should_warn());
    }

    #[test]
    fn test_rating_bucket_mapping() {
        assert_eq!(RatingBucket::from_rating("Mostly Accurate"), Some(RatingBucket::MostlyAccurate));
        assert_eq!(RatingBucket::from_rating("unreliable"), Some(RatingBucket::Unreliable));
        assert_eq!(RatingBucket::from_rating("weird"), None);
    }
}
