//! Per-domain credibility aggregates.
//!
//! Updated after every completed truth-check and read back as a scrutiny
//! signal for future analyses of the same domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum analyses before a domain warning can fire.
pub const WARN_MIN_ANALYSES: i64 = 3;

/// Fraction of questionable/unreliable ratings that triggers a warning.
pub const WARN_BAD_RATIO: f64 = 0.30;

/// Aggregate accuracy statistics for one source domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainStats {
    pub domain: String,
    pub analysis_count: i64,
    /// Sum of per-analysis quality scores (0-100 each).
    pub total_quality_score: i64,
    pub accurate_count: i64,
    pub mostly_accurate_count: i64,
    pub mixed_count: i64,
    pub questionable_count: i64,
    pub unreliable_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl DomainStats {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            analysis_count: 0,
            total_quality_score: 0,
            accurate_count: 0,
            mostly_accurate_count: 0,
            mixed_count: 0,
            questionable_count: 0,
            unreliable_count: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn average_quality(&self) -> f64 {
        if self.analysis_count == 0 {
            return 0.0;
        }
        self.total_quality_score as f64 / self.analysis_count as f64
    }

    fn bad_ratio(&self) -> f64 {
        if self.analysis_count == 0 {
            return 0.0;
        }
        (self.questionable_count + self.unreliable_count) as f64 / self.analysis_count as f64
    }

    /// Whether future analyses of this domain should carry a warning.
    pub fn should_warn(&self) -> bool {
        self.analysis_count >= WARN_MIN_ANALYSES && self.bad_ratio() > WARN_BAD_RATIO
    }

    /// Render the credibility warning injected into truth-check prompts.
    pub fn warning_text(&self) -> String {
        format!(
            "Source domain {} has a history of accuracy problems: {} of {} prior analyses were rated questionable or unreliable (average quality {:.0}/100). Apply extra scrutiny to factual claims.",
            self.domain,
            self.questionable_count + self.unreliable_count,
            self.analysis_count,
            self.average_quality()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_threshold() {
        let mut stats = DomainStats::new("example.com");
        assert!(!stats.should_warn());

        // 2 analyses is below the minimum even if both are bad
        stats.analysis_count = 2;
        stats.unreliable_count = 2;
        assert!(!stats.should_warn());

        // 1 of 3 bad is 33% > 30%
        stats.analysis_count = 3;
        stats.unreliable_count = 1;
        assert!(stats.should_warn());

        // exactly 30% does not warn
        stats.analysis_count = 10;
        stats.unreliable_count = 3;
        assert!(!stats.should_warn());
    }

    #[test]
    fn test_average_quality() {
        let mut stats = DomainStats::new("example.com");
        assert_eq!(stats.average_quality(), 0.0);
        stats.analysis_count = 4;
        stats.total_quality_score = 300;
        assert_eq!(stats.average_quality(), 75.0);
    }
}
