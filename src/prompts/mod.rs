//! Prompt template access with a TTL cache.
//!
//! Prompts live in the database; the store caches them in-process for a
//! short TTL so each pipeline run does not re-read every template. The
//! clock is injected so tests can control expiry deterministically.

mod defaults;

pub use defaults::{default_prompts, SECTION_CLAIM_EXTRACTION, SECTION_TONE};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::AnalysisPrompt;
use crate::repository::{PromptRepository, Result};

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CacheEntry {
    prompt: AnalysisPrompt,
    fetched_at: DateTime<Utc>,
}

/// Cached, read-only view over the prompt table.
///
/// Process-wide and shared across runs; the pipeline never mutates it.
pub struct PromptStore {
    repo: PromptRepository,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl PromptStore {
    pub fn new(repo: PromptRepository, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            ttl,
            clock,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Seed built-in prompts that have no database row yet.
    pub fn seed_defaults(&self) -> Result<usize> {
        let mut seeded = 0;
        for prompt in default_prompts() {
            if self.repo.seed(&prompt)? {
                seeded += 1;
            }
        }
        Ok(seeded)
    }

    /// Get the prompt for a section, from cache when fresh.
    ///
    /// Falls back to the built-in default when the table has no row, so a
    /// half-seeded database never stalls the pipeline.
    pub fn get(&self, section: &str) -> Result<AnalysisPrompt> {
        let now = self.clock.now();
        {
            let cache = self.cache.lock().expect("prompt cache poisoned");
            if let Some(entry) = cache.get(section) {
                let age = (now - entry.fetched_at).to_std().unwrap_or(Duration::MAX);
                if age < self.ttl {
                    return Ok(entry.prompt.clone());
                }
            }
        }

        let prompt = match self.repo.get_latest(section)? {
            Some(p) => p,
            None => {
                debug!("no stored prompt for {section}, using built-in default");
                default_prompts()
                    .into_iter()
                    .find(|p| p.section == section)
                    .ok_or_else(|| {
                        crate::repository::RepositoryError::Corrupt(format!(
                            "unknown prompt section {section:?}"
                        ))
                    })?
            }
        };

        let mut cache = self.cache.lock().expect("prompt cache poisoned");
        cache.insert(
            section.to_string(),
            CacheEntry { prompt: prompt.clone(), fetched_at: now },
        );
        Ok(prompt)
    }
}
