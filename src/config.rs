//! Configuration management.
//!
//! Settings load from `config.toml` in the data directory, with serde
//! defaults for every field so a missing or partial file still works.
//! Credentials may also come from the environment; `.env` files are
//! honored at startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::providers::{
    ChatConfig, RetryPolicy, ScrapeConfig, SearchConfig, TranscriptionConfig, VideoConfig,
};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory override; defaults to the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub ai: ChatConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub video: VideoConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

/// Pipeline timing and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Whole-pipeline budget in seconds.
    #[serde(default = "default_pipeline_budget")]
    pub pipeline_budget_secs: u64,
    /// Phase-1 enrichment budget in seconds.
    #[serde(default = "default_enrichment_budget")]
    pub enrichment_budget_secs: u64,
    /// Per-external-call timeout in seconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    /// Per-acquisition-call timeout in seconds (scrapes and transcripts
    /// run longer than API calls).
    #[serde(default = "default_acquisition_timeout")]
    pub acquisition_timeout_secs: u64,
    /// Retry attempts for provider calls.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Extra backoff multiplier after a 429.
    #[serde(default = "default_rate_limit_multiplier")]
    pub rate_limit_multiplier: u32,
    /// Prompt cache TTL in seconds.
    #[serde(default = "default_prompt_ttl")]
    pub prompt_cache_ttl_secs: u64,
}

fn default_pipeline_budget() -> u64 {
    180
}
fn default_enrichment_budget() -> u64 {
    20
}
fn default_call_timeout() -> u64 {
    30
}
fn default_acquisition_timeout() -> u64 {
    45
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_rate_limit_multiplier() -> u32 {
    4
}
fn default_prompt_ttl() -> u64 {
    300
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pipeline_budget_secs: default_pipeline_budget(),
            enrichment_budget_secs: default_enrichment_budget(),
            call_timeout_secs: default_call_timeout(),
            acquisition_timeout_secs: default_acquisition_timeout(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            rate_limit_multiplier: default_rate_limit_multiplier(),
            prompt_cache_ttl_secs: default_prompt_ttl(),
        }
    }
}

impl PipelineConfig {
    pub fn pipeline_budget(&self) -> Duration {
        Duration::from_secs(self.pipeline_budget_secs)
    }

    pub fn enrichment_budget(&self) -> Duration {
        Duration::from_secs(self.enrichment_budget_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn acquisition_timeout(&self) -> Duration {
        Duration::from_secs(self.acquisition_timeout_secs)
    }

    pub fn prompt_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.prompt_cache_ttl_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            rate_limit_multiplier: self.rate_limit_multiplier,
        }
    }
}

impl Config {
    /// Load config from `config.toml` under the data directory, falling
    /// back to defaults when absent.
    pub fn load(data_dir_override: Option<&Path>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override);
        let path = data_dir.join("config.toml");
        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            toml::from_str::<Config>(&raw)?
        } else {
            Config::default()
        };
        config.data_dir = Some(data_dir);
        Ok(config)
    }

    /// Resolved data directory.
    pub fn data_dir(&self) -> PathBuf {
        resolve_data_dir(self.data_dir.as_deref())
    }

    /// Path of the SQLite database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("veriscope.db")
    }

    /// Write the current config to `config.toml` in the data directory.
    pub fn save(&self) -> anyhow::Result<()> {
        let dir = self.data_dir();
        fs::create_dir_all(&dir)?;
        let raw = toml::to_string_pretty(self)?;
        fs::write(dir.join("config.toml"), raw)?;
        Ok(())
    }
}

fn resolve_data_dir(data_dir_override: Option<&Path>) -> PathBuf {
    if let Some(dir) = data_dir_override {
        return dir.to_path_buf();
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("veriscope")
}
