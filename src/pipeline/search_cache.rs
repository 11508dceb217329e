//! Request-scoped web-search result cache.
//!
//! One cache per pipeline run, passed explicitly and dropped at run end.
//! Never shared across runs: results can reflect one tenant's content and
//! must not leak into another tenant's analysis.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::providers::{ProviderError, SearchHit, SearchProvider};

/// Per-run memo of search results, keyed by normalized query.
#[derive(Default)]
pub struct SearchCache {
    inner: Mutex<HashMap<String, Vec<SearchHit>>>,
}

fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search through the cache, hitting the provider only on a miss.
    /// Failed searches are not cached so a later query can retry.
    pub async fn search(
        &self,
        provider: &dyn SearchProvider,
        query: &str,
        budget: Duration,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        let key = normalize_query(query);
        {
            let cache = self.inner.lock().await;
            if let Some(hits) = cache.get(&key) {
                return Ok(hits.clone());
            }
        }
        let hits = provider.search(query, budget).await?;
        let mut cache = self.inner.lock().await;
        cache.insert(key, hits.clone());
        Ok(hits)
    }
}
