use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::cache::Cache;

pub mod lineup;
pub mod lookup;
pub mod schedule;

pub const DEFAULT_STATSAPI_URL: &str = "https://statsapi.mlb.com";

/// Thin JSON client for the MLB Stats API. Response bodies are cached as text
/// so any `Cache` implementation can hold them.
pub struct StatsApiClient {
    agent: ureq::Agent,
    base_url: String,
    cache: Arc<dyn Cache>,
    cache_ttl: Duration,
}

impl StatsApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        cache: Arc<dyn Cache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: String::from(base_url.trim_end_matches('/')),
            cache,
            cache_ttl,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let key = cache_key(path, query);
        if let Some(body) = self.cache.get(&key) {
            debug!("Cache hit for {key}");
            return Ok(body);
        }
        info!("Fetching {key} from the Stats API");
        let request = query
            .iter()
            .fold(self.agent.get(&self.url(path)), |req, (k, v)| req.query(k, v));
        let body = request
            .call()
            .with_context(|| format!("Stats API request {path} failed"))?
            .into_string()
            .context("Stats API response was not valid text")?;
        self.cache.put(&key, body.clone(), self.cache_ttl);
        Ok(body)
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let body = self.get_text(path, query)?;
        serde_json::from_str(&body)
            .with_context(|| format!("Response from {path} was not the expected JSON"))
    }
}

fn cache_key(path: &str, query: &[(&str, &str)]) -> String {
    let params = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("statsapi:{}?{params}", path.trim_start_matches('/'))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    impl StatsApiClient {
        /// Seeds the cache with `body` for a request so it is served without the network.
        pub(crate) fn prime(&self, path: &str, query: &[(&str, &str)], body: &str) {
            self.cache.put(&cache_key(path, query), String::from(body), self.cache_ttl);
        }
    }

    /// A client whose cache already holds `body` for the given request. The base url
    /// is unroutable, so anything not primed fails.
    pub(crate) fn primed_client(path: &str, query: &[(&str, &str)], body: &str) -> StatsApiClient {
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new(16));
        let client = StatsApiClient::new(
            "http://127.0.0.1:9/",
            Duration::from_millis(50),
            cache,
            Duration::from_secs(60),
        );
        client.prime(path, query, body);
        client
    }

    #[test]
    fn test_cache_key_includes_query() {
        assert_eq!(
            cache_key("/api/v1/schedule", &[("sportId", "1"), ("date", "2024-04-01")]),
            "statsapi:api/v1/schedule?sportId=1&date=2024-04-01"
        );
    }

    #[test]
    fn test_url_joins_cleanly() {
        let client = primed_client("x", &[], "{}");
        assert_eq!(client.url("/api/v1/people"), "http://127.0.0.1:9/api/v1/people");
    }

    #[test]
    fn test_get_json_reads_from_cache() {
        let client = primed_client("api/v1/ping", &[], r#"{"ok": true}"#);
        let value: serde_json::Value = client.get_json("api/v1/ping", &[]).unwrap();
        assert_eq!(value["ok"], true);
    }
}
