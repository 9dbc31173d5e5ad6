use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Append-only log backing the store; `None` keeps everything in memory
    pub data_file: Option<PathBuf>,
    /// Deadline for the cell lookups of a single radius query
    pub query_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            data_file: Some(default_data_file()),
            query_timeout_ms: 5000,
        }
    }
}

/// ~/.geohash-locator/locations.jsonl
pub fn default_data_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".geohash-locator")
        .join("locations.jsonl")
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("LOCATOR_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(path) = lookup("LOCATOR_DATA_FILE") {
            config.data_file = if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Some(val) = lookup("LOCATOR_QUERY_TIMEOUT_MS") {
            match val.parse() {
                Ok(v) => config.query_timeout_ms = v,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid LOCATOR_QUERY_TIMEOUT_MS"),
            }
        }

        config
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}
