use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_schema_version() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigIntervals {
    pub discovery_ms: u64,
    pub reaper_ms: u64,
    pub details_ms: u64,
    pub steering_ms: u64,
    pub party_genres_ms: u64,
    pub user_genres_ms: u64,
    pub file_watch_poll_ms: u64,
}

impl Default for ConfigIntervals {
    fn default() -> Self {
        Self {
            discovery_ms: 5_000,
            reaper_ms: 5_000,
            details_ms: 5_000,
            steering_ms: 5_000,
            party_genres_ms: 300_000,
            user_genres_ms: 300_000,
            file_watch_poll_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub drift_tolerance_ms: u64,
    pub inactivity_timeout_secs: u64,
    pub queue_limit: usize,
    pub history_limit: usize,
    pub top_genre_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drift_tolerance_ms: 1_000,
            inactivity_timeout_secs: 150,
            queue_limit: 5,
            history_limit: 5,
            top_genre_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_base_url: String,
    pub accounts_base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_id: "YOUR_SPOTIFY_CLIENT_ID".to_string(),
            client_secret: "YOUR_SPOTIFY_CLIENT_SECRET".to_string(),
            api_base_url: "https://api.spotify.com/v1".to_string(),
            accounts_base_url: "https://accounts.spotify.com".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// JSON snapshot file. When unset the store lives only in memory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub intervals: ConfigIntervals,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            log_level: default_log_level(),
            provider: ProviderConfig::default(),
            intervals: ConfigIntervals::default(),
            sync: SyncConfig::default(),
            store: StoreConfig::default(),
        }
    }
}
