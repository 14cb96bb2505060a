use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{KeeperError, Result};
use crate::transfer::TruncationPolicy;

/// Configuration shared by both binaries, loaded from `keeper.toml`.
///
/// Every field has a default so the keeper runs without any config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub client: ClientSettings,
}

/// The `[server]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Listen address, `host:port`.
    #[serde(default = "default_server_address")]
    pub address: String,

    /// SQLite database file (`:memory:` for a throwaway store).
    #[serde(default = "default_database")]
    pub database: String,

    /// Session token lifetime in seconds (default: 3 hours).
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// How long in-flight requests get to finish on shutdown.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// What to do with a multipart part that ends before its boundary.
    #[serde(default)]
    pub truncation: TruncationPolicy,

    /// Largest accepted request body in bytes; 0 lifts the limit.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

/// The `[client]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Base URL of the keeper server.
    #[serde(default = "default_client_address")]
    pub address: String,

    /// Waits before each delivery attempt, in milliseconds.
    #[serde(default = "default_retry_intervals_ms")]
    pub retry_intervals_ms: Vec<u64>,

    /// Deadline for a single attempt.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Gzip request bodies.
    #[serde(default)]
    pub gzip: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_server_address() -> String {
    "localhost:8080".to_string()
}

fn default_database() -> String {
    "keeper.db".to_string()
}

fn default_token_ttl_secs() -> u64 {
    3 * 60 * 60
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_client_address() -> String {
    "http://localhost:8080".to_string()
}

fn default_retry_intervals_ms() -> Vec<u64> {
    vec![0, 1_000, 3_000, 5_000]
}

fn default_request_timeout_secs() -> u64 {
    15
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: default_server_address(),
            database: default_database(),
            token_ttl_secs: default_token_ttl_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            truncation: TruncationPolicy::default(),
            max_body_bytes: default_max_body_bytes(),
            log_filter: default_log_filter(),
        }
    }
}

impl ServerSettings {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            address: default_client_address(),
            retry_intervals_ms: default_retry_intervals_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            gzip: false,
        }
    }
}

impl ClientSettings {
    pub fn retry_intervals(&self) -> Vec<Duration> {
        self.retry_intervals_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Settings {
    /// Default config file name, looked up in the working directory.
    pub const FILE_NAME: &'static str = "keeper.toml";

    /// Load settings from `path`.
    ///
    /// A missing file yields defaults; a file that fails to parse is an
    /// error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            KeeperError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;

        Ok(settings)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
