//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FAMLEDGER_SYNC_MODE=manual                                         │
//! │     FAMLEDGER_ACCESS_TOKEN=...                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/famledger/sync.toml (Linux)                              │
//! │     ~/Library/Application Support/com.famledger.famledger/sync.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     periodic mode, 5 minute interval, replace refresh policy           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [account]
//! family_id = "fam-001"
//! member_id = "member-001"
//!
//! [remote]
//! base_url = "https://api.example.com"
//! access_token = "..."
//! request_timeout_secs = 30
//! connect_timeout_secs = 10
//!
//! [sync]
//! mode = "periodic"          # periodic | manual | offline
//! interval_secs = 300
//! push_concurrency = 4
//! refresh_policy = "replace" # replace | merge
//!
//! [database]
//! path = "/optional/override.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Sync Mode
// =============================================================================

/// When the agent talks to the remote service.
///
/// ## Mode Selection
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                        Sync Mode Behavior                               │
/// │                                                                         │
/// │  PERIODIC (Default)                                                    │
/// │  • Background loop pushes dirty records every `interval_secs`          │
/// │  • On-demand and force sync also available                             │
/// │                                                                         │
/// │  MANUAL                                                                │
/// │  • No background loop                                                  │
/// │  • Sync only when the user asks (sync_all_pending_data / force_sync)   │
/// │                                                                         │
/// │  OFFLINE                                                               │
/// │  • Sync disabled, local writes only                                    │
/// │  • Records accumulate dirty until the mode changes                     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    #[default]
    Periodic,
    Manual,
    Offline,
}

impl SyncMode {
    /// Whether the background loop may run.
    pub fn runs_periodically(&self) -> bool {
        matches!(self, SyncMode::Periodic)
    }

    /// Returns true if sync is enabled at all.
    pub fn is_sync_enabled(&self) -> bool {
        !matches!(self, SyncMode::Offline)
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Periodic => write!(f, "periodic"),
            SyncMode::Manual => write!(f, "manual"),
            SyncMode::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "periodic" | "auto" => Ok(SyncMode::Periodic),
            "manual" | "on_demand" => Ok(SyncMode::Manual),
            "offline" | "disabled" => Ok(SyncMode::Offline),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown sync mode: '{}'. Valid options: periodic, manual, offline",
                other
            ))),
        }
    }
}

// =============================================================================
// Refresh Policy
// =============================================================================

/// How a refresh writes the server's listing into the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// The family's local rows become exactly the listed records.
    #[default]
    Replace,
    /// Listed records are upserted; local-only rows and rows still
    /// holding unsynced edits are kept.
    Merge,
}

impl std::fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshPolicy::Replace => write!(f, "replace"),
            RefreshPolicy::Merge => write!(f, "merge"),
        }
    }
}

// =============================================================================
// Account
// =============================================================================

/// Who this device syncs for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Family scope for refreshes.
    #[serde(default)]
    pub family_id: String,

    /// Member recorded on new ledger entries.
    #[serde(default)]
    pub member_id: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        AccountConfig {
            family_id: "default-family".to_string(),
            member_id: "default-member".to_string(),
        }
    }
}

// =============================================================================
// Remote Settings
// =============================================================================

/// Remote ledger service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Service root, e.g. `https://api.example.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Static bearer token. Token acquisition happens elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Upper bound for one request, connect to last body byte (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Page size for paged listings (ledger).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_page_size() -> u32 {
    100
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            base_url: default_base_url(),
            access_token: None,
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            page_size: default_page_size(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub mode: SyncMode,

    /// Pause between periodic cycles (seconds).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Records pushed at once within one worker.
    #[serde(default = "default_push_concurrency")]
    pub push_concurrency: usize,

    #[serde(default)]
    pub refresh_policy: RefreshPolicy,
}

fn default_interval() -> u64 {
    300
}
fn default_push_concurrency() -> usize {
    4
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            mode: SyncMode::default(),
            interval_secs: default_interval(),
            push_concurrency: default_push_concurrency(),
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Overrides the platform data directory location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub account: AccountConfig,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file as pretty TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.account.family_id.trim().is_empty() {
            return Err(SyncError::InvalidConfig("account.family_id is required".into()));
        }

        let url = url::Url::parse(&self.remote.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.remote.base_url
            )));
        }

        if self.sync.interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "interval_secs must be greater than 0".into(),
            ));
        }

        if self.sync.push_concurrency == 0 {
            return Err(SyncError::InvalidConfig(
                "push_concurrency must be greater than 0".into(),
            ));
        }

        if self.remote.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `FAMLEDGER_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("FAMLEDGER_FAMILY_ID") {
            debug!(family_id = %id, "Overriding family ID from environment");
            self.account.family_id = id;
        }

        if let Some(id) = lookup("FAMLEDGER_MEMBER_ID") {
            self.account.member_id = id;
        }

        if let Some(url) = lookup("FAMLEDGER_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.remote.base_url = url;
        }

        if let Some(token) = lookup("FAMLEDGER_ACCESS_TOKEN") {
            self.remote.access_token = Some(token);
        }

        if let Some(mode) = lookup("FAMLEDGER_SYNC_MODE") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding sync mode from environment");
                    self.sync.mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown sync mode in environment"),
            }
        }

        if let Some(secs) = lookup("FAMLEDGER_SYNC_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.sync.interval_secs = s,
                Err(_) => warn!(value = %secs, "Invalid sync interval in environment"),
            }
        }

        if let Some(path) = lookup("FAMLEDGER_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "famledger", "famledger")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Resolved database file: `[database] path` or the platform data dir.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().join("famledger.db"))
            .unwrap_or_else(|| PathBuf::from("famledger.db"))
    }

    pub fn family_id(&self) -> &str {
        &self.account.family_id
    }

    pub fn mode(&self) -> SyncMode {
        self.sync.mode
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.connect_timeout_secs)
    }
}
