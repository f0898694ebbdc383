use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable overriding [`MintdeskConfig::rpc_url`].
pub const ENV_RPC_URL: &str = "MINTDESK_RPC_URL";
/// Environment variable overriding [`MintdeskConfig::keypair_path`].
pub const ENV_KEYPAIR: &str = "MINTDESK_KEYPAIR";
/// Environment variable overriding [`MintdeskConfig::cluster`].
pub const ENV_CLUSTER: &str = "MINTDESK_CLUSTER";

/// Devnet counter program targeted by the ping action.
pub const DEFAULT_PING_PROGRAM_ID: &str = "ChT1B39WKLS8qUrkLvFDXMhEJ4F1XZzwUNHUt4AU9aVa";
/// Data account the ping program increments.
pub const DEFAULT_PING_DATA_ACCOUNT: &str = "Ah9K7dQ8EHaZqcAsgBW8w37yN2eAy3koFmUn4x3CJtod";

// ---------------------------------------------------------------------------
// MintdeskConfig
// ---------------------------------------------------------------------------

/// Application configuration stored at `~/.mintdesk/config.json`.
///
/// Only connection settings live here. Session state (the created mint,
/// balances, activity) is never written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MintdeskConfig {
    // Network
    pub cluster: String,
    pub rpc_url: Option<String>,
    pub commitment: String,
    pub rpc_timeout_secs: u64,
    pub confirm_timeout_secs: u64,
    pub confirm_poll_interval_ms: u64,

    // Wallet
    pub keypair_path: Option<PathBuf>,

    // Ping program
    pub ping_program_id: String,
    pub ping_data_account: String,

    // General
    pub log_level: String,
}

impl Default for MintdeskConfig {
    fn default() -> Self {
        Self {
            cluster: "devnet".into(),
            rpc_url: None,
            commitment: "confirmed".into(),
            rpc_timeout_secs: 30,
            confirm_timeout_secs: 60,
            confirm_poll_interval_ms: 500,
            keypair_path: None,
            ping_program_id: DEFAULT_PING_PROGRAM_ID.into(),
            ping_data_account: DEFAULT_PING_DATA_ACCOUNT.into(),
            log_level: "info".into(),
        }
    }
}

impl MintdeskConfig {
    /// Returns the base config directory: `~/.mintdesk/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".mintdesk"))
    }

    /// Returns the config file path: `~/.mintdesk/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.mintdesk/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Ensures all required directories exist.
    pub fn ensure_dirs() -> Result<()> {
        for dir in [Self::base_dir()?, Self::logs_dir()?] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Loads config from disk (creating the default file if missing), then
    /// applies environment overrides.
    pub fn load() -> Result<Self> {
        Self::ensure_dirs()?;
        let path = Self::config_path()?;
        let mut config = Self::load_from_path(&path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Saves config to `~/.mintdesk/config.json`.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to_path(&path)
    }

    /// Save config to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Apply `MINTDESK_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_RPC_URL) {
            info!(url = %url, "RPC URL overridden from environment");
            self.rpc_url = Some(url);
        }
        if let Some(path) = get(ENV_KEYPAIR) {
            self.keypair_path = Some(PathBuf::from(path));
        }
        if let Some(cluster) = get(ENV_CLUSTER) {
            self.cluster = cluster.trim().to_lowercase();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
