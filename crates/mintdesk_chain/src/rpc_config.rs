use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use mintdesk_core::MintdeskConfig;

use crate::client::Commitment;

const EXPLORER_BASE: &str = "https://explorer.solana.com";
const LOCALNET_URL: &str = "http://127.0.0.1:8899";

/// Solana clusters with a well-known public endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    Devnet,
    Testnet,
    Mainnet,
    Localnet,
}

impl Cluster {
    /// Human-readable label for the cluster.
    pub fn label(&self) -> &'static str {
        match self {
            Cluster::Devnet => "Solana Devnet",
            Cluster::Testnet => "Solana Testnet",
            Cluster::Mainnet => "Solana Mainnet Beta",
            Cluster::Localnet => "Local Validator",
        }
    }

    /// Public JSON-RPC endpoint for the cluster.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::Mainnet => "https://api.mainnet-beta.solana.com",
            Cluster::Localnet => LOCALNET_URL,
        }
    }

    /// Query string the block explorer needs to show this cluster.
    fn explorer_query(&self) -> String {
        match self {
            Cluster::Devnet => "?cluster=devnet".into(),
            Cluster::Testnet => "?cluster=testnet".into(),
            Cluster::Mainnet => String::new(),
            Cluster::Localnet => format!("?cluster=custom&customUrl={LOCALNET_URL}"),
        }
    }

    /// Explorer page for a transaction signature.
    pub fn explorer_tx_url(&self, signature: &str) -> String {
        format!("{EXPLORER_BASE}/tx/{signature}{}", self.explorer_query())
    }

    /// Explorer page for an account address.
    pub fn explorer_address_url(&self, address: &str) -> String {
        format!("{EXPLORER_BASE}/address/{address}{}", self.explorer_query())
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Cluster::Mainnet),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            other => Err(format!("unknown cluster: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Connection settings for [`RpcBlockchainClient`](crate::rpc::RpcBlockchainClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    pub cluster: Cluster,
    pub url: String,
    pub is_custom: bool,
    pub commitment: Commitment,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

impl RpcConfig {
    /// Default endpoint and settings for a cluster.
    pub fn for_cluster(cluster: Cluster) -> Self {
        Self {
            cluster,
            url: cluster.default_rpc_url().to_string(),
            is_custom: false,
            commitment: Commitment::Confirmed,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Build from the application config, validating cluster, commitment and
    /// any custom URL.
    pub fn from_app_config(config: &MintdeskConfig) -> anyhow::Result<Self> {
        let cluster: Cluster = config
            .cluster
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("invalid `cluster` in config")?;
        let commitment: Commitment = config
            .commitment
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("invalid `commitment` in config")?;

        let mut rpc = Self::for_cluster(cluster);
        rpc.commitment = commitment;
        rpc.timeout_secs = config.rpc_timeout_secs.max(1);
        rpc.poll_interval_ms = config.confirm_poll_interval_ms.max(50);
        if let Some(url) = &config.rpc_url {
            rpc.set_custom_url(url.clone())?;
        }
        Ok(rpc)
    }

    /// Point at a custom endpoint. Returns `Err` if the URL fails validation.
    pub fn set_custom_url(&mut self, url: String) -> anyhow::Result<()> {
        if !validate_url(&url) {
            anyhow::bail!("invalid RPC URL: {url}");
        }
        self.url = url;
        self.is_custom = true;
        Ok(())
    }

    /// Reset back to the cluster's public endpoint.
    pub fn reset_to_default(&mut self) {
        self.url = self.cluster.default_rpc_url().to_string();
        self.is_custom = false;
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::for_cluster(Cluster::Devnet)
    }
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}
