pub mod activity;
pub mod error;
pub mod types;
pub mod workflow;

use std::sync::Arc;

use anyhow::Context;
use mintdesk_chain::{KeypairWallet, RpcBlockchainClient, RpcConfig, SigningWallet};
use mintdesk_core::MintdeskConfig;
use tracing::{info, warn};

pub use error::{ErrorKind, WorkflowError};
pub use types::{ActivityRecord, BalanceView, MintRecord};
pub use workflow::{TokenWorkflow, WorkflowSettings};

/// Build a [`TokenWorkflow`] against the configured cluster. The wallet is
/// loaded from `keypair_path`, or left disconnected when none is set.
///
/// Install logging first so connection and operation events are recorded,
/// and keep the guard alive for the whole session:
///
/// ```no_run
/// use mintdesk_core::MintdeskConfig;
/// use mintdesk_core::logging::init_logging;
///
/// # fn main() -> anyhow::Result<()> {
/// let config = MintdeskConfig::load()?;
/// let _log_guard = init_logging(&config)?;
/// let workflow = mintdesk_workflow::connect(&config)?;
/// println!("wallet connected: {}", workflow.wallet_connected());
/// # Ok(())
/// # }
/// ```
pub fn connect(config: &MintdeskConfig) -> anyhow::Result<TokenWorkflow> {
    let rpc = RpcConfig::from_app_config(config)?;
    info!(cluster = %rpc.cluster, url = %rpc.url, "connecting to cluster");
    let client = RpcBlockchainClient::new(rpc).context("failed to build RPC client")?;

    let wallet: Arc<dyn SigningWallet> = match &config.keypair_path {
        Some(path) => Arc::new(KeypairWallet::from_file(path)?),
        None => {
            warn!("no keypair configured; wallet is disconnected");
            Arc::new(KeypairWallet::disconnected())
        }
    };

    let settings = WorkflowSettings::from_config(config)?;
    Ok(TokenWorkflow::new(Arc::new(client), wallet).with_settings(settings))
}
