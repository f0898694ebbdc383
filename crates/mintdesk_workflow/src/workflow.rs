//! The token-operations workflow.
//!
//! Each operation runs its steps strictly in order against the injected
//! [`BlockchainClient`] and [`SigningWallet`]. Preconditions (connected
//! wallet, known mint, parseable recipient) are checked before the first
//! network call. Nothing is retried.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use mintdesk_chain::token::{self, MINT_ACCOUNT_LEN, PendingInstructionSet};
use mintdesk_chain::{
    BlockchainClient, ChainError, Cluster, Commitment, Keypair, Pubkey, Signature, SigningWallet,
};
use mintdesk_core::MintdeskConfig;
use solana_sdk::pubkey;
use solana_sdk::signer::Signer;
use tracing::{debug, info, warn};

use crate::activity::has_token_activity;
use crate::error::WorkflowError;
use crate::types::{ActivityRecord, BalanceView, MintRecord};

const DEFAULT_PING_PROGRAM: Pubkey = pubkey!("ChT1B39WKLS8qUrkLvFDXMhEJ4F1XZzwUNHUt4AU9aVa");
const DEFAULT_PING_DATA_ACCOUNT: Pubkey = pubkey!("Ah9K7dQ8EHaZqcAsgBW8w37yN2eAy3koFmUn4x3CJtod");

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Fixed quantities and limits the operations use.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    pub cluster: Cluster,
    /// Decimals for newly created mints.
    pub decimals: u8,
    /// Whole tokens minted by `mint_to_owner`.
    pub mint_amount: u64,
    /// Whole tokens sent by `transfer_tokens`.
    pub transfer_amount: u64,
    /// Signatures fetched by `list_recent_token_activity`.
    pub activity_limit: usize,
    pub commitment: Commitment,
    pub confirm_timeout: Duration,
    pub max_supported_transaction_version: u8,
    pub ping_program_id: Pubkey,
    pub ping_data_account: Pubkey,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            cluster: Cluster::Devnet,
            decimals: 6,
            mint_amount: 1000,
            transfer_amount: 100,
            activity_limit: 10,
            commitment: Commitment::Confirmed,
            confirm_timeout: Duration::from_secs(60),
            max_supported_transaction_version: 0,
            ping_program_id: DEFAULT_PING_PROGRAM,
            ping_data_account: DEFAULT_PING_DATA_ACCOUNT,
        }
    }
}

impl WorkflowSettings {
    pub fn from_config(config: &MintdeskConfig) -> anyhow::Result<Self> {
        let cluster = config
            .cluster
            .parse::<Cluster>()
            .map_err(|e| anyhow::anyhow!(e))
            .context("invalid `cluster` in config")?;
        let commitment = config
            .commitment
            .parse::<Commitment>()
            .map_err(|e| anyhow::anyhow!(e))
            .context("invalid `commitment` in config")?;
        let ping_program_id = Pubkey::from_str(&config.ping_program_id)
            .context("invalid `ping_program_id` in config")?;
        let ping_data_account = Pubkey::from_str(&config.ping_data_account)
            .context("invalid `ping_data_account` in config")?;

        Ok(Self {
            cluster,
            commitment,
            confirm_timeout: Duration::from_secs(config.confirm_timeout_secs.max(1)),
            ping_program_id,
            ping_data_account,
            ..Self::default()
        })
    }
}

// ---------------------------------------------------------------------------
// TokenWorkflow
// ---------------------------------------------------------------------------

pub struct TokenWorkflow {
    client: Arc<dyn BlockchainClient>,
    wallet: Arc<dyn SigningWallet>,
    settings: WorkflowSettings,
}

impl TokenWorkflow {
    pub fn new(client: Arc<dyn BlockchainClient>, wallet: Arc<dyn SigningWallet>) -> Self {
        Self {
            client,
            wallet,
            settings: WorkflowSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn wallet_connected(&self) -> bool {
        self.wallet.is_connected()
    }

    pub fn explorer_tx_url(&self, signature: &Signature) -> String {
        self.settings.cluster.explorer_tx_url(&signature.to_string())
    }

    fn owner(&self) -> Result<Pubkey, WorkflowError> {
        self.wallet.public_key().ok_or(WorkflowError::WalletNotConnected)
    }

    fn base_units(&self, whole_tokens: u64, decimals: u8) -> Result<u64, WorkflowError> {
        token::to_base_units(whole_tokens, decimals).ok_or_else(|| {
            ChainError::Instruction(format!(
                "{whole_tokens} tokens at {decimals} decimals overflows u64"
            ))
            .into()
        })
    }

    // -- CreateMint ---------------------------------------------------------

    /// Allocate and initialize a fresh mint with the caller as mint and
    /// freeze authority.
    pub async fn create_mint(&self) -> Result<MintRecord, WorkflowError> {
        let owner = self.owner()?;
        let decimals = self.settings.decimals;
        let mint = Keypair::new();
        debug!(mint = %mint.pubkey(), decimals, "creating mint");

        let rent = self
            .client
            .minimum_balance_for_rent_exemption(MINT_ACCOUNT_LEN)
            .await?;
        let pending =
            token::create_mint_instructions(&owner, &mint.pubkey(), rent, decimals, &owner)?;
        let signature = self.submit_and_confirm(pending, &owner, &[&mint]).await?;

        info!(mint = %mint.pubkey(), %signature, "mint created");
        Ok(MintRecord {
            address: mint.pubkey(),
            decimals,
            signature,
        })
    }

    // -- MintToOwner --------------------------------------------------------

    /// Mint the configured supply into the caller's associated token
    /// account, creating the account first when needed.
    pub async fn mint_to_owner(&self, mint: Option<&MintRecord>) -> Result<Signature, WorkflowError> {
        let owner = self.owner()?;
        let mint = mint.ok_or(WorkflowError::MintNotCreated)?;
        let amount = self.base_units(self.settings.mint_amount, mint.decimals)?;

        let mut pending = PendingInstructionSet::new();
        let destination = self
            .ensure_token_account(&mut pending, &owner, &owner, &mint.address)
            .await?;
        pending.push(token::mint_to(&mint.address, &destination, &owner, amount)?);

        let signature = self.submit_and_confirm(pending, &owner, &[]).await?;
        info!(mint = %mint.address, amount, %signature, "minted to owner");
        Ok(signature)
    }

    // -- TransferTokens -----------------------------------------------------

    /// Send the configured amount to `recipient`, creating the recipient's
    /// associated token account when needed.
    pub async fn transfer_tokens(
        &self,
        mint: Option<&MintRecord>,
        recipient: &str,
    ) -> Result<Signature, WorkflowError> {
        let owner = self.owner()?;
        let mint = mint.ok_or(WorkflowError::MintNotCreated)?;
        let recipient = parse_recipient(recipient)?;
        let amount = self.base_units(self.settings.transfer_amount, mint.decimals)?;

        let source = token::associated_token_address(&owner, &mint.address);
        let mut pending = PendingInstructionSet::new();
        let destination = self
            .ensure_token_account(&mut pending, &owner, &recipient, &mint.address)
            .await?;
        pending.push(token::transfer(&source, &destination, &owner, amount)?);

        let signature = self.submit_and_confirm(pending, &owner, &[]).await?;
        info!(mint = %mint.address, %recipient, amount, %signature, "tokens transferred");
        Ok(signature)
    }

    // -- QueryBalance -------------------------------------------------------

    /// The caller's balance for `mint`. Zero when no token account exists.
    pub async fn query_balance(&self, mint: Option<&MintRecord>) -> Result<BalanceView, WorkflowError> {
        let owner = self.owner()?;
        let mint = mint.ok_or(WorkflowError::MintNotCreated)?;

        let accounts = self
            .client
            .parsed_token_accounts_by_owner(&owner, &mint.address)
            .await?;
        let Some(account) = accounts.first() else {
            debug!(mint = %mint.address, "no token account; balance is zero");
            return Ok(BalanceView::zero(mint.decimals));
        };

        Ok(BalanceView {
            amount: account.ui_amount.unwrap_or(0.0),
            decimals: account.decimals,
        })
    }

    // -- ListRecentTokenActivity --------------------------------------------

    /// Recent transactions of the caller that mint or transfer SPL tokens,
    /// newest first.
    pub async fn list_recent_token_activity(&self) -> Result<Vec<ActivityRecord>, WorkflowError> {
        let owner = self.owner()?;
        let version = self.settings.max_supported_transaction_version;

        let signatures = self
            .client
            .signatures_for_address(&owner, self.settings.activity_limit)
            .await?;
        debug!(count = signatures.len(), "fetching recent transactions");

        let client = self.client.as_ref();
        let transactions = try_join_all(
            signatures
                .iter()
                .map(|info| client.parsed_transaction(&info.signature, version)),
        )
        .await?;

        let records: Vec<ActivityRecord> = signatures
            .into_iter()
            .zip(transactions)
            .map(|(info, tx)| {
                let block_time = info.block_time.or(tx.as_ref().and_then(|t| t.block_time));
                ActivityRecord {
                    signature: info.signature,
                    status: info.confirmation_status,
                    block_time: block_time.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
                    instructions: tx.map(|t| t.instructions).unwrap_or_default(),
                }
            })
            .filter(has_token_activity)
            .collect();

        info!(matched = records.len(), "token activity fetched");
        Ok(records)
    }

    // -- Ping ---------------------------------------------------------------

    /// Send one data-less instruction to the ping program. Returns once the
    /// cluster accepts the transaction; confirmation is not awaited.
    pub async fn ping(&self) -> Result<Signature, WorkflowError> {
        let owner = self.owner()?;
        let mut pending = PendingInstructionSet::new();
        pending.push(token::ping(
            &self.settings.ping_program_id,
            &self.settings.ping_data_account,
        ));

        let tx = pending.into_transaction(&owner);
        let signature = self
            .wallet
            .send_transaction(tx, self.client.as_ref(), &[])
            .await?;
        info!(%signature, url = %self.explorer_tx_url(&signature), "ping sent");
        Ok(signature)
    }

    // -- Helpers ------------------------------------------------------------

    /// Derive `owner`'s associated account for `mint` and prepend its
    /// creation to `pending` when it does not exist yet.
    async fn ensure_token_account(
        &self,
        pending: &mut PendingInstructionSet,
        payer: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Pubkey, WorkflowError> {
        let address = token::associated_token_address(owner, mint);
        if self.client.get_account_info(&address).await?.is_none() {
            debug!(%owner, %address, "token account missing; creating");
            pending.prepend(token::create_associated_account(payer, owner, mint));
        }
        Ok(address)
    }

    async fn submit_and_confirm(
        &self,
        pending: PendingInstructionSet,
        payer: &Pubkey,
        extra_signers: &[&Keypair],
    ) -> Result<Signature, WorkflowError> {
        debug!(instructions = pending.len(), "submitting transaction");
        let tx = pending.into_transaction(payer);
        let signature = self
            .wallet
            .send_transaction(tx, self.client.as_ref(), extra_signers)
            .await?;

        let waited = self.settings.confirm_timeout;
        let confirm = self
            .client
            .confirm_transaction(&signature, self.settings.commitment);
        match tokio::time::timeout(waited, confirm).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(%signature, ?waited, "confirmation timed out");
                return Err(WorkflowError::ConfirmationTimeout {
                    signature: signature.to_string(),
                    waited,
                });
            }
        }
        Ok(signature)
    }
}

fn parse_recipient(input: &str) -> Result<Pubkey, WorkflowError> {
    Pubkey::from_str(input.trim()).map_err(|e| WorkflowError::InvalidRecipient {
        input: input.to_string(),
        reason: e.to_string(),
    })
}
