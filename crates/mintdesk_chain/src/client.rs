//! The narrow cluster interface the token workflow depends on.
//!
//! [`RpcBlockchainClient`](crate::rpc::RpcBlockchainClient) is the production
//! implementation; tests substitute in-memory mocks.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::Transaction;

use crate::error::ChainError;

/// Program name the cluster's JSON parser assigns to SPL Token instructions.
pub const SPL_TOKEN_PROGRAM_NAME: &str = "spl-token";

// ---------------------------------------------------------------------------
// Commitment & confirmation status
// ---------------------------------------------------------------------------

/// Ledger guarantee level requested when reading or confirming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    /// Whether a transaction observed at `status` meets this commitment.
    pub fn is_satisfied_by(&self, status: ConfirmationStatus) -> bool {
        status.level() >= *self
    }
}

impl Default for Commitment {
    fn default() -> Self {
        Commitment::Confirmed
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(format!("unknown commitment level: {other}")),
        }
    }
}

/// Confirmation status reported for a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    Processed,
    Confirmed,
    Finalized,
}

impl ConfirmationStatus {
    fn level(self) -> Commitment {
        match self {
            ConfirmationStatus::Processed => Commitment::Processed,
            ConfirmationStatus::Confirmed => Commitment::Confirmed,
            ConfirmationStatus::Finalized => Commitment::Finalized,
        }
    }

    pub fn label(&self) -> &'static str {
        self.level().as_str()
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

/// The subset of an on-chain account the workflow needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data_len: usize,
    pub executable: bool,
}

/// One token account returned by a parsed owner/mint query.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenAccountBalance {
    pub address: Pubkey,
    pub mint: Pubkey,
    /// Raw amount in base units.
    pub amount: u64,
    pub decimals: u8,
    /// Human-readable amount. The cluster reports `null` when it cannot be
    /// represented as a float.
    pub ui_amount: Option<f64>,
}

/// One entry of a signatures-for-address listing.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureInfo {
    pub signature: Signature,
    pub slot: u64,
    pub confirmation_status: Option<ConfirmationStatus>,
    /// Unix timestamp, when the cluster knows it.
    pub block_time: Option<i64>,
    pub failed: bool,
}

/// A decoded (or undecodable) top-level instruction of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSummary {
    /// Parser name, e.g. `spl-token`. `None` when the cluster could not
    /// decode the instruction.
    pub program: Option<String>,
    pub program_id: String,
    /// Decoded instruction type, e.g. `mintTo`.
    pub instruction_type: Option<String>,
}

impl InstructionSummary {
    pub fn decoded(
        program: impl Into<String>,
        program_id: impl Into<String>,
        instruction_type: impl Into<String>,
    ) -> Self {
        Self {
            program: Some(program.into()),
            program_id: program_id.into(),
            instruction_type: Some(instruction_type.into()),
        }
    }

    pub fn undecoded(program_id: impl Into<String>) -> Self {
        Self {
            program: None,
            program_id: program_id.into(),
            instruction_type: None,
        }
    }

    pub fn is_decoded(&self) -> bool {
        self.instruction_type.is_some()
    }
}

/// A confirmed transaction reduced to its top-level instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTransaction {
    pub slot: u64,
    pub block_time: Option<i64>,
    pub instructions: Vec<InstructionSummary>,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Cluster capabilities used by the token workflow.
#[async_trait]
pub trait BlockchainClient: Send + Sync {
    /// Attach a recent blockhash, sign with `signers`, and submit.
    async fn submit_transaction(
        &self,
        transaction: Transaction,
        signers: &[&Keypair],
    ) -> Result<Signature, ChainError>;

    /// Resolve once `signature` reaches `commitment`. Fails if the
    /// transaction landed with an error. Does not time out on its own.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<(), ChainError>;

    /// Lamports needed for an account of `data_len` bytes to be rent exempt.
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, ChainError>;

    /// `None` when no account exists at `address`.
    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>, ChainError>;

    /// Token accounts held by `owner` for `mint`.
    async fn parsed_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Vec<TokenAccountBalance>, ChainError>;

    /// Most recent signatures involving `address`, newest first.
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, ChainError>;

    /// `None` when the cluster has no record of `signature`.
    async fn parsed_transaction(
        &self,
        signature: &Signature,
        max_supported_version: u8,
    ) -> Result<Option<ParsedTransaction>, ChainError>;
}
