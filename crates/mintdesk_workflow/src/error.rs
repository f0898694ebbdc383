use std::time::Duration;

use mintdesk_chain::ChainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a token workflow operation.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Mint address not available. Create token first.")]
    MintNotCreated,

    #[error("Invalid recipient address {input:?}: {reason}")]
    InvalidRecipient { input: String, reason: String },

    #[error(transparent)]
    Network(#[from] ChainError),

    #[error("Transaction {signature} was not confirmed within {}s", .waited.as_secs())]
    ConfirmationTimeout { signature: String, waited: Duration },
}

/// Broad classification of a [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A required input (wallet or mint) is missing. Nothing was sent.
    Precondition,
    /// User input could not be parsed. Nothing was sent.
    Parse,
    /// The cluster or transport reported an error.
    Network,
    /// The transaction was submitted but confirmation did not arrive in time.
    ConfirmationTimeout,
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WalletNotConnected | Self::MintNotCreated => ErrorKind::Precondition,
            Self::InvalidRecipient { .. } => ErrorKind::Parse,
            Self::Network(_) => ErrorKind::Network,
            Self::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
        }
    }

    /// Short text suitable for a notification body.
    pub fn user_message(&self) -> String {
        match self {
            Self::WalletNotConnected | Self::MintNotCreated => self.to_string(),
            Self::InvalidRecipient { input, .. } => {
                format!("Invalid recipient address: {}", input.trim())
            }
            Self::Network(ChainError::WalletNotConnected) => "Wallet not connected".into(),
            Self::Network(ChainError::TransactionFailed { reason, .. }) => {
                format!("Transaction failed on-chain: {reason}")
            }
            Self::Network(err) => err.to_string(),
            Self::ConfirmationTimeout { signature, .. } => {
                format!("Transaction {signature} is still unconfirmed. Check the explorer.")
            }
        }
    }
}
