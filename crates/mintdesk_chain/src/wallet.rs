use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, read_keypair_file};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use tracing::info;

use crate::client::BlockchainClient;
use crate::error::ChainError;

/// The connected account that pays for and signs workflow transactions.
#[async_trait]
pub trait SigningWallet: Send + Sync {
    /// `None` while disconnected.
    fn public_key(&self) -> Option<Pubkey>;

    fn is_connected(&self) -> bool {
        self.public_key().is_some()
    }

    /// Sign `transaction` as fee payer, co-signing with `extra_signers`, and
    /// submit it through `client`.
    async fn send_transaction(
        &self,
        transaction: Transaction,
        client: &dyn BlockchainClient,
        extra_signers: &[&Keypair],
    ) -> Result<Signature, ChainError>;
}

// ---------------------------------------------------------------------------
// KeypairWallet
// ---------------------------------------------------------------------------

/// Wallet backed by a local keypair.
pub struct KeypairWallet {
    keypair: Option<Keypair>,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Some(keypair),
        }
    }

    pub fn disconnected() -> Self {
        Self { keypair: None }
    }

    /// Load a keypair file in the Solana CLI JSON format.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let keypair = read_keypair_file(path)
            .map_err(|e| anyhow::anyhow!("failed to read keypair {}: {e}", path.display()))?;
        info!(pubkey = %keypair.pubkey(), "wallet loaded from keypair file");
        Ok(Self::new(keypair))
    }
}

impl fmt::Debug for KeypairWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypairWallet")
            .field("pubkey", &self.public_key())
            .finish()
    }
}

#[async_trait]
impl SigningWallet for KeypairWallet {
    fn public_key(&self) -> Option<Pubkey> {
        self.keypair.as_ref().map(Signer::pubkey)
    }

    async fn send_transaction(
        &self,
        transaction: Transaction,
        client: &dyn BlockchainClient,
        extra_signers: &[&Keypair],
    ) -> Result<Signature, ChainError> {
        let keypair = self.keypair.as_ref().ok_or(ChainError::WalletNotConnected)?;
        let mut signers = Vec::with_capacity(extra_signers.len() + 1);
        signers.push(keypair);
        signers.extend_from_slice(extra_signers);
        client.submit_transaction(transaction, &signers).await
    }
}
