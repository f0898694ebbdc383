pub mod client;
pub mod error;
pub mod rpc;
pub mod rpc_config;
pub mod token;
pub mod wallet;

pub use client::{
    AccountInfo, BlockchainClient, Commitment, ConfirmationStatus, InstructionSummary,
    ParsedTransaction, SPL_TOKEN_PROGRAM_NAME, SignatureInfo, TokenAccountBalance,
};
pub use error::ChainError;
pub use rpc::RpcBlockchainClient;
pub use rpc_config::{Cluster, RpcConfig};
pub use token::PendingInstructionSet;
pub use wallet::{KeypairWallet, SigningWallet};

pub use solana_sdk::pubkey::Pubkey;
pub use solana_sdk::signature::{Keypair, Signature};
