use std::fmt;

use chrono::{DateTime, Utc};
use mintdesk_chain::{ConfirmationStatus, InstructionSummary, Pubkey, Signature};

/// A mint created during this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRecord {
    pub address: Pubkey,
    pub decimals: u8,
    /// Signature of the create-mint transaction.
    pub signature: Signature,
}

/// The caller's balance for a mint, in display units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceView {
    pub amount: f64,
    pub decimals: u8,
}

impl BalanceView {
    pub fn zero(decimals: u8) -> Self {
        Self {
            amount: 0.0,
            decimals,
        }
    }
}

impl fmt::Display for BalanceView {
    /// Always renders exactly `decimals` fractional digits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", usize::from(self.decimals), self.amount)
    }
}

/// One recent transaction touching the caller's account.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub signature: Signature,
    pub status: Option<ConfirmationStatus>,
    pub block_time: Option<DateTime<Utc>>,
    pub instructions: Vec<InstructionSummary>,
}
