//! SPL Token instruction builders and amount helpers.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use spl_token::solana_program::program_pack::Pack;

use crate::error::ChainError;

/// Size in bytes of an SPL Token mint account.
pub const MINT_ACCOUNT_LEN: usize = spl_token::state::Mint::LEN;

/// Scale a whole-token quantity into base units. `None` on overflow.
pub fn to_base_units(whole_tokens: u64, decimals: u8) -> Option<u64> {
    10u64
        .checked_pow(u32::from(decimals))?
        .checked_mul(whole_tokens)
}

/// Convert base units back into a display amount.
pub fn to_ui_amount(base_units: u64, decimals: u8) -> f64 {
    base_units as f64 / 10f64.powi(i32::from(decimals))
}

/// Associated token account of `owner` for `mint`. Pure derivation.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(owner, mint)
}

// ---------------------------------------------------------------------------
// PendingInstructionSet
// ---------------------------------------------------------------------------

/// Ordered instructions composed for a single submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingInstructionSet {
    instructions: Vec<Instruction>,
}

impl PendingInstructionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Insert ahead of everything composed so far.
    pub fn prepend(&mut self, instruction: Instruction) {
        self.instructions.insert(0, instruction);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Unsigned transaction with `payer` as fee payer. The blockhash is
    /// attached at signing time.
    pub fn into_transaction(self, payer: &Pubkey) -> Transaction {
        Transaction::new_with_payer(&self.instructions, Some(payer))
    }
}

impl From<Vec<Instruction>> for PendingInstructionSet {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// The two instructions that allocate and initialize a new mint: a system
/// `create_account` owned by the token program, then `initialize_mint` with
/// `authority` as both mint and freeze authority.
pub fn create_mint_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    rent_lamports: u64,
    decimals: u8,
    authority: &Pubkey,
) -> Result<PendingInstructionSet, ChainError> {
    let mut pending = PendingInstructionSet::new();
    pending.push(system_instruction::create_account(
        payer,
        mint,
        rent_lamports,
        MINT_ACCOUNT_LEN as u64,
        &spl_token::id(),
    ));
    pending.push(
        spl_token::instruction::initialize_mint(
            &spl_token::id(),
            mint,
            authority,
            Some(authority),
            decimals,
        )
        .map_err(|e| ChainError::Instruction(e.to_string()))?,
    );
    Ok(pending)
}

/// Create `owner`'s associated token account for `mint`, funded by `payer`.
pub fn create_associated_account(payer: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
    spl_associated_token_account::instruction::create_associated_token_account(
        payer,
        owner,
        mint,
        &spl_token::id(),
    )
}

pub fn mint_to(
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Result<Instruction, ChainError> {
    spl_token::instruction::mint_to(&spl_token::id(), mint, destination, authority, &[], amount)
        .map_err(|e| ChainError::Instruction(e.to_string()))
}

pub fn transfer(
    source: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Result<Instruction, ChainError> {
    spl_token::instruction::transfer(&spl_token::id(), source, destination, authority, &[], amount)
        .map_err(|e| ChainError::Instruction(e.to_string()))
}

/// Data-less instruction to `program_id` with one writable account.
pub fn ping(program_id: &Pubkey, data_account: &Pubkey) -> Instruction {
    Instruction::new_with_bytes(*program_id, &[], vec![AccountMeta::new(*data_account, false)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use spl_token::instruction::TokenInstruction;

    #[test]
    fn base_units_scale_by_decimals() {
        assert_eq!(to_base_units(1000, 6), Some(1_000_000_000));
        assert_eq!(to_base_units(100, 6), Some(100_000_000));
        assert_eq!(to_base_units(7, 0), Some(7));
        assert_eq!(to_base_units(u64::MAX, 1), None);
        assert_eq!(to_base_units(1, 20), None);
    }

    #[test]
    fn ui_amount_divides_by_decimals() {
        assert_eq!(to_ui_amount(900_000_000, 6), 900.0);
        assert_eq!(to_ui_amount(1, 2), 0.01);
    }

    #[test]
    fn create_mint_is_two_instructions() {
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let pending = create_mint_instructions(&payer, &mint, 1_461_600, 6, &payer).unwrap();

        assert_eq!(pending.len(), 2);
        let [create, init] = pending.instructions() else {
            panic!("expected two instructions");
        };
        assert_eq!(create.program_id, solana_sdk::system_program::id());
        assert_eq!(init.program_id, spl_token::id());

        match TokenInstruction::unpack(&init.data).unwrap() {
            TokenInstruction::InitializeMint {
                decimals,
                mint_authority,
                freeze_authority,
            } => {
                assert_eq!(decimals, 6);
                assert_eq!(mint_authority, payer);
                assert_eq!(Option::<Pubkey>::from(freeze_authority), Some(payer));
            }
            other => panic!("unexpected instruction: {other:?}"),
        }
    }

    #[test]
    fn associated_address_is_deterministic() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        assert_eq!(
            associated_token_address(&owner, &mint),
            associated_token_address(&owner, &mint)
        );
        assert_ne!(
            associated_token_address(&owner, &mint),
            associated_token_address(&Pubkey::new_unique(), &mint)
        );
    }

    #[test]
    fn prepend_goes_first() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ata = associated_token_address(&owner, &mint);

        let mut pending = PendingInstructionSet::new();
        pending.push(mint_to(&mint, &ata, &owner, 10).unwrap());
        pending.prepend(create_associated_account(&owner, &owner, &mint));

        assert_eq!(pending.instructions()[0].program_id, spl_associated_token_account::id());
        assert_eq!(pending.instructions()[1].program_id, spl_token::id());

        let tx = pending.into_transaction(&owner);
        assert_eq!(tx.message.account_keys[0], owner);
        assert_eq!(tx.message.instructions.len(), 2);
    }

    #[test]
    fn transfer_encodes_amount() {
        let ix = transfer(&Pubkey::new_unique(), &Pubkey::new_unique(), &Pubkey::new_unique(), 42)
            .unwrap();
        assert!(matches!(
            TokenInstruction::unpack(&ix.data).unwrap(),
            TokenInstruction::Transfer { amount: 42 }
        ));
    }

    #[test]
    fn ping_has_one_writable_account() {
        let program = Pubkey::new_unique();
        let data = Pubkey::new_unique();
        let ix = ping(&program, &data);
        assert_eq!(ix.program_id, program);
        assert!(ix.data.is_empty());
        assert_eq!(ix.accounts.len(), 1);
        assert!(ix.accounts[0].is_writable);
        assert!(!ix.accounts[0].is_signer);
    }
}
