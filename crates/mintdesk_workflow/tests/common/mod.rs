//! In-memory ledger used by the workflow integration tests.
//!
//! `LedgerSim` implements `BlockchainClient` by interpreting the system,
//! associated-token-account and SPL Token instructions the workflow emits.
//! Failed transactions leave the ledger untouched.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mintdesk_chain::{
    AccountInfo, BlockchainClient, ChainError, Commitment, ConfirmationStatus, InstructionSummary,
    KeypairWallet, ParsedTransaction, SignatureInfo, TokenAccountBalance,
};
use mintdesk_workflow::TokenWorkflow;
use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::system_instruction::SystemInstruction;
use solana_sdk::transaction::Transaction;
use spl_token::instruction::TokenInstruction;

pub const RENT_FOR_MINT: u64 = 1_461_600;
const BASE_BLOCK_TIME: i64 = 1_700_000_000;

#[derive(Debug, Clone)]
struct RawAccount {
    lamports: u64,
    owner: Pubkey,
    space: u64,
}

#[derive(Debug, Clone)]
struct MintState {
    decimals: u8,
    authority: Pubkey,
}

#[derive(Debug, Clone)]
struct TokenAccountState {
    owner: Pubkey,
    mint: Pubkey,
    amount: u64,
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    signature: Signature,
    keys: Vec<Pubkey>,
    tx: ParsedTransaction,
    /// Listed by signature but no longer retrievable.
    pruned: bool,
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    accounts: HashMap<Pubkey, RawAccount>,
    mints: HashMap<Pubkey, MintState>,
    token_accounts: HashMap<Pubkey, TokenAccountState>,
}

#[derive(Default)]
struct SimState {
    ledger: Ledger,
    /// Oldest first.
    history: Vec<HistoryEntry>,
    calls: Vec<String>,
    submitted: Vec<Transaction>,
    next_slot: u64,
    hang_confirmations: bool,
    fail_transaction_fetch: bool,
}

#[derive(Default)]
pub struct LedgerSim {
    state: Mutex<SimState>,
}

impl LedgerSim {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every `BlockchainClient` method invoked so far, by name.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn submitted(&self) -> Vec<Transaction> {
        self.state.lock().submitted.clone()
    }

    pub fn last_submitted(&self) -> Option<Transaction> {
        self.state.lock().submitted.last().cloned()
    }

    /// Confirmation futures never resolve.
    pub fn hang_confirmations(&self) {
        self.state.lock().hang_confirmations = true;
    }

    /// `parsed_transaction` fails with a transport error.
    pub fn fail_transaction_fetch(&self) {
        self.state.lock().fail_transaction_fetch = true;
    }

    /// Raw token balance of `owner`'s accounts for `mint`.
    pub fn token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> u64 {
        self.state
            .lock()
            .ledger
            .token_accounts
            .values()
            .filter(|a| a.owner == *owner && a.mint == *mint)
            .map(|a| a.amount)
            .sum()
    }

    pub fn mint_decimals(&self, mint: &Pubkey) -> Option<u8> {
        self.state.lock().ledger.mints.get(mint).map(|m| m.decimals)
    }

    /// Record a historical transaction involving `keys` without touching
    /// the ledger.
    pub fn seed_history(&self, keys: &[Pubkey], instructions: Vec<InstructionSummary>) -> Signature {
        let mut state = self.state.lock();
        let slot = state.bump_slot();
        let signature = signature_for_slot(slot);
        state.history.push(HistoryEntry {
            signature,
            keys: keys.to_vec(),
            tx: ParsedTransaction {
                slot,
                block_time: Some(BASE_BLOCK_TIME + slot as i64),
                instructions,
            },
            pruned: false,
        });
        signature
    }

    /// Seed a transaction whose record the cluster has since dropped.
    pub fn seed_pruned_history(&self, keys: &[Pubkey]) -> Signature {
        let signature = self.seed_history(keys, Vec::new());
        let mut state = self.state.lock();
        if let Some(entry) = state.history.last_mut() {
            entry.pruned = true;
        }
        signature
    }
}

impl SimState {
    fn bump_slot(&mut self) -> u64 {
        self.next_slot += 1;
        self.next_slot
    }

    fn record(&mut self, method: &str) {
        self.calls.push(method.to_string());
    }
}

fn signature_for_slot(slot: u64) -> Signature {
    let mut bytes = [7u8; 64];
    bytes[..8].copy_from_slice(&slot.to_le_bytes());
    Signature::from(bytes)
}

fn sim_failure(message: impl Into<String>) -> ChainError {
    ChainError::Rpc {
        code: -32002,
        message: format!("Transaction simulation failed: {}", message.into()),
    }
}

// ---------------------------------------------------------------------------
// Instruction interpreter
// ---------------------------------------------------------------------------

fn execute(
    ledger: &mut Ledger,
    program_id: &Pubkey,
    accounts: &[Pubkey],
    data: &[u8],
    signers: &[Pubkey],
) -> Result<InstructionSummary, ChainError> {
    let id = program_id.to_string();
    let account = |i: usize| {
        accounts
            .get(i)
            .copied()
            .ok_or_else(|| sim_failure(format!("missing account #{i}")))
    };

    if *program_id == solana_sdk::system_program::id() {
        let ix: SystemInstruction =
            bincode::deserialize(data).map_err(|e| sim_failure(e.to_string()))?;
        let SystemInstruction::CreateAccount {
            lamports,
            space,
            owner,
        } = ix
        else {
            return Err(sim_failure("unsupported system instruction"));
        };
        let new_account = account(1)?;
        if !signers.contains(&new_account) {
            return Err(sim_failure("new account did not sign"));
        }
        if ledger.accounts.contains_key(&new_account) {
            return Err(sim_failure("account already in use"));
        }
        ledger.accounts.insert(
            new_account,
            RawAccount {
                lamports,
                owner,
                space,
            },
        );
        return Ok(InstructionSummary::decoded("system", id, "createAccount"));
    }

    if *program_id == spl_associated_token_account::id() {
        let (ata, wallet, mint) = (account(1)?, account(2)?, account(3)?);
        if !ledger.mints.contains_key(&mint) {
            return Err(sim_failure("mint not initialized"));
        }
        if ledger.token_accounts.contains_key(&ata) {
            return Err(sim_failure("associated account already exists"));
        }
        if ata != spl_associated_token_account::get_associated_token_address(&wallet, &mint) {
            return Err(sim_failure("associated address mismatch"));
        }
        ledger.token_accounts.insert(
            ata,
            TokenAccountState {
                owner: wallet,
                mint,
                amount: 0,
            },
        );
        return Ok(InstructionSummary::decoded("spl-associated-token-account", id, "create"));
    }

    if *program_id == spl_token::id() {
        let ix = TokenInstruction::unpack(data).map_err(|e| sim_failure(e.to_string()))?;
        let kind = match ix {
            TokenInstruction::InitializeMint {
                decimals,
                mint_authority,
                ..
            } => {
                let mint = account(0)?;
                match ledger.accounts.get(&mint) {
                    Some(raw) if raw.owner == spl_token::id() => {}
                    _ => return Err(sim_failure("mint account not owned by token program")),
                }
                ledger.mints.insert(
                    mint,
                    MintState {
                        decimals,
                        authority: mint_authority,
                    },
                );
                "initializeMint"
            }
            TokenInstruction::MintTo { amount } => {
                let (mint, dest, authority) = (account(0)?, account(1)?, account(2)?);
                let state = ledger
                    .mints
                    .get(&mint)
                    .ok_or_else(|| sim_failure("unknown mint"))?;
                if state.authority != authority || !signers.contains(&authority) {
                    return Err(sim_failure("owner does not match"));
                }
                let dest = ledger
                    .token_accounts
                    .get_mut(&dest)
                    .ok_or_else(|| sim_failure("invalid account data for instruction"))?;
                dest.amount += amount;
                "mintTo"
            }
            TokenInstruction::Transfer { amount } => {
                let (source, dest, authority) = (account(0)?, account(1)?, account(2)?);
                let src = ledger
                    .token_accounts
                    .get(&source)
                    .ok_or_else(|| sim_failure("invalid account data for instruction"))?
                    .clone();
                if src.owner != authority || !signers.contains(&authority) {
                    return Err(sim_failure("owner does not match"));
                }
                if src.amount < amount {
                    return Err(sim_failure("insufficient funds"));
                }
                let dst = ledger
                    .token_accounts
                    .get_mut(&dest)
                    .ok_or_else(|| sim_failure("invalid account data for instruction"))?;
                if dst.mint != src.mint {
                    return Err(sim_failure("mint mismatch"));
                }
                dst.amount += amount;
                if let Some(src) = ledger.token_accounts.get_mut(&source) {
                    src.amount -= amount;
                }
                "transfer"
            }
            _ => return Err(sim_failure("unsupported token instruction")),
        };
        return Ok(InstructionSummary::decoded("spl-token", id, kind));
    }

    Ok(InstructionSummary::undecoded(id))
}

// ---------------------------------------------------------------------------
// BlockchainClient
// ---------------------------------------------------------------------------

#[async_trait]
impl BlockchainClient for LedgerSim {
    async fn submit_transaction(
        &self,
        transaction: Transaction,
        signers: &[&Keypair],
    ) -> Result<Signature, ChainError> {
        let mut state = self.state.lock();
        state.record("submit_transaction");
        state.submitted.push(transaction.clone());

        let signer_keys: Vec<Pubkey> = signers.iter().map(|k| k.pubkey()).collect();
        let message = &transaction.message;
        let required = usize::from(message.header.num_required_signatures);
        for key in message.account_keys.iter().take(required) {
            if !signer_keys.contains(key) {
                return Err(ChainError::Signing(format!("missing signature for {key}")));
            }
        }

        let mut ledger = state.ledger.clone();
        let mut summaries = Vec::with_capacity(message.instructions.len());
        for ix in &message.instructions {
            let program_id = message.account_keys[usize::from(ix.program_id_index)];
            let accounts: Vec<Pubkey> = ix
                .accounts
                .iter()
                .map(|i| message.account_keys[usize::from(*i)])
                .collect();
            summaries.push(execute(&mut ledger, &program_id, &accounts, &ix.data, &signer_keys)?);
        }
        state.ledger = ledger;

        let slot = state.bump_slot();
        let signature = signature_for_slot(slot);
        state.history.push(HistoryEntry {
            signature,
            keys: message.account_keys.clone(),
            tx: ParsedTransaction {
                slot,
                block_time: Some(BASE_BLOCK_TIME + slot as i64),
                instructions: summaries,
            },
            pruned: false,
        });
        Ok(signature)
    }

    async fn confirm_transaction(
        &self,
        _signature: &Signature,
        _commitment: Commitment,
    ) -> Result<(), ChainError> {
        let hang = {
            let mut state = self.state.lock();
            state.record("confirm_transaction");
            state.hang_confirmations
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, ChainError> {
        self.state.lock().record("minimum_balance_for_rent_exemption");
        assert_eq!(data_len, 82, "mint accounts are 82 bytes");
        Ok(RENT_FOR_MINT)
    }

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>, ChainError> {
        let mut state = self.state.lock();
        state.record("get_account_info");
        if state.ledger.token_accounts.contains_key(address) {
            return Ok(Some(AccountInfo {
                lamports: 2_039_280,
                owner: spl_token::id(),
                data_len: 165,
                executable: false,
            }));
        }
        Ok(state.ledger.accounts.get(address).map(|raw| AccountInfo {
            lamports: raw.lamports,
            owner: raw.owner,
            data_len: raw.space as usize,
            executable: false,
        }))
    }

    async fn parsed_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Vec<TokenAccountBalance>, ChainError> {
        let mut state = self.state.lock();
        state.record("parsed_token_accounts_by_owner");
        let Some(decimals) = state.ledger.mints.get(mint).map(|m| m.decimals) else {
            return Ok(Vec::new());
        };
        Ok(state
            .ledger
            .token_accounts
            .iter()
            .filter(|(_, a)| a.owner == *owner && a.mint == *mint)
            .map(|(address, a)| TokenAccountBalance {
                address: *address,
                mint: *mint,
                amount: a.amount,
                decimals,
                ui_amount: Some(mintdesk_chain::token::to_ui_amount(a.amount, decimals)),
            })
            .collect())
    }

    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, ChainError> {
        let mut state = self.state.lock();
        state.record("signatures_for_address");
        Ok(state
            .history
            .iter()
            .rev()
            .filter(|entry| entry.keys.contains(address))
            .take(limit)
            .map(|entry| SignatureInfo {
                signature: entry.signature,
                slot: entry.tx.slot,
                confirmation_status: Some(ConfirmationStatus::Confirmed),
                block_time: entry.tx.block_time,
                failed: false,
            })
            .collect())
    }

    async fn parsed_transaction(
        &self,
        signature: &Signature,
        max_supported_version: u8,
    ) -> Result<Option<ParsedTransaction>, ChainError> {
        let mut state = self.state.lock();
        state.record("parsed_transaction");
        assert_eq!(max_supported_version, 0);
        if state.fail_transaction_fetch {
            return Err(ChainError::Transport("connection reset".into()));
        }
        Ok(state
            .history
            .iter()
            .find(|entry| entry.signature == *signature && !entry.pruned)
            .map(|entry| entry.tx.clone()))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub struct Harness {
    pub sim: Arc<LedgerSim>,
    pub owner: Pubkey,
    pub workflow: TokenWorkflow,
}

/// Workflow wired to a fresh ledger and a connected keypair wallet.
pub fn harness() -> Harness {
    let sim = LedgerSim::new();
    let keypair = Keypair::new();
    let owner = keypair.pubkey();
    let workflow = TokenWorkflow::new(sim.clone(), Arc::new(KeypairWallet::new(keypair)));
    Harness {
        sim,
        owner,
        workflow,
    }
}

/// Workflow whose wallet is disconnected.
pub fn disconnected() -> (Arc<LedgerSim>, TokenWorkflow) {
    let sim = LedgerSim::new();
    let workflow = TokenWorkflow::new(sim.clone(), Arc::new(KeypairWallet::disconnected()));
    (sim, workflow)
}
