//! JSON-RPC implementation of [`BlockchainClient`].

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use tracing::{debug, warn};

use crate::client::{
    AccountInfo, BlockchainClient, Commitment, ConfirmationStatus, InstructionSummary,
    ParsedTransaction, SignatureInfo, TokenAccountBalance,
};
use crate::error::ChainError;
use crate::rpc_config::RpcConfig;

// ---------------------------------------------------------------------------
// JSON-RPC wire types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatusJson {
    confirmations: Option<u64>,
    err: Option<Value>,
    confirmation_status: Option<ConfirmationStatus>,
}

#[derive(Debug, Deserialize)]
struct AccountJson {
    lamports: u64,
    owner: String,
    executable: bool,
    /// `[payload, encoding]`
    data: (String, String),
}

#[derive(Debug, Deserialize)]
struct KeyedAccountJson {
    pubkey: String,
    account: ParsedAccountJson,
}

#[derive(Debug, Deserialize)]
struct ParsedAccountJson {
    data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAmountJson {
    amount: String,
    decimals: u8,
    ui_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureInfoJson {
    signature: String,
    slot: u64,
    err: Option<Value>,
    block_time: Option<i64>,
    confirmation_status: Option<ConfirmationStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionJson {
    slot: u64,
    block_time: Option<i64>,
    transaction: TransactionEnvelopeJson,
}

#[derive(Debug, Deserialize)]
struct TransactionEnvelopeJson {
    message: MessageJson,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageJson {
    #[serde(default)]
    account_keys: Vec<Value>,
    #[serde(default)]
    instructions: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Unwrap a JSON-RPC envelope into `T`. A `null` result is only accepted
/// when `T` can represent it (e.g. `Option<_>`).
fn decode_response<T: DeserializeOwned>(method: &str, response: RpcResponse) -> Result<T, ChainError> {
    if let Some(err) = response.error {
        return Err(ChainError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    serde_json::from_value(response.result)
        .map_err(|e| ChainError::InvalidResponse(format!("{method}: {e}")))
}

fn parse_pubkey(value: &str) -> Result<Pubkey, ChainError> {
    Pubkey::from_str(value)
        .map_err(|e| ChainError::InvalidResponse(format!("bad pubkey {value:?}: {e}")))
}

fn parse_signature(value: &str) -> Result<Signature, ChainError> {
    Signature::from_str(value)
        .map_err(|e| ChainError::InvalidResponse(format!("bad signature {value:?}: {e}")))
}

/// Outcome of one signature-status poll.
#[derive(Debug, PartialEq)]
enum StatusCheck {
    Pending,
    Reached,
    Failed(String),
}

fn evaluate_status(status: Option<&SignatureStatusJson>, commitment: Commitment) -> StatusCheck {
    let Some(status) = status else {
        return StatusCheck::Pending;
    };
    if let Some(err) = status.err.as_ref().filter(|e| !e.is_null()) {
        return StatusCheck::Failed(err.to_string());
    }
    // Older nodes omit `confirmationStatus`; `confirmations: null` means rooted.
    let observed = status.confirmation_status.or(match status.confirmations {
        None => Some(ConfirmationStatus::Finalized),
        Some(_) => None,
    });
    match observed {
        Some(level) if commitment.is_satisfied_by(level) => StatusCheck::Reached,
        _ => StatusCheck::Pending,
    }
}

/// Pull the token balance out of a `jsonParsed` token account. Returns
/// `None` for accounts the node did not parse.
fn token_balance_from_keyed(keyed: &KeyedAccountJson) -> Option<TokenAccountBalance> {
    let info = keyed.account.data.get("parsed")?.get("info")?;
    let token_amount: TokenAmountJson =
        serde_json::from_value(info.get("tokenAmount")?.clone()).ok()?;
    Some(TokenAccountBalance {
        address: Pubkey::from_str(&keyed.pubkey).ok()?,
        mint: Pubkey::from_str(info.get("mint")?.as_str()?).ok()?,
        amount: token_amount.amount.parse().ok()?,
        decimals: token_amount.decimals,
        ui_amount: token_amount.ui_amount,
    })
}

/// Account keys are plain strings in raw messages and `{ "pubkey": .. }`
/// objects in parsed ones.
fn account_key_at(account_keys: &[Value], index: usize) -> Option<String> {
    let key = account_keys.get(index)?;
    key.as_str()
        .or_else(|| key.get("pubkey").and_then(Value::as_str))
        .map(str::to_string)
}

/// Reduce one top-level instruction to a summary. Instructions the node
/// could not decode keep only their program id.
fn summarize_instruction(ix: &Value, account_keys: &[Value]) -> InstructionSummary {
    let program_id = ix
        .get("programId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            ix.get("programIdIndex")
                .and_then(Value::as_u64)
                .and_then(|i| account_key_at(account_keys, i as usize))
        })
        .unwrap_or_default();

    let program = ix.get("program").and_then(Value::as_str);
    let instruction_type = ix
        .get("parsed")
        .and_then(|p| p.get("type"))
        .and_then(Value::as_str);

    match (program, instruction_type) {
        (Some(program), Some(kind)) => InstructionSummary::decoded(program, program_id, kind),
        (Some(program), None) => InstructionSummary {
            program: Some(program.to_string()),
            program_id,
            instruction_type: None,
        },
        _ => InstructionSummary::undecoded(program_id),
    }
}

impl From<TransactionJson> for ParsedTransaction {
    fn from(tx: TransactionJson) -> Self {
        let message = tx.transaction.message;
        let instructions = message
            .instructions
            .iter()
            .map(|ix| summarize_instruction(ix, &message.account_keys))
            .collect();
        Self {
            slot: tx.slot,
            block_time: tx.block_time,
            instructions,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Solana JSON-RPC client over HTTP.
pub struct RpcBlockchainClient {
    config: RpcConfig,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcBlockchainClient {
    pub fn new(config: RpcConfig) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            config,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// History queries reject `processed`.
    fn history_commitment(&self) -> Commitment {
        self.config.commitment.max(Commitment::Confirmed)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, url = %self.config.url, "rpc request");

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let response = self
            .http
            .post(&self.config.url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(method, %status, "rpc http error");
            return Err(ChainError::Transport(format!("{method}: HTTP {status}: {body}")));
        }

        let envelope: RpcResponse = response.json().await?;
        decode_response(method, envelope)
    }

    async fn latest_blockhash(&self) -> Result<Hash, ChainError> {
        let response: WithContext<BlockhashValue> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.config.commitment.as_str() }]),
            )
            .await?;
        Hash::from_str(&response.value.blockhash)
            .map_err(|e| ChainError::InvalidResponse(format!("bad blockhash: {e}")))
    }
}

#[async_trait]
impl BlockchainClient for RpcBlockchainClient {
    async fn submit_transaction(
        &self,
        mut transaction: Transaction,
        signers: &[&Keypair],
    ) -> Result<Signature, ChainError> {
        let blockhash = self.latest_blockhash().await?;
        // `dyn Signer` is not `Sync`; the borrowed list must not outlive this block.
        {
            let signers: Vec<&dyn Signer> = signers.iter().map(|k| *k as &dyn Signer).collect();
            transaction
                .try_sign(&signers, blockhash)
                .map_err(|e| ChainError::Signing(e.to_string()))?;
        }

        let wire = bincode::serialize(&transaction)
            .map_err(|e| ChainError::Signing(format!("failed to serialize transaction: {e}")))?;
        let encoded = BASE64.encode(wire);

        let signature: String = self
            .call(
                "sendTransaction",
                json!([encoded, {
                    "encoding": "base64",
                    "preflightCommitment": self.config.commitment.as_str(),
                }]),
            )
            .await?;
        debug!(%signature, "transaction submitted");
        parse_signature(&signature)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<(), ChainError> {
        let encoded = signature.to_string();
        loop {
            let response: WithContext<Vec<Option<SignatureStatusJson>>> = self
                .call(
                    "getSignatureStatuses",
                    json!([[encoded], { "searchTransactionHistory": false }]),
                )
                .await?;
            let status = response.value.first().and_then(Option::as_ref);
            match evaluate_status(status, commitment) {
                StatusCheck::Reached => {
                    debug!(signature = %encoded, %commitment, "transaction confirmed");
                    return Ok(());
                }
                StatusCheck::Failed(reason) => {
                    return Err(ChainError::TransactionFailed {
                        signature: encoded,
                        reason,
                    });
                }
                StatusCheck::Pending => tokio::time::sleep(self.config.poll_interval()).await,
            }
        }
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, ChainError> {
        self.call("getMinimumBalanceForRentExemption", json!([data_len]))
            .await
    }

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>, ChainError> {
        let response: WithContext<Option<AccountJson>> = self
            .call(
                "getAccountInfo",
                json!([address.to_string(), {
                    "encoding": "base64",
                    "commitment": self.config.commitment.as_str(),
                }]),
            )
            .await?;

        response
            .value
            .map(|account| {
                let data_len = BASE64
                    .decode(account.data.0.as_bytes())
                    .map(|bytes| bytes.len())
                    .map_err(|e| ChainError::InvalidResponse(format!("account data: {e}")))?;
                Ok::<_, ChainError>(AccountInfo {
                    lamports: account.lamports,
                    owner: parse_pubkey(&account.owner)?,
                    data_len,
                    executable: account.executable,
                })
            })
            .transpose()
    }

    async fn parsed_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Vec<TokenAccountBalance>, ChainError> {
        let response: WithContext<Vec<KeyedAccountJson>> = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.to_string(),
                    { "mint": mint.to_string() },
                    {
                        "encoding": "jsonParsed",
                        "commitment": self.config.commitment.as_str(),
                    },
                ]),
            )
            .await?;

        Ok(response
            .value
            .iter()
            .filter_map(|keyed| {
                let balance = token_balance_from_keyed(keyed);
                if balance.is_none() {
                    warn!(account = %keyed.pubkey, "token account was not jsonParsed; skipping");
                }
                balance
            })
            .collect())
    }

    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, ChainError> {
        let entries: Vec<SignatureInfoJson> = self
            .call(
                "getSignaturesForAddress",
                json!([address.to_string(), {
                    "limit": limit,
                    "commitment": self.history_commitment().as_str(),
                }]),
            )
            .await?;

        entries
            .into_iter()
            .map(|entry| {
                Ok::<_, ChainError>(SignatureInfo {
                    signature: parse_signature(&entry.signature)?,
                    slot: entry.slot,
                    confirmation_status: entry.confirmation_status,
                    block_time: entry.block_time,
                    failed: entry.err.is_some_and(|e| !e.is_null()),
                })
            })
            .collect()
    }

    async fn parsed_transaction(
        &self,
        signature: &Signature,
        max_supported_version: u8,
    ) -> Result<Option<ParsedTransaction>, ChainError> {
        let tx: Option<TransactionJson> = self
            .call(
                "getTransaction",
                json!([signature.to_string(), {
                    "encoding": "jsonParsed",
                    "maxSupportedTransactionVersion": max_supported_version,
                    "commitment": self.history_commitment().as_str(),
                }]),
            )
            .await?;
        Ok(tx.map(ParsedTransaction::from))
    }
}
