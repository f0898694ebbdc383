//! Token manager panel: session state plus action triggers.
//!
//! The panel owns no state itself. [`TokenManagerData`] holds everything the
//! view renders; [`TokenManagerPanel::begin`] marks an action in flight and
//! hands back an owned future, and [`TokenManagerData::finish`] folds the
//! outcome back in and turns it into a notification.

use std::collections::HashSet;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use mintdesk_chain::{Cluster, Pubkey, Signature};
use mintdesk_core::{AppNotification, NotificationStore};
use mintdesk_workflow::{
    ActivityRecord, BalanceView, ErrorKind, MintRecord, TokenWorkflow, WorkflowError,
};
use tracing::{debug, warn};

use crate::components::activity::ActivityRow;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// User-triggered operations, each with its own in-flight flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenAction {
    CreateMint,
    MintTokens,
    SendTokens,
    CheckBalance,
    FetchHistory,
    Ping,
}

impl TokenAction {
    pub const ALL: [TokenAction; 6] = [
        Self::CreateMint,
        Self::MintTokens,
        Self::SendTokens,
        Self::CheckBalance,
        Self::FetchHistory,
        Self::Ping,
    ];

    /// Button label, given the configured mint/transfer quantities.
    pub fn label(self, mint_amount: u64, transfer_amount: u64) -> String {
        match self {
            Self::CreateMint => "Create Token".into(),
            Self::MintTokens => format!("Mint {mint_amount} Tokens"),
            Self::SendTokens => format!("Send {transfer_amount} Tokens"),
            Self::CheckBalance => "Check Balance".into(),
            Self::FetchHistory => "Show Transactions".into(),
            Self::Ping => "Ping".into(),
        }
    }

    fn failure_title(self) -> &'static str {
        match self {
            Self::CreateMint => "Failed to create token",
            Self::MintTokens => "Failed to mint tokens",
            Self::SendTokens => "Token transfer failed",
            Self::CheckBalance => "Failed to fetch token balance",
            Self::FetchHistory => "Failed to fetch transaction history",
            Self::Ping => "Ping failed",
        }
    }
}

/// Successful result of a [`TokenAction`].
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    MintCreated(MintRecord),
    Minted { signature: Signature, amount: u64 },
    Sent { recipient: String, signature: Signature, amount: u64 },
    /// `mint` is the mint the query was started for.
    Balance {
        mint: Option<Pubkey>,
        balance: BalanceView,
    },
    History {
        mint: Option<Pubkey>,
        records: Vec<ActivityRecord>,
    },
    Pinged(Signature),
}

#[derive(Debug)]
pub struct ActionOutcome {
    pub action: TokenAction,
    pub result: Result<ActionResult, WorkflowError>,
}

/// A started action. Await [`complete`](Self::complete) (or spawn
/// [`into_future`](Self::into_future)) and pass the outcome to
/// [`TokenManagerData::finish`]. A caller that drops it instead must call
/// [`TokenManagerData::cancel`], or the action stays in flight.
pub struct PendingAction {
    pub action: TokenAction,
    future: BoxFuture<'static, ActionOutcome>,
}

impl PendingAction {
    pub async fn complete(self) -> ActionOutcome {
        self.future.await
    }

    pub fn into_future(self) -> BoxFuture<'static, ActionOutcome> {
        self.future
    }
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// Session state for the token manager panel. Lives only in memory.
#[derive(Debug, Clone, Default)]
pub struct TokenManagerData {
    pub mint: Option<MintRecord>,
    pub recipient: String,
    pub balance: Option<BalanceView>,
    pub transactions: Vec<ActivityRecord>,
    pub notifications: NotificationStore,
    in_flight: HashSet<TokenAction>,
}

impl TokenManagerData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self, action: TokenAction) -> bool {
        self.in_flight.contains(&action)
    }

    pub fn any_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Whether the trigger for `action` should be offered.
    pub fn is_enabled(&self, action: TokenAction, wallet_connected: bool) -> bool {
        if self.is_in_flight(action) {
            return false;
        }
        match action {
            TokenAction::CreateMint | TokenAction::Ping => wallet_connected,
            TokenAction::MintTokens | TokenAction::CheckBalance | TokenAction::FetchHistory => {
                self.mint.is_some()
            }
            TokenAction::SendTokens => {
                self.mint.is_some()
                    && !self.recipient.trim().is_empty()
                    && !self.is_in_flight(TokenAction::CreateMint)
            }
        }
    }

    /// Set the in-flight flag. Returns `false` if it was already set.
    fn mark_started(&mut self, action: TokenAction) -> bool {
        self.in_flight.insert(action)
    }

    /// Clear the flag of an action whose [`PendingAction`] was dropped
    /// without reaching [`finish`](Self::finish).
    pub fn cancel(&mut self, action: TokenAction) {
        if self.in_flight.remove(&action) {
            debug!(?action, "action abandoned");
        }
    }

    fn is_current_mint(&self, mint: Option<Pubkey>) -> bool {
        self.mint.as_ref().map(|m| m.address) == mint
    }

    /// Clear the action's flag, apply its result and record a notification.
    /// Balance and history results for a mint other than the current one
    /// are discarded.
    pub fn finish(&mut self, outcome: ActionOutcome, cluster: Cluster) {
        let ActionOutcome { action, result } = outcome;
        self.in_flight.remove(&action);

        let result = match result {
            Ok(result) => result,
            Err(err) => {
                warn!(?action, error = %err, "token action failed");
                let notification = match err.kind() {
                    ErrorKind::Precondition => AppNotification::error(err.user_message()),
                    _ => AppNotification::error(err.user_message())
                        .with_title(action.failure_title()),
                };
                self.notifications.push(notification);
                return;
            }
        };

        match result {
            ActionResult::MintCreated(record) => {
                let address = record.address.to_string();
                self.notifications.push(
                    AppNotification::success(format!("Token Created!\nMint Address: {address}"))
                        .with_link(cluster.explorer_address_url(&address)),
                );
                self.balance = None;
                self.transactions.clear();
                self.mint = Some(record);
            }
            ActionResult::Minted { signature, amount } => {
                self.notifications.push(
                    AppNotification::success(format!(
                        "Minted {amount} tokens!\nTransaction: {signature}"
                    ))
                    .with_link(cluster.explorer_tx_url(&signature.to_string())),
                );
            }
            ActionResult::Sent {
                recipient,
                signature,
                amount,
            } => {
                self.notifications.push(
                    AppNotification::success(format!(
                        "Sent {amount} tokens to {recipient}\nTx: {signature}"
                    ))
                    .with_link(cluster.explorer_tx_url(&signature.to_string())),
                );
            }
            ActionResult::Balance { mint, balance } => {
                if !self.is_current_mint(mint) {
                    debug!(?mint, "discarding balance for a previous mint");
                    return;
                }
                debug!(%balance, "balance updated");
                self.balance = Some(balance);
            }
            ActionResult::History { mint, records } => {
                if !self.is_current_mint(mint) {
                    debug!(?mint, "discarding activity for a previous mint");
                    return;
                }
                debug!(count = records.len(), "activity updated");
                self.transactions = records;
            }
            ActionResult::Pinged(signature) => {
                self.notifications.push(
                    AppNotification::success(format!("Ping sent!\nTransaction: {signature}"))
                        .with_link(cluster.explorer_tx_url(&signature.to_string())),
                );
            }
        }
    }

    /// Rows for the recent-transactions list.
    pub fn activity_rows(&self, cluster: Cluster) -> Vec<ActivityRow> {
        ActivityRow::rows(&self.transactions, cluster)
    }

    /// Balance formatted with the mint's decimals, once queried.
    pub fn balance_text(&self) -> Option<String> {
        self.balance.map(|b| b.to_string())
    }
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// Drives [`TokenWorkflow`] operations on behalf of the view.
pub struct TokenManagerPanel {
    workflow: Arc<TokenWorkflow>,
}

impl TokenManagerPanel {
    pub fn new(workflow: Arc<TokenWorkflow>) -> Self {
        Self { workflow }
    }

    pub fn cluster(&self) -> Cluster {
        self.workflow.settings().cluster
    }

    pub fn wallet_connected(&self) -> bool {
        self.workflow.wallet_connected()
    }

    pub fn is_enabled(&self, data: &TokenManagerData, action: TokenAction) -> bool {
        data.is_enabled(action, self.wallet_connected())
    }

    pub fn label(&self, action: TokenAction) -> String {
        let settings = self.workflow.settings();
        action.label(settings.mint_amount, settings.transfer_amount)
    }

    /// Start `action` against a snapshot of `data`. Returns `None` when the
    /// same action is already in flight. The flag stays set until the
    /// outcome is passed to [`TokenManagerData::finish`] or the action is
    /// cancelled.
    pub fn begin(&self, data: &mut TokenManagerData, action: TokenAction) -> Option<PendingAction> {
        if !data.mark_started(action) {
            debug!(?action, "action already in flight; ignoring");
            return None;
        }

        let workflow = Arc::clone(&self.workflow);
        let mint = data.mint.clone();
        let mint_address = mint.as_ref().map(|m| m.address);
        let recipient = data.recipient.clone();
        let settings = workflow.settings();
        let (mint_amount, transfer_amount) = (settings.mint_amount, settings.transfer_amount);

        let future = match action {
            TokenAction::CreateMint => async move {
                workflow.create_mint().await.map(ActionResult::MintCreated)
            }
            .boxed(),
            TokenAction::MintTokens => async move {
                workflow
                    .mint_to_owner(mint.as_ref())
                    .await
                    .map(|signature| ActionResult::Minted {
                        signature,
                        amount: mint_amount,
                    })
            }
            .boxed(),
            TokenAction::SendTokens => async move {
                workflow
                    .transfer_tokens(mint.as_ref(), &recipient)
                    .await
                    .map(|signature| ActionResult::Sent {
                        recipient: recipient.trim().to_string(),
                        signature,
                        amount: transfer_amount,
                    })
            }
            .boxed(),
            TokenAction::CheckBalance => async move {
                workflow
                    .query_balance(mint.as_ref())
                    .await
                    .map(|balance| ActionResult::Balance {
                        mint: mint_address,
                        balance,
                    })
            }
            .boxed(),
            TokenAction::FetchHistory => async move {
                workflow
                    .list_recent_token_activity()
                    .await
                    .map(|records| ActionResult::History {
                        mint: mint_address,
                        records,
                    })
            }
            .boxed(),
            TokenAction::Ping => {
                async move { workflow.ping().await.map(ActionResult::Pinged) }.boxed()
            }
        };

        Some(PendingAction {
            action,
            future: future
                .map(move |result| ActionOutcome { action, result })
                .boxed(),
        })
    }

    /// Run `action` to completion and return the updated state.
    pub async fn run(&self, mut data: TokenManagerData, action: TokenAction) -> TokenManagerData {
        if let Some(pending) = self.begin(&mut data, action) {
            let outcome = pending.complete().await;
            data.finish(outcome, self.cluster());
        }
        data
    }
}
