pub mod components;
pub mod panels;

pub use components::activity::{ActivityRow, truncate_address};
pub use panels::token_manager::{
    ActionOutcome, ActionResult, PendingAction, TokenAction, TokenManagerData, TokenManagerPanel,
};
