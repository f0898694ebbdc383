use mintdesk_chain::{InstructionSummary, SPL_TOKEN_PROGRAM_NAME};

use crate::types::ActivityRecord;

/// SPL Token instruction types reported as token activity.
pub const TOKEN_ACTIVITY_TYPES: [&str; 2] = ["mintTo", "transfer"];

/// Whether a single instruction is an SPL Token mint or transfer.
pub fn is_token_activity(ix: &InstructionSummary) -> bool {
    ix.program.as_deref() == Some(SPL_TOKEN_PROGRAM_NAME)
        && ix
            .instruction_type
            .as_deref()
            .is_some_and(|kind| TOKEN_ACTIVITY_TYPES.contains(&kind))
}

pub fn has_token_activity(record: &ActivityRecord) -> bool {
    record.instructions.iter().any(is_token_activity)
}
