use mintdesk_chain::Cluster;
use mintdesk_workflow::ActivityRecord;

/// Display model for one row of the recent-transactions list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRow {
    pub signature: String,
    pub short_signature: String,
    pub status: String,
    /// `None` when the cluster reported no block time.
    pub timestamp: Option<String>,
    /// Decoded instruction types in transaction order, e.g. `["create", "transfer"]`.
    pub instruction_types: Vec<String>,
    pub explorer_url: String,
}

impl ActivityRow {
    pub fn from_record(record: &ActivityRecord, cluster: Cluster) -> Self {
        let signature = record.signature.to_string();
        Self {
            short_signature: truncate_address(&signature),
            status: record
                .status
                .map(|s| s.label().to_string())
                .unwrap_or_else(|| "unknown".into()),
            timestamp: record
                .block_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
            instruction_types: record
                .instructions
                .iter()
                .filter_map(|ix| ix.instruction_type.clone())
                .collect(),
            explorer_url: cluster.explorer_tx_url(&signature),
            signature,
        }
    }

    pub fn rows(records: &[ActivityRecord], cluster: Cluster) -> Vec<Self> {
        records
            .iter()
            .map(|record| Self::from_record(record, cluster))
            .collect()
    }
}

/// Shorten an address or signature to `first6...last4`.
pub fn truncate_address(address: &str) -> String {
    if address.len() <= 12 {
        return address.to_string();
    }
    let prefix = &address[..6];
    let suffix = &address[address.len() - 4..];
    format!("{prefix}...{suffix}")
}
