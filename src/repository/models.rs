use alloy_primitives::{Address, B256};
use serde::Serialize;

/// One persisted row per on-chain transaction, keyed by `hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub hash: B256,
    pub block_number: u64,
    pub from_address: Address,
    /// `None` for contract creation.
    pub to_address: Option<Address>,
    pub value_eth: String,
    pub gas: u64,
    pub gas_price: u64,
    pub nonce: u64,
    pub block_timestamp: u64,
}

/// Per-block totals inside a query window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockVolume {
    pub block_number: u64,
    pub total_volume_eth: String,
    pub transaction_count: u64,
}
