//! Error types for block ingestion and querying.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlerError {
    /// Bad operator input: endpoint shape, unwritable path, malformed range.
    #[error("{0}")]
    Validation(String),

    /// Endpoint unreachable or reporting not-connected.
    #[error("Failed to connect to Ethereum network at {0}")]
    Connectivity(String),

    /// Block number does not exist yet (ahead of chain head).
    #[error("block {0} not found")]
    NotFound(u64),

    #[error("failed to fetch block {block}: {reason}")]
    Fetch { block: u64, reason: String },

    /// Store file or schema could not be prepared.
    #[error("failed to initialize store at {path}: {reason}")]
    StorageInit { path: String, reason: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl CrawlerError {
    /// Errors confined to a single block, which a skip policy may step over.
    pub fn is_block_local(&self) -> bool {
        matches!(self, CrawlerError::NotFound(_) | CrawlerError::Fetch { .. })
    }
}

impl From<rusqlite::Error> for CrawlerError {
    fn from(err: rusqlite::Error) -> Self {
        CrawlerError::Storage(err.to_string())
    }
}

pub type CrawlerResult<T> = Result<T, CrawlerError>;
