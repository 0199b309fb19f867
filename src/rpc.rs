use alloy::consensus::Transaction as ConsensusTransaction;
use alloy::network::TransactionResponse;
use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Block, BlockNumberOrTag, BlockTransactions, Transaction};
use alloy_primitives::{Address, B256, U256};
use std::future::IntoFuture;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::{CrawlerError, CrawlerResult};

type AlloyFullProvider = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider,
>;

/// A block with full transaction bodies, reduced to the fields the crawler reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBlock {
    pub number: u64,
    pub timestamp: u64,
    pub transactions: Vec<FetchedTransaction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTransaction {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    /// Wei.
    pub value: U256,
    pub gas: u64,
    pub gas_price: u64,
    pub nonce: u64,
}

/// Source of blocks for the ingestor. No retries happen behind this seam.
#[allow(async_fn_in_trait)]
pub trait BlockSource {
    fn endpoint(&self) -> &str;

    async fn connected(&self) -> bool;

    /// Fails with `NotFound` when the block does not exist yet.
    async fn fetch_block(&self, number: u64) -> CrawlerResult<FetchedBlock>;
}

pub struct RpcClient {
    provider: AlloyFullProvider,
    url: String,
    request_timeout: Option<Duration>,
}

impl RpcClient {
    pub fn new(rpc_url: &str, request_timeout: Option<Duration>) -> CrawlerResult<Self> {
        let parsed_url = rpc_url
            .parse()
            .map_err(|_| CrawlerError::Validation(format!("Invalid RPC URL: {rpc_url}")))?;
        let provider: AlloyFullProvider = ProviderBuilder::new().connect_http(parsed_url);

        Ok(RpcClient {
            provider,
            url: rpc_url.to_string(),
            request_timeout,
        })
    }

    /// Awaits `request`, bounded by the optional deadline.
    async fn with_deadline<T, E: std::fmt::Display>(
        &self,
        request: impl IntoFuture<Output = Result<T, E>>,
    ) -> Result<T, String> {
        match self.request_timeout {
            Some(limit) => match timeout(limit, request).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!(
                    "request timeout after {} seconds",
                    limit.as_secs()
                )),
            },
            None => request.into_future().await.map_err(|e| e.to_string()),
        }
    }

    fn convert_block(number: u64, block: Block) -> CrawlerResult<FetchedBlock> {
        let timestamp = block.header.timestamp;
        let transactions = match block.transactions {
            BlockTransactions::Full(txs) => txs,
            BlockTransactions::Uncle => Vec::new(),
            BlockTransactions::Hashes(_) => {
                return Err(CrawlerError::Fetch {
                    block: number,
                    reason: "node returned transaction hashes instead of bodies".to_string(),
                });
            }
        };

        let transactions = transactions
            .into_iter()
            .map(|tx| Self::convert_transaction(number, tx))
            .collect::<CrawlerResult<Vec<_>>>()?;

        Ok(FetchedBlock {
            number: block.header.number,
            timestamp,
            transactions,
        })
    }

    fn convert_transaction(block: u64, tx: Transaction) -> CrawlerResult<FetchedTransaction> {
        let gas_price = tx
            .effective_gas_price
            .unwrap_or_else(|| ConsensusTransaction::max_fee_per_gas(&tx));
        let gas_price = u64::try_from(gas_price).map_err(|_| CrawlerError::Fetch {
            block,
            reason: format!("gas price {gas_price} out of range"),
        })?;

        Ok(FetchedTransaction {
            hash: TransactionResponse::tx_hash(&tx),
            from: TransactionResponse::from(&tx),
            to: ConsensusTransaction::to(&tx),
            value: ConsensusTransaction::value(&tx),
            gas: ConsensusTransaction::gas_limit(&tx),
            gas_price,
            nonce: ConsensusTransaction::nonce(&tx),
        })
    }
}

impl BlockSource for RpcClient {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connected(&self) -> bool {
        match self.with_deadline(self.provider.get_block_number()).await {
            Ok(head) => {
                debug!("Connected to {}, chain head at block {}", self.url, head);
                true
            }
            Err(e) => {
                warn!("Liveness check against {} failed: {}", self.url, e);
                false
            }
        }
    }

    async fn fetch_block(&self, number: u64) -> CrawlerResult<FetchedBlock> {
        let request = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .full();

        let block = self
            .with_deadline(request)
            .await
            .map_err(|reason| CrawlerError::Fetch {
                block: number,
                reason,
            })?
            .ok_or(CrawlerError::NotFound(number))?;

        Self::convert_block(number, block)
    }
}
