use crate::config::ErrorPolicy;
use crate::errors::{CrawlerError, CrawlerResult};
use crate::extractor::extract;
use crate::repository::Database;
use crate::rpc::BlockSource;
use crate::validation::BlockRange;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Idle,
    Connecting,
    Connected,
    IteratingBlocks,
    Done,
    ConnectionFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBlock {
    pub block_number: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortedBlock {
    pub block_number: u64,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Range actually iterated; `None` when a resumed range was already complete.
    pub range: Option<BlockRange>,
    pub blocks_committed: u64,
    pub records_seen: u64,
    pub records_inserted: u64,
    pub last_committed_block: Option<u64>,
    pub skipped: Vec<SkippedBlock>,
    pub aborted: Option<AbortedBlock>,
}

impl IngestReport {
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none() && self.skipped.is_empty()
    }
}

/// Drives fetch, extract and commit for each block of a range, one block at a time.
pub struct RangeIngestor<'a, S: BlockSource> {
    source: &'a S,
    db: &'a Database,
    range: BlockRange,
    error_policy: ErrorPolicy,
    resume: bool,
    state: IngestState,
}

impl<'a, S: BlockSource> RangeIngestor<'a, S> {
    pub fn new(source: &'a S, db: &'a Database, range: BlockRange) -> Self {
        RangeIngestor {
            source,
            db,
            range,
            error_policy: ErrorPolicy::default(),
            resume: false,
            state: IngestState::Idle,
        }
    }

    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    /// Start at the first block of the range that is not yet stored.
    pub fn resuming(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn state(&self) -> IngestState {
        self.state
    }

    fn transition(&mut self, next: IngestState) {
        debug!("Ingestor state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Per-block failures end up in the report; only connectivity and
    /// progress lookup failures are returned as errors.
    pub async fn run(&mut self) -> CrawlerResult<IngestReport> {
        self.transition(IngestState::Connecting);
        if !self.source.connected().await {
            self.transition(IngestState::ConnectionFailed);
            return Err(CrawlerError::Connectivity(self.source.endpoint().to_string()));
        }
        self.transition(IngestState::Connected);

        let mut report = IngestReport::default();
        let Some(range) = self.effective_range()? else {
            info!(
                "Blocks {} already ingested, nothing to do",
                self.range
            );
            self.transition(IngestState::Done);
            return Ok(report);
        };
        report.range = Some(range);

        info!("Ingesting {} block(s): {}", range.block_count(), range);
        self.transition(IngestState::IteratingBlocks);

        for block_number in range.blocks() {
            match self.ingest_block(block_number).await {
                Ok((seen, inserted)) => {
                    report.blocks_committed += 1;
                    report.records_seen += seen as u64;
                    report.records_inserted += inserted as u64;
                    report.last_committed_block = Some(block_number);
                }
                Err(e) if self.error_policy == ErrorPolicy::Skip && e.is_block_local() => {
                    warn!("Skipping block {}: {}", block_number, e);
                    report.skipped.push(SkippedBlock {
                        block_number,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    error!("An error occurred at block {}: {}", block_number, e);
                    report.aborted = Some(AbortedBlock {
                        block_number,
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        self.transition(IngestState::Done);
        Ok(report)
    }

    fn effective_range(&self) -> CrawlerResult<Option<BlockRange>> {
        if !self.resume {
            return Ok(Some(self.range));
        }
        match self.db.first_missing_block(self.range)? {
            Some(first) if first > self.range.start => {
                info!("Resuming at block {}, the first not yet stored", first);
                Ok(Some(BlockRange::new(first, self.range.end)?))
            }
            missing => Ok(missing.map(|_| self.range)),
        }
    }

    async fn ingest_block(&self, block_number: u64) -> CrawlerResult<(usize, usize)> {
        info!("Fetching block {}...", block_number);
        let block = self.source.fetch_block(block_number).await?;

        let records = extract(&block);
        let inserted = self.db.commit_block(block_number, &records)?;

        info!(
            "Block {}: {} transactions processed.",
            block_number,
            records.len()
        );
        if inserted < records.len() {
            debug!(
                "Block {}: {} already stored",
                block_number,
                records.len() - inserted
            );
        }

        Ok((records.len(), inserted))
    }
}
