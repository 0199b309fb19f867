use crate::errors::{CrawlerError, CrawlerResult};
use regex::Regex;
use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;

const RPC_ENDPOINT_PATTERN: &str = r"^https?://[^\s/$.?#][^\s]*$";

pub fn validate_rpc_endpoint(url: &str) -> CrawlerResult<()> {
    let re = Regex::new(RPC_ENDPOINT_PATTERN)
        .map_err(|e| CrawlerError::Validation(format!("endpoint pattern: {e}")))?;
    if re.is_match(url) {
        Ok(())
    } else {
        Err(CrawlerError::Validation(
            "Invalid Ethereum RPC endpoint.".to_string(),
        ))
    }
}

/// Probes writability by opening for append, creating the file when absent.
pub fn validate_db_path(path: &Path) -> CrawlerResult<()> {
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map(|_| ())
        .map_err(|_| {
            CrawlerError::Validation("Invalid or inaccessible database path.".to_string())
        })
}

/// Inclusive block range, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

impl BlockRange {
    pub fn new(start: u64, end: u64) -> CrawlerResult<Self> {
        if start > end {
            return Err(Self::invalid());
        }
        Ok(BlockRange { start, end })
    }

    pub fn blocks(&self) -> std::ops::RangeInclusive<u64> {
        self.start..=self.end
    }

    pub fn block_count(&self) -> u64 {
        self.end - self.start + 1
    }

    fn invalid() -> CrawlerError {
        CrawlerError::Validation(
            "Invalid block range format or range. Format should be start-end (e.g., 200-300)."
                .to_string(),
        )
    }
}

impl FromStr for BlockRange {
    type Err = CrawlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s.split_once('-').ok_or_else(Self::invalid)?;
        let parse = |part: &str| {
            let part = part.trim();
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Self::invalid());
            }
            part.parse::<u64>().map_err(|_| Self::invalid())
        };
        BlockRange::new(parse(start)?, parse(end)?)
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_scheme_must_be_http() {
        assert!(validate_rpc_endpoint("http://x").is_ok());
        assert!(validate_rpc_endpoint("https://x.y/z").is_ok());
        assert!(validate_rpc_endpoint("https://eth-mainnet.g.alchemy.com/v2/key").is_ok());
        assert!(validate_rpc_endpoint("ftp://x").is_err());
        assert!(validate_rpc_endpoint("http://").is_err());
        assert!(validate_rpc_endpoint("http:///path").is_err());
        assert!(validate_rpc_endpoint("localhost:8545").is_err());
        assert!(validate_rpc_endpoint("http://host name").is_err());
    }

    #[test]
    fn test_range_parsing() {
        assert_eq!(
            "200-300".parse::<BlockRange>().unwrap(),
            BlockRange { start: 200, end: 300 }
        );
        assert_eq!(
            " 100 - 100 ".parse::<BlockRange>().unwrap(),
            BlockRange { start: 100, end: 100 }
        );
        assert!("300-200".parse::<BlockRange>().is_err());
        assert!("200".parse::<BlockRange>().is_err());
        assert!("-5-10".parse::<BlockRange>().is_err());
        assert!("1-2-3".parse::<BlockRange>().is_err());
        assert!("a-b".parse::<BlockRange>().is_err());
        assert!("+1-2".parse::<BlockRange>().is_err());
    }

    #[test]
    fn test_range_is_inclusive() {
        let range: BlockRange = "100-102".parse().unwrap();
        assert_eq!(range.blocks().collect::<Vec<_>>(), vec![100, 101, 102]);
        assert_eq!(range.block_count(), 3);
    }

    #[test]
    fn test_db_path_probe() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("blocks.db");
        assert!(validate_db_path(&file).is_ok());
        assert!(file.exists());

        let missing_parent = dir.path().join("no-such-dir").join("blocks.db");
        assert!(validate_db_path(&missing_parent).is_err());
    }
}
