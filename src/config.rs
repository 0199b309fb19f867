use crate::errors::{CrawlerError, CrawlerResult};
use crate::repository::{RankingMetric, TimeWindow};
use crate::validation::{BlockRange, validate_db_path, validate_rpc_endpoint};
use chrono::NaiveDateTime;
use std::path::PathBuf;
use std::time::Duration;

/// What to do when a single block cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ErrorPolicy {
    /// Stop the run at the failing block.
    #[default]
    Abort,
    /// Log the failure and continue with the next block.
    Skip,
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub rpc_endpoint: String,
    pub db_path: PathBuf,
    pub range: BlockRange,
    pub error_policy: ErrorPolicy,
    pub resume: bool,
    pub request_timeout: Option<Duration>,
}

impl IngestConfig {
    /// Validates endpoint, database path and range, in that order.
    pub fn from_args(rpc_endpoint: &str, db_path: &str, block_range: &str) -> CrawlerResult<Self> {
        validate_rpc_endpoint(rpc_endpoint)?;

        let db_path = PathBuf::from(db_path);
        validate_db_path(&db_path)?;

        let range: BlockRange = block_range.parse()?;

        Ok(IngestConfig {
            rpc_endpoint: rpc_endpoint.to_string(),
            db_path,
            range,
            error_policy: ErrorPolicy::default(),
            resume: false,
            request_timeout: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub db_path: PathBuf,
    pub window: TimeWindow,
    pub metric: RankingMetric,
}

impl QueryConfig {
    pub fn new(
        db_path: &str,
        from: Option<&str>,
        to: Option<&str>,
        metric: RankingMetric,
    ) -> CrawlerResult<Self> {
        let window = TimeWindow {
            from: from
                .map(parse_timestamp)
                .transpose()?
                .unwrap_or(TimeWindow::DEFAULT_FROM),
            to: to
                .map(parse_timestamp)
                .transpose()?
                .unwrap_or(TimeWindow::DEFAULT_TO),
        };
        if window.from > window.to {
            return Err(CrawlerError::Validation(format!(
                "Invalid time window: {} is after {}",
                window.from, window.to
            )));
        }

        Ok(QueryConfig {
            db_path: PathBuf::from(db_path),
            window,
            metric,
        })
    }
}

/// Accepts epoch seconds or `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn parse_timestamp(value: &str) -> CrawlerResult<u64> {
    let value = value.trim();
    if let Ok(epoch) = value.parse::<u64>() {
        return Ok(epoch);
    }

    let invalid = || {
        CrawlerError::Validation(format!(
            "Invalid timestamp '{value}': expected epoch seconds or YYYY-MM-DD HH:MM:SS"
        ))
    };
    let parsed = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map_err(|_| invalid())?;
    u64::try_from(parsed.and_utc().timestamp()).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_config_validates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("crawl.db");
        let db = db.to_str().unwrap();

        let config = IngestConfig::from_args("https://x.y/z", db, "200-300").unwrap();
        assert_eq!(config.range, BlockRange::new(200, 300).unwrap());
        assert_eq!(config.error_policy, ErrorPolicy::Abort);
        assert!(!config.resume);

        let err = IngestConfig::from_args("ftp://x", "/no/such/dir/crawl.db", "300-200").unwrap_err();
        assert_eq!(err.to_string(), "Invalid Ethereum RPC endpoint.");

        let err = IngestConfig::from_args("http://x", "/no/such/dir/crawl.db", "300-200").unwrap_err();
        assert_eq!(err.to_string(), "Invalid or inaccessible database path.");

        let err = IngestConfig::from_args("http://x", db, "300-200").unwrap_err();
        assert!(matches!(err, CrawlerError::Validation(_)));
    }

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(parse_timestamp("1704067200").unwrap(), 1_704_067_200);
        assert_eq!(
            parse_timestamp("2024-01-01 00:30:00").unwrap(),
            TimeWindow::DEFAULT_TO
        );
        assert!(parse_timestamp("2024-01-01").is_err());
        assert!(parse_timestamp("1969-12-31 23:59:59").is_err());
    }

    #[test]
    fn test_query_window_defaults_and_order() {
        let config = QueryConfig::new("crawl.db", None, None, RankingMetric::Volume).unwrap();
        assert_eq!(config.window, TimeWindow::default());

        let config =
            QueryConfig::new("crawl.db", Some("100"), Some("200"), RankingMetric::Volume).unwrap();
        assert_eq!(config.window, TimeWindow { from: 100, to: 200 });

        assert!(QueryConfig::new("crawl.db", Some("200"), Some("100"), RankingMetric::Volume).is_err());
    }
}
