use anyhow::Result;
use block_crawler::config::{ErrorPolicy, IngestConfig};
use block_crawler::ingestor::{IngestReport, RangeIngestor};
use block_crawler::repository::Database;
use block_crawler::rpc::RpcClient;
use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crawler")]
#[command(about = "Ingest Ethereum transactions for a block range into SQLite", long_about = None)]
struct Cli {
    /// JSON-RPC endpoint (http:// or https://)
    rpc_endpoint: String,

    /// SQLite database file, created if missing
    db_path: String,

    /// Inclusive block range, e.g. 200-300
    block_range: String,

    #[arg(long, value_enum, default_value_t = ErrorPolicy::Abort)]
    on_error: ErrorPolicy,

    /// Start at the first block of the range not stored by a previous run
    #[arg(long, default_value = "false")]
    resume: bool,

    /// Per-request deadline for RPC calls; unbounded when omitted
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = parse_cli();

    let mut config = IngestConfig::from_args(&cli.rpc_endpoint, &cli.db_path, &cli.block_range)?;
    config.error_policy = cli.on_error;
    config.resume = cli.resume;
    config.request_timeout = cli.timeout_secs.map(Duration::from_secs);

    info!("Starting block crawler for blocks {}", config.range);
    info!("Block error policy: {:?}", config.error_policy);

    let client = RpcClient::new(&config.rpc_endpoint, config.request_timeout)?;

    let db = Database::open(&config.db_path)?;
    info!("Database initialized at {}", config.db_path.display());

    let result = RangeIngestor::new(&client, &db, config.range)
        .with_error_policy(config.error_policy)
        .resuming(config.resume)
        .run()
        .await;
    let report = db.close_with(result)?;

    report_summary(&report, &config);
    Ok(())
}

fn report_summary(report: &IngestReport, config: &IngestConfig) {
    info!(
        "Committed {} block(s), {} transactions seen, {} newly stored",
        report.blocks_committed, report.records_seen, report.records_inserted
    );

    for skipped in &report.skipped {
        warn!("Block {} skipped: {}", skipped.block_number, skipped.reason);
    }
    if !report.skipped.is_empty() {
        let blocks: Vec<String> = report
            .skipped
            .iter()
            .map(|s| s.block_number.to_string())
            .collect();
        eprintln!(
            "{} block(s) were skipped and are not stored: {}",
            blocks.len(),
            blocks.join(", ")
        );
    }

    if let Some(aborted) = &report.aborted {
        eprintln!(
            "An error occurred at block {}: {}",
            aborted.block_number, aborted.error
        );
        eprintln!(
            "Re-run with block range {}-{} to continue",
            aborted.block_number, config.range.end
        );
    }
}
