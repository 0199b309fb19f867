use anyhow::Result;
use block_crawler::config::QueryConfig;
use block_crawler::query::commands::cmd_largest_block;
use block_crawler::query::formatters::OutputFormat;
use block_crawler::repository::{Database, RankingMetric, TransactionRepository};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "query")]
#[command(about = "Find the block with the largest ether volume in a time window", long_about = None)]
struct Cli {
    /// SQLite database written by the crawler
    db_path: String,

    /// Window start, epoch seconds or "YYYY-MM-DD HH:MM:SS" UTC [default: 2024-01-01 00:00:00]
    #[arg(long)]
    from: Option<String>,

    /// Window end, inclusive [default: 2024-01-01 00:30:00]
    #[arg(long)]
    to: Option<String>,

    #[arg(long, value_enum, default_value_t = RankingMetric::Volume)]
    metric: RankingMetric,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
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

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_cli();
    let config = QueryConfig::new(
        &cli.db_path,
        cli.from.as_deref(),
        cli.to.as_deref(),
        cli.metric,
    )?;

    let db = Database::open_read_only(&config.db_path)?;
    let transaction_repo = TransactionRepository::new(&db.conn);
    let result = cmd_largest_block(&transaction_repo, &config, &cli.format);
    db.close_with(result)?;
    Ok(())
}
