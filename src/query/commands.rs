use crate::config::QueryConfig;
use crate::errors::CrawlerResult;
use crate::query::formatters::{OutputFormat, format_largest_block};
use crate::repository::TransactionRepository;
use tracing::debug;

pub fn cmd_largest_block(
    transaction_repo: &TransactionRepository,
    config: &QueryConfig,
    format: &OutputFormat,
) -> CrawlerResult<()> {
    debug!(
        "Ranking blocks by {:?} between {} and {}",
        config.metric, config.window.from, config.window.to
    );

    let best = transaction_repo.largest_block(config.window, config.metric)?;
    let output = format_largest_block(best.as_ref(), config.metric, config.window, format);
    println!("{output}");

    Ok(())
}
