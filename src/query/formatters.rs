use crate::repository::{BlockVolume, RankingMetric, TimeWindow};
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;
use serde_json::json;

const NO_RESULTS: &str = "No transactions found in the specified time frame.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Table,
    Json,
    Csv,
}

pub fn format_largest_block(
    best: Option<&BlockVolume>,
    metric: RankingMetric,
    window: TimeWindow,
    format: &OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => format_text(best, metric),
        OutputFormat::Table => format_table(best),
        OutputFormat::Json => format_json(best, window),
        OutputFormat::Csv => format_csv(best),
    }
}

fn format_text(best: Option<&BlockVolume>, metric: RankingMetric) -> String {
    let Some(best) = best else {
        return NO_RESULTS.to_string();
    };

    match metric {
        RankingMetric::Volume => format!(
            "Block with Largest Volume: {}, Total Volume Transferred: {} Ether",
            best.block_number, best.total_volume_eth
        ),
        RankingMetric::TransactionCount => format!(
            "Block with Most Transactions: {}, Transaction Count: {}, Total Volume Transferred: {} Ether",
            best.block_number, best.transaction_count, best.total_volume_eth
        ),
    }
}

fn format_table(best: Option<&BlockVolume>) -> String {
    let Some(best) = best else {
        return NO_RESULTS.to_string();
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Block", "Total Volume (Ether)", "Transactions"]);
    table.add_row(vec![
        Cell::new(best.block_number),
        Cell::new(&best.total_volume_eth),
        Cell::new(best.transaction_count),
    ]);

    table.to_string()
}

fn format_json(best: Option<&BlockVolume>, window: TimeWindow) -> String {
    serde_json::to_string_pretty(&json!({
        "window": { "from": window.from, "to": window.to },
        "block": best,
    }))
    .unwrap_or_else(|_| "{}".to_string())
}

fn format_csv(best: Option<&BlockVolume>) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record(["block_number", "total_volume_eth", "transaction_count"]);
    if let Some(best) = best {
        let _ = wtr.write_record([
            &best.block_number.to_string(),
            &best.total_volume_eth,
            &best.transaction_count.to_string(),
        ]);
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}
