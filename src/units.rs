//! Exact conversion between wei and ether decimal strings.

use crate::errors::{CrawlerError, CrawlerResult};
use alloy_primitives::U256;
use alloy_primitives::utils::{format_units, parse_units};

pub const ETHER_DECIMALS: u8 = 18;

/// Renders a wei amount as whole ether with no trailing fractional zeros.
pub fn wei_to_eth(wei: U256) -> String {
    let formatted = format_units(wei, ETHER_DECIMALS).unwrap_or_else(|_| wei.to_string());
    match formatted.split_once('.') {
        Some((whole, fraction)) => match fraction.trim_end_matches('0') {
            "" => whole.to_string(),
            fraction => format!("{whole}.{fraction}"),
        },
        None => formatted,
    }
}

/// Parses a decimal ether string back into wei.
///
/// Only unsigned plain decimals with at most 18 fractional digits are accepted.
pub fn eth_to_wei(eth: &str) -> CrawlerResult<U256> {
    let invalid = || CrawlerError::Storage(format!("Invalid ether amount in database: {eth}"));

    let (whole, fraction) = eth.split_once('.').unwrap_or((eth, ""));
    if whole.is_empty()
        || fraction.len() > usize::from(ETHER_DECIMALS)
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    parse_units(eth, ETHER_DECIMALS)
        .map(|units| units.get_absolute())
        .map_err(|_| invalid())
}
