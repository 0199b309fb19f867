use super::database::to_sql_int;
use super::models::{BlockVolume, TransactionRecord};
use crate::errors::CrawlerResult;
use crate::units::{eth_to_wei, wei_to_eth};
use alloy_primitives::{Address, B256, U256};
use rusqlite::{Row, params};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Inclusive range of block timestamps, in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: u64,
    pub to: u64,
}

impl TimeWindow {
    /// 2024-01-01 00:00:00 UTC
    pub const DEFAULT_FROM: u64 = 1_704_067_200;
    /// 2024-01-01 00:30:00 UTC
    pub const DEFAULT_TO: u64 = 1_704_069_000;
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow {
            from: Self::DEFAULT_FROM,
            to: Self::DEFAULT_TO,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RankingMetric {
    /// Sum of ether transferred in the block.
    #[default]
    Volume,
    /// Number of transactions in the block.
    TransactionCount,
}

pub struct TransactionRepository<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> TransactionRepository<'a> {
    const INSERT_TRANSACTION: &'static str = "INSERT OR IGNORE INTO transactions (
            hash, block_number, from_address, to_address, value_eth,
            gas, gas_price, nonce, block_timestamp
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

    const SELECT_WINDOW_VALUES: &'static str = "SELECT block_number, value_eth FROM transactions
         WHERE block_timestamp BETWEEN ?1 AND ?2
         ORDER BY block_number";

    const SELECT_BY_BLOCK: &'static str = "SELECT hash, block_number, from_address, to_address,
            value_eth, gas, gas_price, nonce, block_timestamp
         FROM transactions WHERE block_number = ?1 ORDER BY hash";

    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Returns the number of rows actually inserted; duplicates count as zero.
    pub fn insert_batch(&self, records: &[TransactionRecord]) -> CrawlerResult<usize> {
        let mut stmt = self.conn.prepare(Self::INSERT_TRANSACTION)?;
        let mut count = 0;

        for record in records {
            count += stmt.execute(params![
                format!("{:?}", record.hash),
                to_sql_int(record.block_number, "block_number")?,
                record.from_address.to_checksum(None),
                record.to_address.map(|to| to.to_checksum(None)),
                record.value_eth,
                to_sql_int(record.gas, "gas")?,
                to_sql_int(record.gas_price, "gas_price")?,
                to_sql_int(record.nonce, "nonce")?,
                to_sql_int(record.block_timestamp, "block_timestamp")?,
            ])?;
        }

        Ok(count)
    }

    pub fn get_block_transactions(&self, block_number: u64) -> CrawlerResult<Vec<TransactionRecord>> {
        let mut stmt = self.conn.prepare(Self::SELECT_BY_BLOCK)?;
        let records = stmt
            .query_map(
                params![to_sql_int(block_number, "block_number")?],
                Self::row_to_record,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Finds the block ranking highest by `metric` among rows inside `window`.
    ///
    /// Volumes are summed in wei so no precision is lost. Ties resolve to the
    /// lowest block number.
    pub fn largest_block(
        &self,
        window: TimeWindow,
        metric: RankingMetric,
    ) -> CrawlerResult<Option<BlockVolume>> {
        let mut stmt = self.conn.prepare(Self::SELECT_WINDOW_VALUES)?;
        let rows = stmt
            .query_map(
                params![
                    to_sql_int(window.from, "from")?,
                    to_sql_int(window.to, "to")?
                ],
                |row| Ok((Self::get_u64(row, 0)?, row.get::<_, String>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut per_block: BTreeMap<u64, (U256, u64)> = BTreeMap::new();
        for (block_number, value_eth) in rows {
            let entry = per_block.entry(block_number).or_insert((U256::ZERO, 0));
            entry.0 = entry.0.saturating_add(eth_to_wei(&value_eth)?);
            entry.1 += 1;
        }

        let mut best: Option<(u64, U256, u64)> = None;
        for (block_number, (volume, count)) in per_block {
            let better = match (&best, metric) {
                (None, _) => true,
                (Some((_, best_volume, _)), RankingMetric::Volume) => volume > *best_volume,
                (Some((_, _, best_count)), RankingMetric::TransactionCount) => count > *best_count,
            };
            if better {
                best = Some((block_number, volume, count));
            }
        }

        Ok(best.map(|(block_number, volume, count)| BlockVolume {
            block_number,
            total_volume_eth: wei_to_eth(volume),
            transaction_count: count,
        }))
    }

    fn row_to_record(row: &Row) -> rusqlite::Result<TransactionRecord> {
        let hash = row.get::<_, String>(0)?.parse::<B256>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let from_address = Address::from_str(&row.get::<_, String>(2)?).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let to_address = row
            .get::<_, Option<String>>(3)?
            .map(|to| Address::from_str(&to))
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
            })?;

        Ok(TransactionRecord {
            hash,
            block_number: Self::get_u64(row, 1)?,
            from_address,
            to_address,
            value_eth: row.get(4)?,
            gas: Self::get_u64(row, 5)?,
            gas_price: Self::get_u64(row, 6)?,
            nonce: Self::get_u64(row, 7)?,
            block_timestamp: Self::get_u64(row, 8)?,
        })
    }

    fn get_u64(row: &Row, idx: usize) -> rusqlite::Result<u64> {
        let value: i64 = row.get(idx)?;
        u64::try_from(value).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Integer, Box::new(e))
        })
    }
}
