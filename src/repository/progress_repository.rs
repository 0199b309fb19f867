use rusqlite::params;

use super::database::to_sql_int;
use crate::errors::{CrawlerError, CrawlerResult};
use crate::validation::BlockRange;

/// Records which blocks have been committed, one row per block.
pub struct ProgressRepository<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> ProgressRepository<'a> {
    const MARK_INGESTED: &'static str =
        "INSERT OR IGNORE INTO ingested_blocks (block_number) VALUES (?1)";

    const SELECT_INGESTED_IN_RANGE: &'static str = "SELECT block_number FROM ingested_blocks
         WHERE block_number BETWEEN ?1 AND ?2
         ORDER BY block_number";

    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn mark_ingested(&self, block_number: u64) -> CrawlerResult<()> {
        let block = to_sql_int(block_number, "block_number")?;
        self.conn.execute(Self::MARK_INGESTED, params![block])?;
        Ok(())
    }

    /// Committed blocks inside `range`, ascending.
    pub fn ingested_in(&self, range: BlockRange) -> CrawlerResult<Vec<u64>> {
        let mut stmt = self.conn.prepare(Self::SELECT_INGESTED_IN_RANGE)?;
        let blocks = stmt
            .query_map(
                params![
                    to_sql_int(range.start, "block_number")?,
                    to_sql_int(range.end, "block_number")?
                ],
                |row| row.get::<_, i64>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        blocks
            .into_iter()
            .map(|b| {
                u64::try_from(b)
                    .map_err(|_| CrawlerError::Storage(format!("negative block number: {b}")))
            })
            .collect()
    }

    /// Lowest block of `range` with no committed row, or `None` when every
    /// block in it is stored.
    pub fn first_missing_in(&self, range: BlockRange) -> CrawlerResult<Option<u64>> {
        let ingested = self.ingested_in(range)?;
        let mut expected = range.blocks();

        for stored in ingested {
            match expected.next() {
                Some(block) if block == stored => {}
                missing => return Ok(missing),
            }
        }
        Ok(expected.next())
    }
}
