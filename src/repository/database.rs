use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::debug;

use super::models::TransactionRecord;
use super::progress_repository::ProgressRepository;
use super::transaction_repository::TransactionRepository;
use crate::errors::{CrawlerError, CrawlerResult};
use crate::validation::BlockRange;

const SCHEMA: &str = include_str!("../../schema/create_db.sql");

/// Exclusive owner of the SQLite store for one run.
///
/// The connection is released by [`Database::close`] or, on any other exit path,
/// when the value is dropped.
pub struct Database {
    pub conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the store and applies the schema.
    pub fn open(db_path: impl AsRef<Path>) -> CrawlerResult<Self> {
        let path = db_path.as_ref();
        let init_err = |reason: String| CrawlerError::StorageInit {
            path: path.display().to_string(),
            reason,
        };

        let conn = Connection::open(path).map_err(|e| init_err(e.to_string()))?;
        let db = Database { conn };
        db.create_tables().map_err(|e| init_err(e.to_string()))?;
        debug!("Store ready at {}", path.display());
        Ok(db)
    }

    /// Opens an existing store without creating or altering it.
    pub fn open_read_only(db_path: impl AsRef<Path>) -> CrawlerResult<Self> {
        let path = db_path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| CrawlerError::StorageInit {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Database { conn })
    }

    pub fn in_memory() -> CrawlerResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(SCHEMA)
    }

    /// Inserts all records in one transaction, skipping hashes already stored.
    ///
    /// Returns the number of newly inserted rows. On error nothing from this
    /// call is visible.
    pub fn insert_many(&self, records: &[TransactionRecord]) -> CrawlerResult<usize> {
        self.persist(records, None)
    }

    /// Persists one block's records and marks the block as ingested, in one
    /// transaction.
    pub fn commit_block(
        &self,
        block_number: u64,
        records: &[TransactionRecord],
    ) -> CrawlerResult<usize> {
        self.persist(records, Some(block_number))
    }

    fn persist(
        &self,
        records: &[TransactionRecord],
        block_number: Option<u64>,
    ) -> CrawlerResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let inserted = TransactionRepository::new(&tx).insert_batch(records)?;
        if let Some(block_number) = block_number {
            ProgressRepository::new(&tx).mark_ingested(block_number)?;
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn ingested_blocks(&self, range: BlockRange) -> CrawlerResult<Vec<u64>> {
        ProgressRepository::new(&self.conn).ingested_in(range)
    }

    pub fn first_missing_block(&self, range: BlockRange) -> CrawlerResult<Option<u64>> {
        ProgressRepository::new(&self.conn).first_missing_in(range)
    }

    pub fn close(self) -> CrawlerResult<()> {
        self.conn
            .close()
            .map_err(|(_, e)| CrawlerError::Storage(e.to_string()))
    }

    /// Closes the store once `result` is known. An error in `result` wins over
    /// a failure to close.
    pub fn close_with<T>(self, result: CrawlerResult<T>) -> CrawlerResult<T> {
        let closed = self.close();
        let value = result?;
        closed?;
        Ok(value)
    }
}

/// SQLite integers are signed 64-bit.
pub(crate) fn to_sql_int(value: u64, column: &str) -> CrawlerResult<i64> {
    i64::try_from(value)
        .map_err(|_| CrawlerError::Storage(format!("{column} value {value} exceeds INTEGER range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256};

    fn record(hash_byte: u8, block_number: u64) -> TransactionRecord {
        TransactionRecord {
            hash: B256::repeat_byte(hash_byte),
            block_number,
            from_address: Address::repeat_byte(0x01),
            to_address: Some(Address::repeat_byte(0x02)),
            value_eth: "1".to_string(),
            gas: 21_000,
            gas_price: 30_000_000_000,
            nonce: 0,
            block_timestamp: 1_704_067_200,
        }
    }

    fn row_count(db: &Database) -> i64 {
        db.conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_insert_many_skips_existing_hashes() {
        let db = Database::in_memory().unwrap();

        let first = db.insert_many(&[record(0x10, 5), record(0x11, 5)]).unwrap();
        assert_eq!(first, 2);

        let replay = db.insert_many(&[record(0x10, 5), record(0x11, 5)]).unwrap();
        assert_eq!(replay, 0);

        let mixed = db.insert_many(&[record(0x11, 5), record(0x12, 5)]).unwrap();
        assert_eq!(mixed, 1);
        assert_eq!(row_count(&db), 3);
    }

    #[test]
    fn test_failed_batch_leaves_no_rows() {
        let db = Database::in_memory().unwrap();

        let mut bad = record(0x22, 7);
        bad.gas = u64::MAX;
        let result = db.insert_many(&[record(0x20, 7), record(0x21, 7), bad]);

        assert!(result.is_err());
        assert_eq!(row_count(&db), 0);
    }

    #[test]
    fn test_commit_block_marks_block_atomically() {
        let db = Database::in_memory().unwrap();
        let all = BlockRange::new(0, 100).unwrap();

        db.commit_block(7, &[record(0x30, 7)]).unwrap();
        assert_eq!(db.ingested_blocks(all).unwrap(), vec![7]);

        let mut bad = record(0x32, 8);
        bad.nonce = u64::MAX;
        assert!(db.commit_block(8, &[record(0x31, 8), bad]).is_err());
        assert_eq!(db.ingested_blocks(all).unwrap(), vec![7]);
        assert_eq!(row_count(&db), 1);

        db.commit_block(9, &[]).unwrap();
        assert_eq!(db.ingested_blocks(all).unwrap(), vec![7, 9]);
        assert_eq!(db.first_missing_block(BlockRange::new(7, 9).unwrap()).unwrap(), Some(8));
    }

    #[test]
    fn test_insert_many_does_not_mark_blocks() {
        let db = Database::in_memory().unwrap();
        db.insert_many(&[record(0x50, 3)]).unwrap();

        assert_eq!(row_count(&db), 1);
        assert!(db.ingested_blocks(BlockRange::new(0, 10).unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.db");

        {
            let db = Database::open(&path).unwrap();
            db.commit_block(1, &[record(0x40, 1)]).unwrap();
            db.close().unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(row_count(&db), 1);
        assert_eq!(db.ingested_blocks(BlockRange::new(0, 5).unwrap()).unwrap(), vec![1]);
    }

    #[test]
    fn test_close_with_keeps_the_run_error() {
        let db = Database::in_memory().unwrap();
        let err = db
            .close_with::<()>(Err(CrawlerError::Connectivity("http://x".to_string())))
            .unwrap_err();
        assert!(matches!(err, CrawlerError::Connectivity(_)));

        let db = Database::in_memory().unwrap();
        assert_eq!(db.close_with(Ok(3)).unwrap(), 3);
    }

    #[test]
    fn test_open_fails_for_unusable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("crawl.db");
        assert!(matches!(
            Database::open(&path),
            Err(CrawlerError::StorageInit { .. })
        ));
    }

    #[test]
    fn test_read_only_open_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Database::open_read_only(dir.path().join("absent.db")).is_err());
    }
}
