//! Append-only SQLite storage for rich list snapshots.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::model::{format_timestamp, parse_timestamp, SnapshotRow};
use crate::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bitcoin_rich_list (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp   TEXT NOT NULL,
    rank        INTEGER NOT NULL,
    address     TEXT NOT NULL,
    balance     TEXT NOT NULL,
    btc_amount  REAL,
    usd_amount  REAL,
    ins         INTEGER,
    outs        INTEGER,
    wallet_name TEXT
);
CREATE INDEX IF NOT EXISTS bitcoin_rich_list_timestamp ON bitcoin_rich_list (timestamp);
";

/// Read side of the snapshot table, the only part the report needs.
pub trait SnapshotSource {
    /// All rows captured at `timestamp`, rank ascending.
    fn select_rows(&self, timestamp: &NaiveDateTime) -> Result<Vec<SnapshotRow>>;
    /// Every capture instant present, ascending.
    fn select_distinct_timestamps(&self) -> Result<Vec<NaiveDateTime>>;
}

pub struct SqliteStore {
    conn: Connection,
}

/// One store shared by the ingestion task and the HTTP handlers.
///
/// rusqlite calls block, so every access goes through [`SharedStore::run`],
/// which holds the lock on tokio's blocking pool instead of an async worker.
#[derive(Clone)]
pub struct SharedStore(Arc<Mutex<SqliteStore>>);

impl SharedStore {
    pub fn new(store: SqliteStore) -> Self {
        SharedStore(Arc::new(Mutex::new(store)))
    }

    /// Runs `job` with exclusive access to the store and hands back its result.
    pub async fn run<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.0.clone();
        tokio::task::spawn_blocking(move || {
            let mut store = inner.lock().map_err(|_| Error::StorePoisoned)?;
            job(&mut store)
        })
        .await?
    }
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore { conn })
    }

    /// Appends one snapshot. All rows land in a single transaction, so a reader
    /// never sees part of a capture. Returns the number of rows written.
    pub fn insert_snapshot(&mut self, rows: &[SnapshotRow]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO bitcoin_rich_list
                    (timestamp, rank, address, balance, btc_amount, usd_amount, ins, outs, wallet_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for row in rows {
                stmt.execute(params![
                    format_timestamp(&row.timestamp),
                    row.rank,
                    row.address,
                    row.balance,
                    row.btc_amount,
                    row.usd_amount,
                    row.ins,
                    row.outs,
                    row.wallet_name,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn has_snapshot(&self, timestamp: &NaiveDateTime) -> Result<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM bitcoin_rich_list WHERE timestamp = ?1)",
            [format_timestamp(timestamp)],
            |r| r.get(0),
        )?;
        Ok(found != 0)
    }

    pub fn row_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM bitcoin_rich_list", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

impl SnapshotSource for SqliteStore {
    fn select_rows(&self, timestamp: &NaiveDateTime) -> Result<Vec<SnapshotRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT rank, address, balance, btc_amount, usd_amount, ins, outs, wallet_name
             FROM bitcoin_rich_list
             WHERE timestamp = ?1
             ORDER BY rank",
        )?;
        let rows = stmt
            .query_map([format_timestamp(timestamp)], |r| {
                Ok(SnapshotRow {
                    timestamp: *timestamp,
                    rank: r.get(0)?,
                    address: r.get(1)?,
                    balance: r.get(2)?,
                    btc_amount: r.get(3)?,
                    usd_amount: r.get(4)?,
                    ins: r.get(5)?,
                    outs: r.get(6)?,
                    wallet_name: r.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn select_distinct_timestamps(&self) -> Result<Vec<NaiveDateTime>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT DISTINCT timestamp FROM bitcoin_rich_list ORDER BY timestamp")?;
        let raw = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.iter().map(|s| parse_timestamp(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap()
    }

    fn row(timestamp: NaiveDateTime, rank: i64, address: &str) -> SnapshotRow {
        SnapshotRow {
            timestamp,
            rank,
            address: address.to_string(),
            balance: "1,000 BTC ($60,000,000)".to_string(),
            btc_amount: Some(1000.0),
            usd_amount: Some(60_000_000.0),
            ins: Some(rank * 10),
            outs: None,
            wallet_name: (rank == 1).then(|| "Binance-coldwallet".to_string()),
        }
    }

    #[test]
    fn rows_come_back_rank_ordered() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let ts = t0();
        let written = store
            .insert_snapshot(&[row(ts, 3, "c"), row(ts, 1, "a"), row(ts, 2, "b")])
            .unwrap();
        assert_eq!(written, 3);

        let rows = store.select_rows(&ts).unwrap();
        let addresses: Vec<&str> = rows.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["a", "b", "c"]);
        assert_eq!(rows[0], row(ts, 1, "a"));
        assert_eq!(rows[1].outs, None);
    }

    #[test]
    fn distinct_timestamps_are_ascending() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let later = t0() + Duration::hours(3);
        store.insert_snapshot(&[row(later, 1, "a")]).unwrap();
        store
            .insert_snapshot(&[row(t0(), 1, "a"), row(t0(), 2, "b")])
            .unwrap();

        assert_eq!(store.select_distinct_timestamps().unwrap(), vec![t0(), later]);
        assert_eq!(store.row_count().unwrap(), 3);
        assert!(store.has_snapshot(&later).unwrap());
        let missing = t0() + Duration::hours(1);
        assert!(!store.has_snapshot(&missing).unwrap());
        assert!(store.select_rows(&missing).unwrap().is_empty());
    }

    #[test]
    fn unreadable_stored_timestamp_is_reported() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO bitcoin_rich_list (timestamp, rank, address, balance) VALUES ('not a time', 1, 'a', '')",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.select_distinct_timestamps(),
            Err(Error::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn reopening_a_file_keeps_the_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rich.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.insert_snapshot(&[row(t0(), 1, "a")]).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.select_rows(&t0()).unwrap().len(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn shared_store_works_off_the_runtime_thread() {
        let shared = SharedStore::new(SqliteStore::open_in_memory().unwrap());
        let runtime_thread = std::thread::current().id();

        let (thread, written) = shared
            .run(|store| {
                let written = store.insert_snapshot(&[row(t0(), 1, "a")])?;
                Ok((std::thread::current().id(), written))
            })
            .await
            .unwrap();
        assert_ne!(thread, runtime_thread);
        assert_eq!(written, 1);

        let count = shared.run(|store| store.row_count()).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn poisoned_lock_is_an_error() {
        let shared = SharedStore::new(SqliteStore::open_in_memory().unwrap());
        let inner = shared.0.clone();
        let _ = std::thread::spawn(move || {
            let _guard = inner.lock().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(
            shared.run(|store| store.row_count()).await,
            Err(Error::StorePoisoned)
        ));
    }
}
