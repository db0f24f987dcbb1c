//! SQLite-backed record store.
//!
//! All statements run on tokio-rusqlite's single background thread, so writes
//! for a name are serialized and the `UNIQUE(name)` constraint is the only
//! synchronization the resolver needs.

use crate::domain::model::ExpiryRecord;
use crate::domain::ports::RecordStore;
use crate::utils::error::{Result, TrackerError};
use chrono::NaiveDate;
use rusqlite::OptionalExtension;
use std::path::Path;
use tokio_rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    expiry_info TEXT NOT NULL,
    expiry_days INTEGER,
    expiry_date TEXT,
    created_on TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_products_expiry_date ON products (expiry_date);
";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .await
            .map_err(TrackerError::storage)?;
        Self::with_connection(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(TrackerError::storage)?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self> {
        conn.call(|conn| -> rusqlite::Result<()> { conn.execute_batch(SCHEMA) })
        .await
        .map_err(TrackerError::storage)?;

        tracing::debug!("Record store schema ready");
        Ok(Self { conn })
    }

    /// Number of stored rows for `name`; used to check the uniqueness invariant.
    pub async fn count_named(&self, name: &str) -> Result<i64> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> rusqlite::Result<i64> {
                conn.query_row(
                    "SELECT COUNT(*) FROM products WHERE name = ?1",
                    rusqlite::params![name],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(TrackerError::storage)
    }
}

fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExpiryRecord> {
    let expiry_date: Option<String> = row.get(3)?;
    let created_on: String = row.get(4)?;

    Ok(ExpiryRecord {
        name: row.get(0)?,
        expiry_info: row.get(1)?,
        expiry_days: row.get(2)?,
        expiry_date: expiry_date.as_deref().map(|d| parse_date(3, d)).transpose()?,
        created_on: parse_date(4, &created_on)?,
    })
}

impl RecordStore for SqliteRecordStore {
    async fn get(&self, name: &str) -> Result<Option<ExpiryRecord>> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> rusqlite::Result<Option<ExpiryRecord>> {
                let mut stmt = conn.prepare(
                    "SELECT name, expiry_info, expiry_days, expiry_date, created_on \
                     FROM products WHERE name = ?1",
                )?;
                stmt.query_row(rusqlite::params![name], row_to_record)
                    .optional()
            })
            .await
            .map_err(TrackerError::storage)
    }

    async fn put(&self, record: &ExpiryRecord) -> Result<()> {
        let name = record.name.clone();
        let expiry_info = record.expiry_info.clone();
        let expiry_days = record.expiry_days;
        let expiry_date = record
            .expiry_date
            .map(|d| d.format(DATE_FORMAT).to_string());
        let created_on = record.created_on.format(DATE_FORMAT).to_string();

        let inserted = {
            let name = name.clone();
            self.conn
                .call(move |conn| -> rusqlite::Result<usize> {
                    conn.execute(
                        "INSERT INTO products (name, expiry_info, expiry_days, expiry_date, created_on) \
                         VALUES (?1, ?2, ?3, ?4, ?5) \
                         ON CONFLICT(name) DO NOTHING",
                        rusqlite::params![name, expiry_info, expiry_days, expiry_date, created_on],
                    )
                })
                .await
                .map_err(TrackerError::storage)?
        };

        if inserted == 0 {
            return Err(TrackerError::DuplicateKey { name });
        }

        tracing::debug!("Stored expiry record for {}", name);
        Ok(())
    }

    async fn query_by_expiry_date(&self, date: NaiveDate) -> Result<Vec<ExpiryRecord>> {
        let date = date.format(DATE_FORMAT).to_string();
        self.conn
            .call(move |conn| -> rusqlite::Result<Vec<ExpiryRecord>> {
                let mut stmt = conn.prepare(
                    "SELECT name, expiry_info, expiry_days, expiry_date, created_on \
                     FROM products WHERE expiry_date = ?1 ORDER BY name",
                )?;
                let records = stmt
                    .query_map(rusqlite::params![date], row_to_record)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await
            .map_err(TrackerError::storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let store = SqliteRecordStore::open_in_memory().await.unwrap();
        let record = ExpiryRecord::new("Milk", "7", Some(7), day(2024, 5, 1));

        store.put(&record).await.unwrap();

        let loaded = store.get("Milk").await.unwrap();
        assert_eq!(loaded, Some(record));
        assert_eq!(store.get("milk").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_second_put_is_duplicate_key() {
        let store = SqliteRecordStore::open_in_memory().await.unwrap();
        let first = ExpiryRecord::new("Milk", "7", Some(7), day(2024, 5, 1));
        let second = ExpiryRecord::new("Milk", "10", Some(10), day(2024, 5, 1));

        store.put(&first).await.unwrap();
        let err = store.put(&second).await.unwrap_err();

        assert!(matches!(err, TrackerError::DuplicateKey { ref name } if name == "Milk"));
        assert_eq!(store.count_named("Milk").await.unwrap(), 1);
        assert_eq!(store.get("Milk").await.unwrap().unwrap().expiry_info, "7");
    }

    #[tokio::test]
    async fn test_record_without_date_round_trips() {
        let store = SqliteRecordStore::open_in_memory().await.unwrap();
        let record = ExpiryRecord::new("Salt", "indefinitely", None, day(2024, 5, 1));

        store.put(&record).await.unwrap();

        let loaded = store.get("Salt").await.unwrap().unwrap();
        assert_eq!(loaded.expiry_days, None);
        assert_eq!(loaded.expiry_date, None);
    }

    #[tokio::test]
    async fn test_query_by_expiry_date() {
        let store = SqliteRecordStore::open_in_memory().await.unwrap();
        let today = day(2024, 5, 1);
        store
            .put(&ExpiryRecord::new("Eggs", "1", Some(1), today))
            .await
            .unwrap();
        store
            .put(&ExpiryRecord::new("Rice", "10", Some(10), today))
            .await
            .unwrap();
        store
            .put(&ExpiryRecord::new("Salt", "forever", None, today))
            .await
            .unwrap();

        let due = store.query_by_expiry_date(day(2024, 5, 2)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].name, "Eggs");

        assert!(store
            .query_by_expiry_date(day(2024, 6, 1))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("expiry.db");

        {
            let store = SqliteRecordStore::open(&path).await.unwrap();
            store
                .put(&ExpiryRecord::new("Bread", "5", Some(5), day(2024, 5, 1)))
                .await
                .unwrap();
        }

        let reopened = SqliteRecordStore::open(&path).await.unwrap();
        assert!(reopened.get("Bread").await.unwrap().is_some());
    }
}
