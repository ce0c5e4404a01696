//! Entry CRUD operations.
//!
//! Provides functions for writing, reading, counting, and pruning
//! cached response entries within a named store.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A cached response entry.
///
/// One row per (store, key) pair: the stored status, content type, headers,
/// and body bytes of a response, with the timestamp it was first written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub inserted_at: String,
}

impl CacheDb {
    /// Insert or update an entry in the named store.
    ///
    /// Uses UPSERT semantics. A refreshed entry keeps its original row id,
    /// so a stale-while-revalidate overwrite does not reset its age for
    /// insertion-order eviction.
    pub async fn put_entry(&self, store: &str, entry: &CacheEntry) -> Result<(), Error> {
        let store = store.to_string();
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                        store, key, method, url, status, content_type,
                        headers_json, body, inserted_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(store, key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        content_type = excluded.content_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body",
                    params![
                        &store,
                        &entry.key,
                        &entry.method,
                        &entry.url,
                        entry.status,
                        &entry.content_type,
                        &entry.headers_json,
                        &entry.body,
                        &entry.inserted_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry from the named store by key.
    ///
    /// Returns None if the key doesn't exist in that store.
    pub async fn get_entry(&self, store: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        let store = store.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, method, url, status, content_type, headers_json, body, inserted_at
                     FROM entries WHERE store = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![store, key], |row| {
                    Ok(CacheEntry {
                        key: row.get(0)?,
                        method: row.get(1)?,
                        url: row.get(2)?,
                        status: row.get::<_, i64>(3)? as u16,
                        content_type: row.get(4)?,
                        headers_json: row.get(5)?,
                        body: row.get(6)?,
                        inserted_at: row.get(7)?,
                    })
                });

                match result {
                    Ok(e) => Ok(Some(e)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Count the entries in the named store.
    pub async fn entry_count(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE store = ?1",
                    params![store],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// List the URLs of all entries in the named store, oldest first.
    pub async fn list_entry_urls(&self, store: &str) -> Result<Vec<String>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE store = ?1 ORDER BY id ASC")?;
                let urls = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Prune the named store oldest-first.
    ///
    /// If the store holds more than `max_entries`, deletes the oldest entries
    /// (by insertion order) down to `retain_entries`. Returns the number of
    /// deleted entries; zero when the store is within budget.
    pub async fn prune_oldest(&self, store: &str, max_entries: u64, retain_entries: u64) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE store = ?1",
                    params![store],
                    |row| row.get(0),
                )?;
                if count <= max_entries as i64 {
                    return Ok(0);
                }

                let to_delete = count - retain_entries as i64;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE id IN (
                        SELECT id FROM entries WHERE store = ?1 ORDER BY id ASC LIMIT ?2
                    )",
                    params![store, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
