//! Cache entry CRUD operations.
//!
//! An entry is an immutable snapshot of a successful response, addressed by
//! `(generation, request key)`. Writing the same key again overwrites it.

use super::connection::CacheDb;
use super::hash::RequestKey;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub key: RequestKey,
    pub status_code: u16,
    /// Header name/value pairs in the order they were received.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedResponse {
    /// Capture a response for storage, stamping it with the current time.
    pub fn capture(key: RequestKey, status_code: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self { key, status_code, headers, body, stored_at: chrono::Utc::now().to_rfc3339() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Listing view of an entry, without its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntryMeta {
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub body_len: u64,
    pub stored_at: String,
}

impl CacheDb {
    /// Insert or overwrite an entry in a generation.
    ///
    /// The generation must already exist; only `create_generation` makes one.
    /// A write into a deleted generation fails with `Error::GenerationRetired`
    /// and leaves the store untouched. Rejects non-2xx responses with
    /// `Error::Uncacheable`.
    pub async fn put_entry(&self, generation: &str, entry: &CachedResponse) -> Result<(), Error> {
        if !entry.is_success() {
            return Err(Error::Uncacheable(entry.status_code));
        }

        let headers_json = serde_json::to_string(&entry.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let generation = generation.to_string();
        let entry = entry.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![&generation],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::GenerationRetired(generation));
                }
                conn.execute(
                    "INSERT INTO entries (
                    generation, key_hash, method, url, status_code, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(generation, key_hash) DO UPDATE SET
                    method = excluded.method,
                    url = excluded.url,
                    status_code = excluded.status_code,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &generation,
                        &entry.key.hash,
                        &entry.key.method,
                        &entry.key.url,
                        entry.status_code as i64,
                        &headers_json,
                        &entry.body,
                        &entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by request key.
    ///
    /// Returns None if the generation holds no entry for the key.
    pub async fn get_entry(&self, generation: &str, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        let generation = generation.to_string();
        let hash = key.hash.clone();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, status_code, headers_json, body, stored_at
                FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![generation, hash], |row| {
                    Ok((
                        RequestKey { hash: row.get(0)?, method: row.get(1)?, url: row.get(2)? },
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                match result {
                    Ok((key, status_code, headers_json, body, stored_at)) => {
                        let headers: Vec<(String, String)> =
                            serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
                        let status_code =
                            u16::try_from(status_code).map_err(|e| Error::CorruptEntry(e.to_string()))?;
                        Ok(Some(CachedResponse { key, status_code, headers, body, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List the entries of a generation, oldest first.
    pub async fn list_entries(&self, generation: &str) -> Result<Vec<EntryMeta>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status_code, length(body), stored_at
                FROM entries WHERE generation = ?1 ORDER BY stored_at, url",
                )?;
                let rows = stmt.query_map(params![generation], |row| {
                    Ok(EntryMeta {
                        method: row.get(0)?,
                        url: row.get(1)?,
                        status_code: row.get::<_, i64>(2)? as u16,
                        body_len: row.get::<_, i64>(3)? as u64,
                        stored_at: row.get(4)?,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)
    }

    /// Count entries across all generations.
    pub async fn count_entries(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
