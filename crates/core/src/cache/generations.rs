//! Cache generation bookkeeping.
//!
//! A generation is the version-scoped namespace entries live in. Deleting a
//! generation cascades to its entries.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// A stored cache generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Generation {
    pub name: String,
    pub created_at: String,
    /// Set once the generation has been promoted to active.
    pub activated_at: Option<String>,
}

impl CacheDb {
    /// Create a generation, or leave an existing one untouched.
    pub async fn create_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List all generations, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<Generation>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Generation>, Error> {
                let mut stmt =
                    conn.prepare("SELECT name, created_at, activated_at FROM generations ORDER BY created_at, name")?;
                let rows = stmt.query_map([], |row| {
                    Ok(Generation { name: row.get(0)?, created_at: row.get(1)?, activated_at: row.get(2)? })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every entry in it.
    ///
    /// Returns false if no generation had that name.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Stamp a generation as active.
    ///
    /// Returns `Error::CacheMiss` if the generation was never created.
    pub async fn activate_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let count =
                    conn.execute("UPDATE generations SET activated_at = ?2 WHERE name = ?1", params![name, now])?;
                if count == 0 {
                    return Err(Error::CacheMiss(format!("generation {name}")));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
