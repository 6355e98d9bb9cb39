//! Key-value persistence over SQLite.
//!
//! Three logical buckets (global list, per-patient indexes, quarantine)
//! are stored as JSON arrays under stable string keys. There is no schema
//! versioning — a recognized migration risk carried over from the layout
//! this store preserves. Reads and writes of a bucket are not transactional
//! with each other: single-writer access is assumed.

use std::path::Path;

use rusqlite::{params, Connection};

use super::{map_sqlite_error, StoreError};

/// Open (or create) the archive store at the given path.
pub fn open_store(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// In-memory store for tests.
pub fn open_memory_store() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .map_err(map_sqlite_error)?;
    Ok(())
}

/// Read the raw JSON value under a key.
pub fn kv_get(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT value FROM kv_store WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write (insert or replace) the JSON value under a key.
pub fn kv_put(conn: &Connection, key: &str, value: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )
    .map_err(map_sqlite_error)?;
    Ok(())
}

pub fn kv_delete(conn: &Connection, key: &str) -> Result<(), StoreError> {
    conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
        .map_err(map_sqlite_error)?;
    Ok(())
}
