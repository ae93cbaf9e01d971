use parking_lot::Mutex;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the durable store. Every mutation is deterministic
/// errors (schema/serialisation bugs) except [`StoreError::Sqlite`], which
/// wraps the venue-independent failure modes SQLite itself can hit (disk
/// full, lock contention past the busy timeout).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialise: {0}")]
    Serialise(#[from] serde_json::Error),

    #[error("checksum mismatch reading {table}({key}): stored state may be corrupt")]
    ChecksumMismatch { table: &'static str, key: String },
}

/// A WAL-journaled key/value store shared by the symbol registry, slot
/// table and workflow-step log.
///
/// Grounded on the other_examples pack's `rusqlite`-backed recorders
/// (`Connection::open` + `params!` + `OptionalExtension`): a single
/// connection behind a mutex gives the exactly-once durability contract the
/// spec asks for "for free" from SQLite's own single-writer semantics, while
/// `PRAGMA journal_mode=WAL` lets concurrent readers (e.g. a monitoring
/// snapshot reader) proceed without blocking on an in-flight writer.
#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS symbol_registry (
                symbol TEXT PRIMARY KEY,
                venue TEXT NOT NULL,
                strategy_config TEXT NOT NULL,
                risk_config TEXT NOT NULL,
                status TEXT NOT NULL,
                checksum TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS slots (
                symbol TEXT NOT NULL,
                slot_id INTEGER NOT NULL,
                side TEXT NOT NULL,
                price TEXT NOT NULL,
                qty TEXT NOT NULL,
                state TEXT NOT NULL,
                order_id TEXT,
                client_order_id TEXT,
                executed_qty TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                checksum TEXT NOT NULL,
                PRIMARY KEY (symbol, slot_id)
            );
            CREATE TABLE IF NOT EXISTS workflow_steps (
                workflow_id TEXT PRIMARY KEY,
                step_name TEXT NOT NULL,
                status TEXT NOT NULL,
                input_hash TEXT NOT NULL,
                output_blob TEXT,
                updated_at INTEGER NOT NULL,
                checksum TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS grid_state (
                symbol TEXT PRIMARY KEY,
                anchor_price TEXT NOT NULL,
                last_price TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;

        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

/// Digest a commit's canonical field tuple into a hex checksum stored
/// alongside the row. Verified on read so a torn or tampered row is caught
/// rather than silently trusted.
pub(crate) fn checksum(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update([0u8]); // field separator, avoids "ab"+"c" colliding with "a"+"bc"
    }
    hex::encode(hasher.finalize())
}

pub(crate) fn verify_checksum(
    table: &'static str,
    key: &str,
    fields: &[&str],
    expected: &str,
) -> Result<(), StoreError> {
    if checksum(fields) == expected {
        Ok(())
    } else {
        Err(StoreError::ChecksumMismatch { table, key: key.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_stable_and_order_sensitive() {
        let a = checksum(&["x", "y"]);
        let b = checksum(&["x", "y"]);
        let c = checksum(&["y", "x"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn opening_an_in_memory_store_creates_the_schema() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.prepare("SELECT symbol FROM symbol_registry")?;
                conn.prepare("SELECT workflow_id FROM workflow_steps")?;
                conn.prepare("SELECT symbol, slot_id FROM slots")?;
                Ok(())
            })
            .unwrap();
    }
}
