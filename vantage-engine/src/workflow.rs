use crate::store::{checksum, verify_checksum, Store, StoreError};
use derive_more::Display;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic identifier for one durable workflow step: `H(symbol,
/// price_tick, sequence)` for grid actions, or `H(symbol, next_funding_time,
/// leg)` for arb legs. Stable across restarts so replay recognises the same
/// step rather than re-executing it.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Serialize, Deserialize)]
pub struct WorkflowId(pub String);

impl WorkflowId {
    pub fn derive(parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        Self(hex::encode(hasher.finalize()))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Pending,
    Success,
    Failed,
}

impl WorkflowStatus {
    fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "PENDING",
            WorkflowStatus::Success => "SUCCESS",
            WorkflowStatus::Failed => "FAILED",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "SUCCESS" => WorkflowStatus::Success,
            "FAILED" => WorkflowStatus::Failed,
            _ => WorkflowStatus::Pending,
        }
    }
}

/// A durable workflow step record: input/output/status committed
/// transactionally, so a crash between "placed the order" and "recorded the
/// result" is resolved on replay rather than silently duplicating the
/// side-effect.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStepRecord {
    pub workflow_id: WorkflowId,
    pub step_name: String,
    pub status: WorkflowStatus,
    pub input_hash: String,
    pub output_json: Option<String>,
    pub updated_at: i64,
}

/// Transactional store of [`WorkflowStepRecord`]s, backed by the same
/// [`Store`] as slots and the symbol registry.
///
/// Writes for a given `workflow_id` are naturally serialised by SQLite's
/// single-writer semantics; different `workflow_id`s still interleave
/// freely since each commit is a single short transaction.
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    store: Store,
}

impl WorkflowStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Look up a step's committed record, if any.
    pub fn get(&self, id: &WorkflowId) -> Result<Option<WorkflowStepRecord>, StoreError> {
        self.store.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT step_name, status, input_hash, output_blob, updated_at, checksum
                 FROM workflow_steps WHERE workflow_id = ?1",
                [&id.0],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            );

            match result {
                Ok((step_name, status, input_hash, output_json, updated_at, stored_checksum)) => {
                    let fields = [
                        id.0.as_str(),
                        step_name.as_str(),
                        status.as_str(),
                        input_hash.as_str(),
                        output_json.as_deref().unwrap_or(""),
                        &updated_at.to_string(),
                    ];
                    verify_checksum("workflow_steps", &id.0, &fields, &stored_checksum)?;
                    Ok(Some(WorkflowStepRecord {
                        workflow_id: id.clone(),
                        step_name,
                        status: WorkflowStatus::from_str(&status),
                        input_hash,
                        output_json,
                        updated_at,
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Whether this step already committed a successful result — replay must
    /// skip re-executing it.
    pub fn is_success(&self, id: &WorkflowId) -> Result<bool, StoreError> {
        Ok(matches!(self.get(id)?, Some(record) if record.status == WorkflowStatus::Success))
    }

    fn put(&self, record: &WorkflowStepRecord) -> Result<(), StoreError> {
        let updated_at_str = record.updated_at.to_string();
        let fields = [
            record.workflow_id.0.as_str(),
            record.step_name.as_str(),
            record.status.as_str(),
            record.input_hash.as_str(),
            record.output_json.as_deref().unwrap_or(""),
            updated_at_str.as_str(),
        ];
        let sum = checksum(&fields);

        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workflow_steps (workflow_id, step_name, status, input_hash, output_blob, updated_at, checksum)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(workflow_id) DO UPDATE SET
                    status = excluded.status, output_blob = excluded.output_blob,
                    updated_at = excluded.updated_at, checksum = excluded.checksum",
                rusqlite::params![
                    record.workflow_id.0,
                    record.step_name,
                    record.status.as_str(),
                    record.input_hash,
                    record.output_json,
                    record.updated_at,
                    sum,
                ],
            )?;
            Ok(())
        })
    }

    /// Begin a step as `PENDING` before the side-effect runs. On restart,
    /// any step left `PENDING` is retried by the caller.
    pub fn begin(&self, id: &WorkflowId, step_name: &str, input_hash: &str, now_ms: i64) -> Result<(), StoreError> {
        self.put(&WorkflowStepRecord {
            workflow_id: id.clone(),
            step_name: step_name.to_string(),
            status: WorkflowStatus::Pending,
            input_hash: input_hash.to_string(),
            output_json: None,
            updated_at: now_ms,
        })
    }

    /// Commit the step's outcome. Called exactly once per attempt that
    /// reaches a terminal result.
    pub fn complete<O: Serialize>(
        &self,
        id: &WorkflowId,
        step_name: &str,
        input_hash: &str,
        status: WorkflowStatus,
        output: &O,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let output_json = serde_json::to_string(output)?;
        self.put(&WorkflowStepRecord {
            workflow_id: id.clone(),
            step_name: step_name.to_string(),
            status,
            input_hash: input_hash.to_string(),
            output_json: Some(output_json),
            updated_at: now_ms,
        })
    }

    /// Decode a committed step's output, if present.
    pub fn decode_output<O: DeserializeOwned>(&self, record: &WorkflowStepRecord) -> Result<Option<O>, StoreError> {
        match &record.output_json {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_id_is_stable_for_the_same_inputs() {
        let a = WorkflowId::derive(&["BTCUSDT", "4000000", "0"]);
        let b = WorkflowId::derive(&["BTCUSDT", "4000000", "0"]);
        let c = WorkflowId::derive(&["BTCUSDT", "4000000", "1"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn success_step_is_not_replayed() {
        let store = WorkflowStore::new(Store::open_in_memory().unwrap());
        let id = WorkflowId::derive(&["BTCUSDT", "1"]);
        assert!(!store.is_success(&id).unwrap());

        store.begin(&id, "place_order", "hash", 1).unwrap();
        assert!(!store.is_success(&id).unwrap());

        store.complete(&id, "place_order", "hash", WorkflowStatus::Success, &"order-1", 2).unwrap();
        assert!(store.is_success(&id).unwrap());

        let record = store.get(&id).unwrap().unwrap();
        let output: String = store.decode_output(&record).unwrap().unwrap();
        assert_eq!(output, "order-1");
    }

    #[test]
    fn pending_step_is_retried_until_it_resolves() {
        let store = WorkflowStore::new(Store::open_in_memory().unwrap());
        let id = WorkflowId::derive(&["BTCUSDT", "2"]);
        store.begin(&id, "place_order", "hash", 1).unwrap();
        let record = store.get(&id).unwrap().unwrap();
        assert_eq!(record.status, WorkflowStatus::Pending);
        assert!(!store.is_success(&id).unwrap());
    }
}
