//! In-process record store
//!
//! Backs ephemeral sessions and tests. Nothing survives the process.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{VaultError, VaultResult};

use super::{validate_record_id, PersistentStore, RecordKind, ScannedRecord, StoredRecord};

/// Store keeping every record in a map per kind
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<RecordKind, BTreeMap<String, serde_json::Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count records of one kind
    pub fn count(&self, kind: RecordKind) -> VaultResult<usize> {
        let data = self
            .data
            .read()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(data.get(&kind).map_or(0, BTreeMap::len))
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get_all(&self, kind: RecordKind) -> VaultResult<Vec<ScannedRecord>> {
        let data = self
            .data
            .read()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data
            .get(&kind)
            .map(|records| {
                records
                    .iter()
                    .map(|(id, document)| {
                        ScannedRecord::from(StoredRecord::new(id.clone(), document.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, kind: RecordKind, id: &str) -> VaultResult<Option<StoredRecord>> {
        let data = self
            .data
            .read()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data
            .get(&kind)
            .and_then(|records| records.get(id))
            .map(|document| StoredRecord::new(id, document.clone())))
    }

    async fn put(&self, kind: RecordKind, record: StoredRecord) -> VaultResult<()> {
        validate_record_id(&record.id)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        data.entry(kind)
            .or_default()
            .insert(record.id, record.document);
        Ok(())
    }

    async fn delete(&self, kind: RecordKind, id: &str) -> VaultResult<bool> {
        let mut data = self
            .data
            .write()
            .map_err(|e| VaultError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        Ok(data
            .get_mut(&kind)
            .map_or(false, |records| records.remove(id).is_some()))
    }
}
