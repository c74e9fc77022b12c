//! Storage layer for SSA Vault
//!
//! [`PersistentStore`] is a keyed, kind-partitioned record space. Records are
//! opaque JSON documents: envelopes plus non-secret metadata. No store ever
//! looks inside a document or sees plaintext.

pub mod file_io;
pub mod json_store;
pub mod memory;

pub use json_store::JsonFileStore;
pub use memory::MemoryStore;

use std::fmt;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{VaultError, VaultResult};

/// Partition of the record space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    /// Encrypted disability reports
    Reports,
    /// Singleton provider configuration
    Config,
    /// Salt and verification envelope for the passphrase
    Keyring,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [Self::Reports, Self::Config, Self::Keyring];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reports => "reports",
            Self::Config => "config",
            Self::Keyring => "keyring",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted record
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub document: serde_json::Value,
}

impl StoredRecord {
    pub fn new(id: impl Into<String>, document: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            document,
        }
    }

    /// Serialize an entity into a record
    pub fn from_entity<T: Serialize>(id: impl Into<String>, entity: &T) -> VaultResult<Self> {
        let document = serde_json::to_value(entity)
            .map_err(|e| VaultError::Storage(format!("Failed to serialize record: {}", e)))?;
        Ok(Self::new(id, document))
    }

    /// Deserialize the record's document into an entity
    pub fn to_entity<T: DeserializeOwned>(&self) -> VaultResult<T> {
        serde_json::from_value(self.document.clone()).map_err(|e| {
            VaultError::Storage(format!("Malformed record {}: {}", self.id, e))
        })
    }
}

/// One entry of a [`PersistentStore::get_all`] scan
///
/// A record that cannot be read keeps its id and its own error, so one
/// damaged record never hides the others.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedRecord {
    pub id: String,
    pub document: VaultResult<serde_json::Value>,
}

impl ScannedRecord {
    pub fn failed(id: impl Into<String>, error: VaultError) -> Self {
        Self {
            id: id.into(),
            document: Err(error),
        }
    }

    pub fn into_record(self) -> VaultResult<StoredRecord> {
        let id = self.id;
        self.document.map(|document| StoredRecord::new(id, document))
    }
}

impl From<StoredRecord> for ScannedRecord {
    fn from(record: StoredRecord) -> Self {
        Self {
            id: record.id,
            document: Ok(record.document),
        }
    }
}

/// Generic keyed persistence of opaque records
///
/// A completed `put` is visible to every later `get`/`get_all` in the same
/// process. `delete` is permanent. Failures surface as
/// [`VaultError::Storage`]; writes are never dropped silently.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// All records of a kind, ordered by id
    ///
    /// The outer error means the kind could not be scanned at all. A single
    /// unreadable record is reported in its own [`ScannedRecord`].
    async fn get_all(&self, kind: RecordKind) -> VaultResult<Vec<ScannedRecord>>;

    async fn get(&self, kind: RecordKind, id: &str) -> VaultResult<Option<StoredRecord>>;

    /// Insert or replace a record
    async fn put(&self, kind: RecordKind, record: StoredRecord) -> VaultResult<()>;

    /// Remove a record, returning whether it existed
    async fn delete(&self, kind: RecordKind, id: &str) -> VaultResult<bool>;
}

/// Reject ids that could escape a kind's namespace on disk
pub(crate) fn validate_record_id(id: &str) -> VaultResult<()> {
    let valid = !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(VaultError::Storage(format!("Invalid record id: {:?}", id)))
    }
}
