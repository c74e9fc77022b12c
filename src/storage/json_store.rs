//! On-disk record store
//!
//! One pretty-printed JSON file per record at `<data>/<kind>/<id>.json`.
//! File work runs on tokio's blocking pool so callers stay non-blocking.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::paths::VaultPaths;
use crate::error::{VaultError, VaultResult};

use super::file_io::{list_json_files, read_json_optional, remove_file_if_exists, write_json_atomic};
use super::{validate_record_id, PersistentStore, RecordKind, ScannedRecord, StoredRecord};

/// File-backed [`PersistentStore`]
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    paths: VaultPaths,
}

impl JsonFileStore {
    /// Create a store rooted at the given paths, creating its directories
    pub fn new(paths: VaultPaths) -> VaultResult<Self> {
        paths.ensure_directories()?;
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    fn record_path(&self, kind: RecordKind, id: &str) -> VaultResult<PathBuf> {
        validate_record_id(id)?;
        Ok(self.paths.kind_dir(kind).join(format!("{}.json", id)))
    }
}

async fn blocking<T, F>(f: F) -> VaultResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> VaultResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VaultError::Storage(format!("Storage task failed: {}", e)))?
}

#[async_trait]
impl PersistentStore for JsonFileStore {
    async fn get_all(&self, kind: RecordKind) -> VaultResult<Vec<ScannedRecord>> {
        let dir = self.paths.kind_dir(kind);
        blocking(move || {
            let mut records: Vec<ScannedRecord> = Vec::new();
            for path in list_json_files(&dir)? {
                let id = match path.file_stem().and_then(|stem| stem.to_str()) {
                    Some(id) if validate_record_id(id).is_ok() => id.to_string(),
                    _ => continue,
                };
                match read_json_optional(&path) {
                    Ok(Some(document)) => {
                        records.push(ScannedRecord::from(StoredRecord::new(id, document)))
                    }
                    // Removed between listing and reading
                    Ok(None) => {}
                    Err(e) => {
                        warn!(kind = %kind, id = %id, error = %e, "unreadable record file");
                        records.push(ScannedRecord::failed(id, e));
                    }
                }
            }
            Ok(records)
        })
        .await
    }

    async fn get(&self, kind: RecordKind, id: &str) -> VaultResult<Option<StoredRecord>> {
        let path = self.record_path(kind, id)?;
        let id = id.to_string();
        blocking(move || {
            Ok(read_json_optional(&path)?.map(|document| StoredRecord::new(id, document)))
        })
        .await
    }

    async fn put(&self, kind: RecordKind, record: StoredRecord) -> VaultResult<()> {
        let path = self.record_path(kind, &record.id)?;
        debug!(kind = %kind, id = %record.id, "writing record");
        blocking(move || write_json_atomic(&path, &record.document)).await
    }

    async fn delete(&self, kind: RecordKind, id: &str) -> VaultResult<bool> {
        let path = self.record_path(kind, id)?;
        debug!(kind = %kind, id = %id, "deleting record");
        blocking(move || remove_file_if_exists(&path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, JsonFileStore) {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let store = JsonFileStore::new(paths).unwrap();
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (_temp_dir, store) = create_test_store();
        store
            .put(RecordKind::Reports, StoredRecord::new("r1", json!({"x": 1})))
            .await
            .unwrap();

        let record = store.get(RecordKind::Reports, "r1").await.unwrap().unwrap();
        assert_eq!(record.id, "r1");
        assert_eq!(record.document, json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_records_survive_new_instance() {
        let (temp_dir, store) = create_test_store();
        store
            .put(RecordKind::Config, StoredRecord::new("provider", json!({"v": 2})))
            .await
            .unwrap();

        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let reopened = JsonFileStore::new(paths).unwrap();
        let all = reopened.get_all(RecordKind::Config).await.unwrap();
        assert_eq!(
            all,
            vec![ScannedRecord::from(StoredRecord::new("provider", json!({"v": 2})))]
        );
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (_temp_dir, store) = create_test_store();
        assert!(store.get(RecordKind::Reports, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_all_sorted_by_id() {
        let (_temp_dir, store) = create_test_store();
        for id in ["c", "a", "b"] {
            store
                .put(RecordKind::Reports, StoredRecord::new(id, json!(id)))
                .await
                .unwrap();
        }

        let ids: Vec<_> = store
            .get_all(RecordKind::Reports)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_temp_dir, store) = create_test_store();
        store
            .put(RecordKind::Reports, StoredRecord::new("r1", json!({})))
            .await
            .unwrap();

        assert!(store.delete(RecordKind::Reports, "r1").await.unwrap());
        assert!(!store.delete(RecordKind::Reports, "r1").await.unwrap());
        assert!(store.get_all(RecordKind::Reports).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let (_temp_dir, store) = create_test_store();
        let result = store.get(RecordKind::Reports, "../../etc/passwd").await;
        assert!(matches!(result, Err(VaultError::Storage(_))));
    }

    #[tokio::test]
    async fn test_unparseable_file_is_isolated() {
        let (_temp_dir, store) = create_test_store();
        for id in ["a", "c"] {
            store
                .put(RecordKind::Reports, StoredRecord::new(id, json!({"id": id})))
                .await
                .unwrap();
        }
        let path = store.paths().kind_dir(RecordKind::Reports).join("b.json");
        std::fs::write(path, "{ truncated").unwrap();

        let all = store.get_all(RecordKind::Reports).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].document.is_ok());
        assert_eq!(all[1].id, "b");
        assert!(matches!(all[1].document, Err(VaultError::Storage(_))));
        assert!(all[2].document.is_ok());

        let single = store.get(RecordKind::Reports, "b").await;
        assert!(matches!(single, Err(VaultError::Storage(_))));
    }
}
