/// File-based snapshot persistence
///
/// Stores the ledger's wire snapshot in the app's config directory:
/// - macOS: ~/Library/Application Support/com.entitlements/entitlements.json
/// - Windows: %APPDATA%/com.entitlements/entitlements.json
/// - Linux: ~/.config/com.entitlements/entitlements.json
use std::fs;
use std::path::PathBuf;

use crate::types::{EntitlementError, SnapshotEntry};

const APP_DIR: &str = "com.entitlements";
const LEDGER_FILE: &str = "entitlements.json";

pub struct LocalSnapshotStore {
    dir: PathBuf,
}

impl LocalSnapshotStore {
    /// Store under the platform config directory.
    pub fn new() -> Result<Self, EntitlementError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| EntitlementError::Storage("failed to get config directory".to_string()))?;
        Ok(LocalSnapshotStore {
            dir: config_dir.join(APP_DIR),
        })
    }

    /// Store under an explicit directory (tests, embedded hosts).
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        LocalSnapshotStore { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(LEDGER_FILE)
    }

    /// Write the snapshot, creating the directory if needed.
    pub fn store(&self, snapshot: &[SnapshotEntry]) -> Result<(), EntitlementError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .map_err(|e| EntitlementError::Storage(format!("failed to create app directory: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| EntitlementError::Storage(format!("failed to serialize snapshot: {}", e)))?;

        fs::write(self.path(), json)
            .map_err(|e| EntitlementError::Storage(format!("failed to write snapshot file: {}", e)))?;

        Ok(())
    }

    /// Load the snapshot; `Ok(None)` when no file exists.
    pub fn load(&self) -> Result<Option<Vec<SnapshotEntry>>, EntitlementError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| EntitlementError::Storage(format!("failed to read snapshot file: {}", e)))?;

        let snapshot = serde_json::from_str(&json)
            .map_err(|e| EntitlementError::StoreCorrupt(format!("failed to deserialize snapshot: {}", e)))?;

        Ok(Some(snapshot))
    }

    /// Delete the snapshot file; already-deleted is a success.
    pub fn delete(&self) -> Result<(), EntitlementError> {
        let path = self.path();
        if !path.exists() {
            return Ok(());
        }

        fs::remove_file(&path)
            .map_err(|e| EntitlementError::Storage(format!("failed to delete snapshot file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemKind;

    fn sample_snapshot() -> Vec<SnapshotEntry> {
        vec![SnapshotEntry {
            id: "pdf_pack_5".to_string(),
            kind: ItemKind::Pdf,
            purchased: true,
            remaining_units: 3,
            expiry_date: None,
        }]
    }

    #[test]
    fn test_store_and_load_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = LocalSnapshotStore::with_dir(dir.path().join("nested"));

        let snapshot = sample_snapshot();
        store.store(&snapshot).expect("store should succeed");

        let loaded = store.load().expect("load should succeed");
        assert_eq!(loaded, Some(snapshot));
    }

    #[test]
    fn test_load_nonexistent_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSnapshotStore::with_dir(dir.path());

        let loaded = store.load().expect("load should succeed even with no file");
        assert!(loaded.is_none(), "Should return None for a missing snapshot");
    }

    #[test]
    fn test_corrupt_file_is_store_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSnapshotStore::with_dir(dir.path());

        fs::write(dir.path().join(LEDGER_FILE), "not json at all").unwrap();

        let result = store.load();
        assert!(matches!(result, Err(EntitlementError::StoreCorrupt(_))));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSnapshotStore::with_dir(dir.path());

        store.store(&sample_snapshot()).unwrap();
        store.delete().expect("first delete should succeed");
        assert!(store.load().unwrap().is_none());

        store.delete().expect("second delete should succeed");
    }
}
