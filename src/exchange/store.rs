//! Durable storage for pending exchanges
//!
//! The client process may be evicted while the host app is in front, so every
//! pending exchange is written out before the host is launched. On the next
//! start the tracker reloads the records and applies its grace window.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{CorrelationId, Variant};

/// Where a persisted exchange stood when it was last written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingState {
    /// Recorded, launch not yet confirmed
    Issued,
    /// The host was launched; waiting for it to come back
    AwaitingResponse,
}

/// Minimal record of an outstanding request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecord {
    pub exchange_id: u64,
    pub correlation_id: CorrelationId,
    pub variant: Variant,
    pub issued_at_ms: u64,
    pub state: PendingState,
}

impl PendingRecord {
    pub(crate) fn matches(&self, correlation_id: &CorrelationId, variant: Variant) -> bool {
        self.variant == variant && &self.correlation_id == correlation_id
    }
}

/// Backing storage for pending records
///
/// The tracker rewrites the full record set after every change; a store only
/// needs to persist and return the latest snapshot.
pub trait PendingStore: Send {
    fn load(&self) -> Result<Vec<PendingRecord>, StoreError>;

    fn save(&mut self, records: &[PendingRecord]) -> Result<(), StoreError>;
}

impl<S: PendingStore + ?Sized> PendingStore for Box<S> {
    fn load(&self) -> Result<Vec<PendingRecord>, StoreError> {
        (**self).load()
    }

    fn save(&mut self, records: &[PendingRecord]) -> Result<(), StoreError> {
        (**self).save(records)
    }
}

#[derive(Serialize, Deserialize)]
struct PendingDocument {
    version: u32,
    records: Vec<PendingRecord>,
}

const DOCUMENT_VERSION: u32 = 1;

/// JSON file store, replaced atomically on every save
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PendingStore for FileStore {
    fn load(&self) -> Result<Vec<PendingRecord>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let document: PendingDocument =
            serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(document.records)
    }

    fn save(&mut self, records: &[PendingRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            tracing::debug!(path = %parent.display(), "created pending store directory");
        }

        let json = serde_json::to_vec_pretty(&PendingDocument {
            version: DOCUMENT_VERSION,
            records: records.to_vec(),
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        tracing::debug!(
            path = %self.path.display(),
            records = records.len(),
            "saved pending records"
        );
        Ok(())
    }
}

/// In-memory store
///
/// Clones share the same records, which lets tests simulate a process
/// restart by opening a second tracker on a clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<PendingRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored records
    pub fn records(&self) -> Vec<PendingRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PendingStore for MemoryStore {
    fn load(&self) -> Result<Vec<PendingRecord>, StoreError> {
        Ok(self.records())
    }

    fn save(&mut self, records: &[PendingRecord]) -> Result<(), StoreError> {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(exchange_id: u64) -> PendingRecord {
        PendingRecord {
            exchange_id,
            correlation_id: CorrelationId::new("o-user").unwrap(),
            variant: Variant::Auth,
            issued_at_ms: 1_700_000_000_000,
            state: PendingState::AwaitingResponse,
        }
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("pending.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_persists_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pending.json");

        let mut store = FileStore::new(&path);
        store.save(&[record(1), record(2)]).unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.load().unwrap(), vec![record(1), record(2)]);
        assert!(!dir.path().join("nested").join("pending.json.tmp").exists());
    }

    #[test]
    fn test_file_store_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = FileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_memory_store_clones_share_records() {
        let mut store = MemoryStore::new();
        let other = store.clone();
        store.save(&[record(7)]).unwrap();
        assert_eq!(other.load().unwrap(), vec![record(7)]);
    }
}
