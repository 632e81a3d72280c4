//! JSON file vector store implementation.
//!
//! The whole store is a single JSON object mapping record keys to
//! `{ "embedding": [...], "start_time": f64, "end_time": f64 }`. Reads load the
//! full file as an immutable snapshot. Writes hold an exclusive lock on a
//! sibling `.lock` file, rewrite the full contents into a temporary file in the
//! same directory and rename it over the store, so a reader or a crash only
//! ever observes a complete file.

use super::{
    apply_upserts, remove_source, summarize_sources, EmbeddingRecord, IndexedSource, Snapshot,
    VectorStore,
};
use crate::error::{KikkError, Result};
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

/// Persisted form of a record.
#[derive(Debug, Deserialize)]
struct StoredRecord {
    embedding: Vec<f32>,
    start_time: f64,
    end_time: f64,
}

#[derive(Debug, Serialize)]
struct StoredRecordRef<'a> {
    embedding: &'a [f32],
    start_time: f64,
    end_time: f64,
}

/// JSON file vector store.
pub struct JsonVectorStore {
    path: PathBuf,
}

impl JsonVectorStore {
    /// Open a store at `path`. The file itself is created on first write.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        let store = Self {
            path: path.to_path_buf(),
        };
        std::fs::create_dir_all(store.dir())?;
        info!("Using JSON vector store at {:?}", path);
        Ok(store)
    }

    /// Path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn corrupt(&self, reason: impl Into<String>) -> KikkError {
        KikkError::StoreCorrupt {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    /// Read the current contents. A missing or blank file is an empty store.
    fn read_snapshot(&self) -> Result<Snapshot> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Store file {:?} does not exist yet", self.path);
                return Ok(Snapshot::new());
            }
            Err(e) => return Err(e.into()),
        };

        let content = std::str::from_utf8(&bytes)
            .map_err(|e| self.corrupt(format!("not valid UTF-8: {}", e)))?;

        if content.trim().is_empty() {
            return Ok(Snapshot::new());
        }

        let stored: BTreeMap<String, StoredRecord> =
            serde_json::from_str(content).map_err(|e| self.corrupt(e.to_string()))?;

        let mut snapshot = Snapshot::new();
        for (key, record) in stored {
            // Out-of-range numbers parse as infinities and would be written
            // back as `null`.
            if !record.start_time.is_finite() || !record.end_time.is_finite() {
                return Err(self.corrupt(format!("record '{}' has a non-finite time range", key)));
            }
            if record.embedding.iter().any(|v| !v.is_finite()) {
                return Err(self.corrupt(format!(
                    "record '{}' has embedding values outside the f32 range",
                    key
                )));
            }
            if record.start_time > record.end_time {
                return Err(self.corrupt(format!(
                    "record '{}' starts at {} after it ends at {}",
                    key, record.start_time, record.end_time
                )));
            }
            let record =
                EmbeddingRecord::from_parts(key, record.start_time, record.end_time, record.embedding);
            snapshot.insert(record.key.clone(), record);
        }

        debug!("Loaded {} records from {:?}", snapshot.len(), self.path);
        Ok(snapshot)
    }

    /// Write the full contents to a synced temporary file next to the store.
    pub(crate) fn stage(&self, snapshot: &Snapshot) -> Result<NamedTempFile> {
        let stored: BTreeMap<&str, StoredRecordRef<'_>> = snapshot
            .iter()
            .map(|(key, record)| {
                (
                    key.as_str(),
                    StoredRecordRef {
                        embedding: &record.embedding,
                        start_time: record.start_time,
                        end_time: record.end_time,
                    },
                )
            })
            .collect();

        let content = serde_json::to_string_pretty(&stored)?;

        let mut staged = NamedTempFile::new_in(self.dir())?;
        staged.write_all(content.as_bytes())?;
        staged.as_file().sync_all()?;
        Ok(staged)
    }

    /// Atomically replace the store file with a staged file.
    pub(crate) fn commit(&self, staged: NamedTempFile) -> Result<()> {
        staged.persist(&self.path).map_err(|e| e.error)?;

        // Make the rename itself durable where the platform allows it.
        if let Ok(dir) = std::fs::File::open(self.dir()) {
            let _ = dir.sync_all();
        }
        Ok(())
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let staged = self.stage(snapshot)?;
        self.commit(staged)?;
        debug!("Persisted {} records to {:?}", snapshot.len(), self.path);
        Ok(())
    }

    /// Run a read-modify-write cycle under the exclusive writer lock.
    ///
    /// The new contents are persisted only if `op` succeeds.
    fn write_with<T>(&self, op: impl FnOnce(&mut Snapshot) -> Result<T>) -> Result<T> {
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;

        FileExt::lock_exclusive(&lock_file).map_err(|e| {
            KikkError::VectorStore(format!("Failed to lock {:?}: {}", self.lock_path(), e))
        })?;

        let result = self.read_snapshot().and_then(|mut snapshot| {
            let out = op(&mut snapshot)?;
            self.persist(&snapshot)?;
            Ok(out)
        });

        if let Err(e) = FileExt::unlock(&lock_file) {
            warn!("Failed to unlock {:?}: {}", self.lock_path(), e);
        }

        result
    }
}

#[async_trait]
impl VectorStore for JsonVectorStore {
    async fn load(&self) -> Result<Snapshot> {
        self.read_snapshot()
    }

    #[instrument(skip(self, record), fields(key = %record.key))]
    async fn upsert(&self, record: &EmbeddingRecord) -> Result<()> {
        self.write_with(|snapshot| apply_upserts(snapshot, std::slice::from_ref(record)))?;
        Ok(())
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert_batch(&self, records: &[EmbeddingRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        self.write_with(|snapshot| apply_upserts(snapshot, records))
    }

    async fn contains(&self, source: &str) -> Result<bool> {
        Ok(self.read_snapshot()?.values().any(|r| r.source == source))
    }

    #[instrument(skip(self))]
    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        self.write_with(|snapshot| Ok(remove_source(snapshot, source)))
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn replace_source(&self, source: &str, records: &[EmbeddingRecord]) -> Result<usize> {
        self.write_with(|snapshot| {
            let removed = remove_source(snapshot, source);
            debug!("Dropping {} stale records of {}", removed, source);
            apply_upserts(snapshot, records)
        })
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        Ok(summarize_sources(&self.read_snapshot()?))
    }

    async fn record_count(&self) -> Result<usize> {
        Ok(self.read_snapshot()?.len())
    }
}
