//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    apply_upserts, remove_source, summarize_sources, EmbeddingRecord, IndexedSource, Snapshot,
    VectorStore,
};
use crate::error::{KikkError, Result};
use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory vector store.
pub struct MemoryVectorStore {
    records: RwLock<Snapshot>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Snapshot::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Snapshot>> {
        self.records
            .read()
            .map_err(|e| KikkError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Snapshot>> {
        self.records
            .write()
            .map_err(|e| KikkError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn load(&self) -> Result<Snapshot> {
        Ok(self.read()?.clone())
    }

    async fn upsert(&self, record: &EmbeddingRecord) -> Result<()> {
        self.upsert_batch(std::slice::from_ref(record)).await?;
        Ok(())
    }

    async fn upsert_batch(&self, records: &[EmbeddingRecord]) -> Result<usize> {
        let mut store = self.write()?;
        apply_upserts(&mut store, records)
    }

    async fn contains(&self, source: &str) -> Result<bool> {
        Ok(self.read()?.values().any(|r| r.source == source))
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let mut store = self.write()?;
        Ok(remove_source(&mut store, source))
    }

    async fn replace_source(&self, source: &str, records: &[EmbeddingRecord]) -> Result<usize> {
        let mut store = self.write()?;
        let mut next = store.clone();
        remove_source(&mut next, source);
        let count = apply_upserts(&mut next, records)?;
        *store = next;
        Ok(count)
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        Ok(summarize_sources(&*self.read()?))
    }

    async fn record_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
