//! Pipeline orchestrator for Kikk.
//!
//! Builds the store and embedding provider once from settings and hands the
//! same instances to the indexer and the search engine.

use crate::config::{Settings, StoreBackend};
use crate::embedding::{CommandProvider, EmbeddingProvider};
use crate::error::Result;
use crate::indexer::{FileOutcome, IndexOutcome, VideoIndexer};
use crate::search::{QueryResult, SearchEngine};
use crate::vector_store::{JsonVectorStore, MemoryVectorStore, VectorStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The main orchestrator for the Kikk pipeline.
pub struct Orchestrator {
    settings: Settings,
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl Orchestrator {
    /// Create a new orchestrator from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let store: Arc<dyn VectorStore> = match settings.store.backend {
            StoreBackend::Json => Arc::new(JsonVectorStore::new(&settings.store_path())?),
            StoreBackend::Memory => {
                info!("Using in-memory vector store; nothing will be persisted");
                Arc::new(MemoryVectorStore::new())
            }
        };

        let provider: Arc<dyn EmbeddingProvider> = Arc::new(CommandProvider::new(
            &settings.embedding.command,
            Duration::from_secs(settings.embedding.timeout_secs),
        )?);

        Ok(Self {
            settings,
            store,
            provider,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            settings,
            store,
            provider,
        }
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    /// Build an indexer over the shared collaborators.
    pub fn indexer(&self) -> VideoIndexer {
        VideoIndexer::new(
            self.store.clone(),
            self.provider.clone(),
            &self.settings.embedding.video_model,
        )
    }

    /// Build a search engine over the shared collaborators.
    pub fn search_engine(&self) -> SearchEngine {
        SearchEngine::new(
            self.store.clone(),
            self.provider.clone(),
            &self.settings.embedding.text_model,
        )
        .with_min_score(self.settings.search.min_score)
    }

    /// Index a video file.
    pub async fn index_video(&self, path: &Path, force: bool) -> Result<IndexOutcome> {
        self.indexer().index_video(path, force).await
    }

    /// Index every video in a directory.
    pub async fn index_directory(
        &self,
        dir: &Path,
        force: bool,
        limit: Option<usize>,
    ) -> Result<Vec<FileOutcome>> {
        self.indexer().index_directory(dir, force, limit).await
    }

    /// Drop every segment of a video, returning how many were removed.
    pub async fn remove_video(&self, video_name: &str) -> Result<usize> {
        let removed = self.store.delete_by_source(video_name).await?;
        info!("Removed {} segments of {}", removed, video_name);
        Ok(removed)
    }

    /// Search with the configured default `k` when none is given.
    pub async fn search(&self, query: &str, k: Option<usize>) -> Result<Vec<QueryResult>> {
        let k = k.unwrap_or(self.settings.search.default_k);
        self.search_engine().search(query, k).await
    }
}
