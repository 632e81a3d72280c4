//! Video indexing.
//!
//! Turns a video file into timed embedding records. Segmentation is the
//! provider's job; the indexer keys each returned segment as
//! `{video_name}_{start:.2}_{end:.2}` and writes the whole video as one batch.

use crate::embedding::{validate_segments, EmbeddingProvider};
use crate::error::{KikkError, Result};
use crate::vector_store::{EmbeddingRecord, VectorStore};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "webm", "flv", "wmv", "m4v", "mpeg", "mpg", "3gp",
];

/// Check if path looks like a supported video file.
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Summary of a completed indexing run.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSummary {
    /// Video file name, used as the record source.
    pub video_name: String,
    /// Model that produced the embeddings.
    pub model: String,
    /// Number of segments written.
    pub segment_count: usize,
    /// Vector dimensionality.
    pub dimensions: usize,
}

/// Result of indexing one video.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOutcome {
    /// Segments were embedded and written.
    Indexed(IndexSummary),
    /// The store already had records for this video; nothing was done.
    AlreadyIndexed { video_name: String },
}

impl IndexOutcome {
    /// Name of the video this outcome refers to.
    pub fn video_name(&self) -> &str {
        match self {
            IndexOutcome::Indexed(summary) => &summary.video_name,
            IndexOutcome::AlreadyIndexed { video_name } => video_name,
        }
    }
}

/// Outcome for one file of a directory run.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<IndexOutcome>,
}

/// Embeds videos and writes their segments to the store.
pub struct VideoIndexer {
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,
    video_model: String,
}

impl VideoIndexer {
    /// Create a new indexer.
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn EmbeddingProvider>,
        video_model: &str,
    ) -> Self {
        Self {
            store,
            provider,
            video_model: video_model.to_string(),
        }
    }

    /// Index a single video file.
    ///
    /// Unless `force` is set, a video whose name already appears in the store
    /// is skipped without calling the provider. With `force`, the video's
    /// previous records are replaced in the same write as the new ones.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn index_video(&self, path: &Path, force: bool) -> Result<IndexOutcome> {
        if !path.exists() {
            return Err(KikkError::NotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(KikkError::InvalidArgument(format!(
                "Not a file: {}",
                path.display()
            )));
        }

        let video_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                KikkError::InvalidArgument(format!("Unusable file name: {}", path.display()))
            })?
            .to_string();

        if !force && self.store.contains(&video_name).await? {
            info!("{} is already indexed, skipping", video_name);
            return Ok(IndexOutcome::AlreadyIndexed { video_name });
        }

        let video = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KikkError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                KikkError::Io(e)
            }
        })?;
        info!("Read {} bytes from {}", video.len(), video_name);

        let segments = self.provider.embed_video(&video, &self.video_model).await?;
        let dimensions = validate_segments(&segments)?;
        info!(
            "Embedded {} with {} | {} segments of {} dimensions",
            video_name,
            self.video_model,
            segments.len(),
            dimensions
        );

        let records: Vec<EmbeddingRecord> = segments
            .into_iter()
            .map(|segment| {
                EmbeddingRecord::new(
                    &video_name,
                    segment.start_time,
                    segment.end_time,
                    segment.embedding,
                )
            })
            .collect();

        let mut keys = HashSet::with_capacity(records.len());
        if let Some(duplicate) = records.iter().find(|r| !keys.insert(r.key.as_str())) {
            return Err(KikkError::provider(
                "embed_video",
                format!(
                    "segments {:.3}-{:.3} of {} collide on key '{}'",
                    duplicate.start_time, duplicate.end_time, video_name, duplicate.key
                ),
            ));
        }

        let written = if force {
            self.store.replace_source(&video_name, &records).await?
        } else {
            self.store.upsert_batch(&records).await?
        };

        Ok(IndexOutcome::Indexed(IndexSummary {
            video_name,
            model: self.video_model.clone(),
            segment_count: written,
            dimensions,
        }))
    }

    /// Index every video file in a directory, in file name order.
    ///
    /// A failure on one file is recorded and the run continues.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn index_directory(
        &self,
        dir: &Path,
        force: bool,
        limit: Option<usize>,
    ) -> Result<Vec<FileOutcome>> {
        if !dir.exists() {
            return Err(KikkError::NotFound {
                path: dir.to_path_buf(),
            });
        }
        if !dir.is_dir() {
            return Err(KikkError::InvalidArgument(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }

        let mut videos: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_video_file(p))
            .collect();
        videos.sort();
        videos.truncate(limit.unwrap_or(usize::MAX));

        info!("Found {} video files", videos.len());

        let mut outcomes = Vec::with_capacity(videos.len());
        for path in videos {
            let result = self.index_video(&path, force).await;
            if let Err(e) = &result {
                warn!("Failed to index {:?}: {}", path, e);
            }
            outcomes.push(FileOutcome { path, result });
        }

        Ok(outcomes)
    }
}
