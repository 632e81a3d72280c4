//! Embedding generation for indexing and retrieval.
//!
//! The provider itself lives outside this crate. [`EmbeddingProvider`] is the
//! contract the indexer and search engine depend on; [`CommandProvider`]
//! fulfils it by delegating to an external executable.

mod command;
#[cfg(test)]
pub(crate) mod fake;

pub use command::CommandProvider;

use crate::error::{KikkError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One embedded slice of a video timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSegment {
    /// Segment start in seconds.
    #[serde(rename = "start_sec")]
    pub start_time: f64,
    /// Segment end in seconds.
    #[serde(rename = "end_sec")]
    pub end_time: f64,
    /// Embedding vector for the segment.
    pub embedding: Vec<f32>,
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a whole video, returning its segments in timeline order.
    async fn embed_video(&self, video: &[u8], model: &str) -> Result<Vec<VideoSegment>>;

    /// Embed a text query.
    async fn embed_text(&self, text: &str, model: &str) -> Result<Vec<f32>>;
}

/// Check a provider's video response before anything is written.
///
/// Returns the shared dimensionality of the segments.
pub fn validate_segments(segments: &[VideoSegment]) -> Result<usize> {
    let first = segments
        .first()
        .ok_or_else(|| KikkError::provider("embed_video", "response contained no segments"))?;
    let dimensions = first.embedding.len();

    for (i, segment) in segments.iter().enumerate() {
        if !segment.start_time.is_finite() || !segment.end_time.is_finite() {
            return Err(KikkError::provider(
                "embed_video",
                format!("segment {} has a non-finite time range", i),
            ));
        }
        if segment.start_time > segment.end_time {
            return Err(KikkError::provider(
                "embed_video",
                format!(
                    "segment {} starts at {} after it ends at {}",
                    i, segment.start_time, segment.end_time
                ),
            ));
        }
        if segment.embedding.is_empty() || segment.embedding.len() != dimensions {
            return Err(KikkError::provider(
                "embed_video",
                format!(
                    "segment {} has {} dimensions, expected {}",
                    i,
                    segment.embedding.len(),
                    dimensions
                ),
            ));
        }
        if segment.embedding.iter().any(|v| !v.is_finite()) {
            return Err(KikkError::provider(
                "embed_video",
                format!("segment {} has non-finite embedding values", i),
            ));
        }
    }

    Ok(dimensions)
}
