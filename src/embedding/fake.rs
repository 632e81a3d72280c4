//! Scripted provider for tests.

use super::{EmbeddingProvider, VideoSegment};
use crate::error::{KikkError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Returns canned embeddings and counts calls.
#[derive(Default)]
pub struct FakeProvider {
    segments: Vec<VideoSegment>,
    queries: HashMap<String, Vec<f32>>,
    fail_with: Mutex<Option<String>>,
    video_calls: AtomicUsize,
    text_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segments(mut self, segments: Vec<(f64, f64, Vec<f32>)>) -> Self {
        self.segments = segments
            .into_iter()
            .map(|(start_time, end_time, embedding)| VideoSegment {
                start_time,
                end_time,
                embedding,
            })
            .collect();
        self
    }

    pub fn with_query(mut self, text: &str, embedding: Vec<f32>) -> Self {
        self.queries.insert(text.to_string(), embedding);
        self
    }

    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn video_calls(&self) -> usize {
        self.video_calls.load(Ordering::SeqCst)
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self, operation: &str) -> Result<()> {
        match self.fail_with.lock().unwrap().as_ref() {
            Some(message) => Err(KikkError::provider(operation, message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FakeProvider {
    async fn embed_video(&self, _video: &[u8], _model: &str) -> Result<Vec<VideoSegment>> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure("embed_video")?;
        Ok(self.segments.clone())
    }

    async fn embed_text(&self, text: &str, _model: &str) -> Result<Vec<f32>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure("embed_text")?;
        self.queries
            .get(text)
            .cloned()
            .ok_or_else(|| KikkError::provider("embed_text", format!("no canned vector for '{}'", text)))
    }
}
