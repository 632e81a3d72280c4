//! Vector store abstraction for Kikk.
//!
//! Provides a trait-based interface for different embedding store backends.
//! Every backend is a key-to-record mapping with upsert semantics: writing a
//! record whose key already exists replaces it.

mod json;
mod memory;

pub use json::JsonVectorStore;
pub use memory::MemoryVectorStore;

use crate::error::{KikkError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

/// Full in-memory view of a store, ordered by key.
pub type Snapshot = BTreeMap<String, EmbeddingRecord>;

/// One stored embedding vector for a timed segment of a source.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    /// Unique key, `{source}_{start:.2}_{end:.2}` for video segments.
    pub key: String,
    /// Name of the content item (video file name).
    pub source: String,
    /// Segment start in seconds.
    pub start_time: f64,
    /// Segment end in seconds.
    pub end_time: f64,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

impl EmbeddingRecord {
    /// Create a record for a segment; the key is derived from the other fields.
    pub fn new(source: &str, start_time: f64, end_time: f64, embedding: Vec<f32>) -> Self {
        Self {
            key: segment_key(source, start_time, end_time),
            source: source.to_string(),
            start_time,
            end_time,
            embedding,
        }
    }

    /// Rebuild a record from its key and persisted fields.
    pub fn from_parts(key: String, start_time: f64, end_time: f64, embedding: Vec<f32>) -> Self {
        let source = source_from_key(&key).to_string();
        Self {
            key,
            source,
            start_time,
            end_time,
            embedding,
        }
    }

    /// Vector dimensionality.
    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}

/// Derive the store key for a segment of `source`.
pub fn segment_key(source: &str, start_time: f64, end_time: f64) -> String {
    format!("{}_{:.2}_{:.2}", source, start_time, end_time)
}

/// Extract the source component of a key.
///
/// Keys that do not end in two `_{number}` components are their own source.
pub fn source_from_key(key: &str) -> &str {
    let mut parts = key.rsplitn(3, '_');
    let end = parts.next();
    let start = parts.next();
    let source = parts.next();

    match (source, start, end) {
        (Some(source), Some(start), Some(end))
            if !source.is_empty() && start.parse::<f64>().is_ok() && end.parse::<f64>().is_ok() =>
        {
            source
        }
        _ => key,
    }
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_seconds(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Summary information about an indexed source.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedSource {
    /// Source name.
    pub source: String,
    /// Number of stored segments.
    pub segment_count: usize,
    /// Latest segment end, in seconds.
    pub total_duration_seconds: f64,
    /// Vector dimensionality of the source's segments.
    pub dimensions: usize,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Load the full contents of the store.
    async fn load(&self) -> Result<Snapshot>;

    /// Insert or replace a single record.
    async fn upsert(&self, record: &EmbeddingRecord) -> Result<()>;

    /// Insert or replace records as one atomic write.
    async fn upsert_batch(&self, records: &[EmbeddingRecord]) -> Result<usize>;

    /// Check if any record belongs to `source`.
    async fn contains(&self, source: &str) -> Result<bool>;

    /// Delete every record of `source`.
    async fn delete_by_source(&self, source: &str) -> Result<usize>;

    /// Drop every record of `source` and write `records`, as one atomic write.
    async fn replace_source(&self, source: &str, records: &[EmbeddingRecord]) -> Result<usize>;

    /// List indexed sources.
    async fn list_sources(&self) -> Result<Vec<IndexedSource>>;

    /// Get total record count.
    async fn record_count(&self) -> Result<usize>;
}

/// Dimensionality of a snapshot: the one most of its records share.
///
/// Ties go to the smaller dimensionality.
pub fn snapshot_dimensions(snapshot: &Snapshot) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for record in snapshot.values() {
        *counts.entry(record.dimensions()).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(a_dim, a_count), (b_dim, b_count)| a_count.cmp(b_count).then(b_dim.cmp(a_dim)))
        .map(|(dimensions, _)| dimensions)
}

/// Check a record's own invariants.
pub(crate) fn validate_record(record: &EmbeddingRecord) -> Result<()> {
    if record.embedding.is_empty() {
        return Err(KikkError::InvalidArgument(format!(
            "record '{}' has an empty embedding",
            record.key
        )));
    }
    if !record.start_time.is_finite() || !record.end_time.is_finite() {
        return Err(KikkError::InvalidArgument(format!(
            "record '{}' has a non-finite time range",
            record.key
        )));
    }
    if record.start_time > record.end_time {
        return Err(KikkError::InvalidArgument(format!(
            "record '{}' starts at {} after it ends at {}",
            record.key, record.start_time, record.end_time
        )));
    }
    if record.embedding.iter().any(|v| !v.is_finite()) {
        return Err(KikkError::InvalidArgument(format!(
            "record '{}' has non-finite embedding values",
            record.key
        )));
    }
    Ok(())
}

/// Validate `records` against `snapshot`, then insert them.
///
/// Nothing is inserted unless every record passes. Records sharing a key
/// collapse to the last one; the returned count is of distinct keys.
pub(crate) fn apply_upserts(snapshot: &mut Snapshot, records: &[EmbeddingRecord]) -> Result<usize> {
    let expected = snapshot_dimensions(snapshot)
        .or_else(|| records.first().map(EmbeddingRecord::dimensions));

    for record in records {
        validate_record(record)?;
        if let Some(expected) = expected {
            if record.dimensions() != expected {
                return Err(KikkError::DimensionMismatch {
                    key: record.key.clone(),
                    expected,
                    actual: record.dimensions(),
                });
            }
        }
    }

    let mut written = BTreeSet::new();
    for record in records {
        snapshot.insert(record.key.clone(), record.clone());
        written.insert(record.key.as_str());
    }

    Ok(written.len())
}

/// Remove every record of `source`, returning how many were removed.
pub(crate) fn remove_source(snapshot: &mut Snapshot, source: &str) -> usize {
    let initial_len = snapshot.len();
    snapshot.retain(|_, record| record.source != source);
    initial_len - snapshot.len()
}

/// Group a snapshot by source.
pub(crate) fn summarize_sources(snapshot: &Snapshot) -> Vec<IndexedSource> {
    let mut sources: BTreeMap<&str, IndexedSource> = BTreeMap::new();

    for record in snapshot.values() {
        let entry = sources
            .entry(record.source.as_str())
            .or_insert_with(|| IndexedSource {
                source: record.source.clone(),
                segment_count: 0,
                total_duration_seconds: 0.0,
                dimensions: record.dimensions(),
            });

        entry.segment_count += 1;
        if record.end_time > entry.total_duration_seconds {
            entry.total_duration_seconds = record.end_time;
        }
    }

    sources.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_key_format() {
        assert_eq!(segment_key("v1", 0.0, 2.0), "v1_0.00_2.00");
        assert_eq!(segment_key("clip.mp4", 12.5, 18.25), "clip.mp4_12.50_18.25");
    }

    #[test]
    fn test_source_from_key() {
        assert_eq!(source_from_key("v1_0.00_2.00"), "v1");
        assert_eq!(source_from_key("my_holiday_video.mp4_6.00_12.00"), "my_holiday_video.mp4");
        assert_eq!(source_from_key("plain"), "plain");
        assert_eq!(source_from_key("a_b_c"), "a_b_c");
        assert_eq!(source_from_key("_1.00_2.00"), "_1.00_2.00");
    }

    #[test]
    fn test_record_key_round_trip() {
        let record = EmbeddingRecord::new("talk_final.mov", 4.0, 8.0, vec![1.0]);
        let rebuilt = EmbeddingRecord::from_parts(record.key.clone(), 4.0, 8.0, vec![1.0]);
        assert_eq!(rebuilt, record);
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(125.0), "02:05");
        assert_eq!(format_seconds(3725.0), "01:02:05");
    }

    #[test]
    fn test_validate_record() {
        assert!(validate_record(&EmbeddingRecord::new("v", 0.0, 1.0, vec![0.5])).is_ok());
        assert!(validate_record(&EmbeddingRecord::new("v", 2.0, 1.0, vec![0.5])).is_err());
        assert!(validate_record(&EmbeddingRecord::new("v", 0.0, 1.0, vec![])).is_err());
        assert!(validate_record(&EmbeddingRecord::new("v", 0.0, 1.0, vec![f32::NAN])).is_err());
    }

    #[test]
    fn test_apply_upserts_rejects_mismatched_batch_atomically() {
        let mut snapshot = Snapshot::new();
        apply_upserts(&mut snapshot, &[EmbeddingRecord::new("v", 0.0, 1.0, vec![1.0, 0.0])]).unwrap();

        let batch = vec![
            EmbeddingRecord::new("w", 0.0, 1.0, vec![0.0, 1.0]),
            EmbeddingRecord::new("w", 1.0, 2.0, vec![0.0, 1.0, 0.0]),
        ];
        let err = apply_upserts(&mut snapshot, &batch).unwrap_err();
        assert!(matches!(
            err,
            KikkError::DimensionMismatch { expected: 2, actual: 3, .. }
        ));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_apply_upserts_counts_distinct_keys() {
        let mut snapshot = Snapshot::new();
        let batch = vec![
            EmbeddingRecord::new("v", 0.0, 1.0, vec![1.0, 0.0]),
            EmbeddingRecord::new("v", 0.0, 1.0, vec![0.0, 1.0]),
            EmbeddingRecord::new("v", 1.0, 2.0, vec![1.0, 1.0]),
        ];

        assert_eq!(apply_upserts(&mut snapshot, &batch).unwrap(), 2);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["v_0.00_1.00"].embedding, vec![0.0, 1.0]);
    }

    #[test]
    fn test_store_dimensions_follow_the_majority() {
        let mut snapshot = Snapshot::new();
        assert_eq!(snapshot_dimensions(&snapshot), None);

        // A stray record that sorts first must not dictate the dimensionality.
        let stray = EmbeddingRecord::new("aaa_stray", 0.0, 1.0, vec![1.0]);
        snapshot.insert(stray.key.clone(), stray);
        for i in 0..2 {
            let record = EmbeddingRecord::new("clip.mp4", i as f64, i as f64 + 1.0, vec![1.0, 0.0, 0.0]);
            snapshot.insert(record.key.clone(), record);
        }
        assert_eq!(snapshot_dimensions(&snapshot), Some(3));

        let next = EmbeddingRecord::new("clip.mp4", 2.0, 3.0, vec![0.0, 1.0, 0.0]);
        assert_eq!(apply_upserts(&mut snapshot, &[next]).unwrap(), 1);

        let mut tied = Snapshot::new();
        apply_upserts(&mut tied, &[EmbeddingRecord::new("b", 0.0, 1.0, vec![1.0, 0.0])]).unwrap();
        let odd = EmbeddingRecord::new("a", 0.0, 1.0, vec![1.0, 0.0, 0.0]);
        tied.insert(odd.key.clone(), odd);
        assert_eq!(snapshot_dimensions(&tied), Some(2));
    }

    #[test]
    fn test_summarize_sources() {
        let mut snapshot = Snapshot::new();
        apply_upserts(
            &mut snapshot,
            &[
                EmbeddingRecord::new("a.mp4", 0.0, 6.0, vec![1.0, 0.0]),
                EmbeddingRecord::new("a.mp4", 6.0, 9.5, vec![0.0, 1.0]),
                EmbeddingRecord::new("b.mp4", 0.0, 3.0, vec![1.0, 1.0]),
            ],
        )
        .unwrap();

        let sources = summarize_sources(&snapshot);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source, "a.mp4");
        assert_eq!(sources[0].segment_count, 2);
        assert_eq!(sources[0].total_duration_seconds, 9.5);
        assert_eq!(sources[1].dimensions, 2);

        assert_eq!(remove_source(&mut snapshot, "a.mp4"), 2);
        assert_eq!(snapshot.len(), 1);
    }
}
