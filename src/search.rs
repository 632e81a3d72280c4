//! Similarity search over the embedding store.
//!
//! Search is a full linear scan: every stored record is scored against the
//! query vector with cosine similarity and the best `k` are kept in a bounded
//! heap. Results are ordered by score descending, then key ascending.

use crate::embedding::EmbeddingProvider;
use crate::error::{KikkError, Result};
use crate::vector_store::{format_seconds, EmbeddingRecord, VectorStore};
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default number of results.
pub const DEFAULT_K: usize = 5;

/// Compute cosine similarity between two vectors.
///
/// Returns `None` when the lengths differ. A zero-norm vector on either side
/// scores `0.0`. Accumulation is done in `f64` and the result is clamped to
/// `[-1, 1]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !similarity.is_finite() {
        return Some(0.0);
    }

    Some(similarity.clamp(-1.0, 1.0) as f32)
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Cosine similarity with the query.
    pub score: f32,
    /// Record key.
    pub key: String,
    /// Source the segment belongs to.
    pub source: String,
    /// Segment start in seconds.
    pub start_time: f64,
    /// Segment end in seconds.
    pub end_time: f64,
}

impl QueryResult {
    fn scored(record: &EmbeddingRecord, score: f32) -> Self {
        Self {
            score,
            key: record.key.clone(),
            source: record.source.clone(),
            start_time: record.start_time,
            end_time: record.end_time,
        }
    }

    /// Format the segment range for display.
    pub fn format_range(&self) -> String {
        format!(
            "{} - {}",
            format_seconds(self.start_time),
            format_seconds(self.end_time)
        )
    }
}

/// Heap entry; greater means a better hit.
struct Ranked(QueryResult);

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .score
            .total_cmp(&other.0.score)
            .then_with(|| other.0.key.cmp(&self.0.key))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Outcome of ranking a set of records.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    /// Best hits, best first.
    pub results: Vec<QueryResult>,
    /// Keys of records skipped for having a different dimensionality.
    pub skipped: Vec<String>,
}

/// Score `records` against `query` and keep the best `k`.
///
/// Records whose dimensionality differs from the query are skipped and
/// reported; they never abort the ranking.
pub fn rank<'a, I>(query: &[f32], records: I, k: usize, min_score: Option<f32>) -> Ranking
where
    I: IntoIterator<Item = &'a EmbeddingRecord>,
{
    if k == 0 {
        return Ranking::default();
    }

    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k.min(1024) + 1);
    let mut skipped = Vec::new();

    for record in records {
        let Some(score) = cosine_similarity(query, &record.embedding) else {
            let err = KikkError::DimensionMismatch {
                key: record.key.clone(),
                expected: query.len(),
                actual: record.dimensions(),
            };
            warn!("Skipping record: {}", err);
            skipped.push(record.key.clone());
            continue;
        };

        if min_score.is_some_and(|min| score < min) {
            continue;
        }

        heap.push(Reverse(Ranked(QueryResult::scored(record, score))));
        if heap.len() > k {
            heap.pop();
        }
    }

    // Ascending order of `Reverse` is best-first.
    let results = heap
        .into_sorted_vec()
        .into_iter()
        .map(|Reverse(Ranked(result))| result)
        .collect();

    Ranking { results, skipped }
}

/// Text-to-video similarity search.
pub struct SearchEngine {
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,
    text_model: String,
    min_score: Option<f32>,
}

impl SearchEngine {
    /// Create a new search engine.
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn EmbeddingProvider>,
        text_model: &str,
    ) -> Self {
        Self {
            store,
            provider,
            text_model: text_model.to_string(),
            min_score: None,
        }
    }

    /// Drop results scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    /// Return the `k` stored segments most similar to `query`.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<QueryResult>> {
        if k == 0 {
            return Err(KikkError::InvalidArgument(
                "k must be a positive integer".to_string(),
            ));
        }
        if query.trim().is_empty() {
            return Err(KikkError::InvalidArgument("query must not be empty".to_string()));
        }

        let query_embedding = self.provider.embed_text(query, &self.text_model).await?;
        debug!("Query embedding has {} dimensions", query_embedding.len());

        Ok(self.search_by_vector(&query_embedding, k).await?.results)
    }

    /// Rank stored segments against an already embedded query.
    pub async fn search_by_vector(&self, query_embedding: &[f32], k: usize) -> Result<Ranking> {
        if k == 0 {
            return Err(KikkError::InvalidArgument(
                "k must be a positive integer".to_string(),
            ));
        }

        let snapshot = self.store.load().await?;
        let ranking = rank(query_embedding, snapshot.values(), k, self.min_score);

        info!(
            "Scanned {} records, returning {} ({} skipped)",
            snapshot.len(),
            ranking.results.len(),
            ranking.skipped.len()
        );

        Ok(ranking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::fake::FakeProvider;
    use crate::vector_store::MemoryVectorStore;

    const EPS: f32 = 1e-6;

    fn record(key_source: &str, start: f64, end: f64, embedding: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord::new(key_source, start, end, embedding)
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < EPS);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).unwrap().abs() < EPS);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d).unwrap() + 1.0).abs() < EPS);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), None);
    }

    #[test]
    fn test_cosine_self_similarity_is_one() {
        let vectors: [&[f32]; 4] = [
            &[0.3, -1.7, 2.25, 9.0],
            &[1e-20, 3e-20],
            &[1e18, -1e18, 5e17],
            &[0.001; 1024],
        ];
        for v in vectors {
            let sim = cosine_similarity(v, v).unwrap();
            assert!((sim - 1.0).abs() < EPS, "sim = {sim}");
        }
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let a = [0.12, -0.5, 3.3, 0.0, 7.1];
        let b = [1.5, 0.25, -2.0, 4.0, 0.5];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_cosine_zero_vector() {
        let zero = [0.0, 0.0, 0.0];
        let v = [1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &v), Some(0.0));
        assert_eq!(cosine_similarity(&v, &zero), Some(0.0));
        assert_eq!(cosine_similarity(&zero, &zero), Some(0.0));
        assert_eq!(cosine_similarity(&[], &[]), Some(0.0));
    }

    #[test]
    fn test_rank_example_scenario() {
        let records = [
            record("v1", 0.0, 2.0, vec![1.0, 0.0, 0.0]),
            record("v1", 2.0, 4.0, vec![0.0, 1.0, 0.0]),
        ];

        let ranking = rank(&[1.0, 0.0, 0.0], &records, 1, None);
        assert_eq!(ranking.results.len(), 1);
        assert_eq!(ranking.results[0].key, "v1_0.00_2.00");
        assert_eq!(ranking.results[0].score, 1.0);
        assert_eq!(ranking.results[0].source, "v1");

        let ranking = rank(&[1.0, 0.0, 0.0], &records, 5, None);
        assert_eq!(ranking.results.len(), 2);
    }

    #[test]
    fn test_rank_skips_mismatched_dimensions() {
        let records = [
            record("a", 0.0, 1.0, vec![1.0, 0.0, 0.0]),
            record("b", 0.0, 1.0, vec![1.0, 0.0]),
            record("c", 0.0, 1.0, vec![0.5, 0.5, 0.0]),
        ];

        let ranking = rank(&[1.0, 0.0, 0.0], &records, 5, None);
        let keys: Vec<&str> = ranking.results.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a_0.00_1.00", "c_0.00_1.00"]);
        assert_eq!(ranking.skipped, vec!["b_0.00_1.00"]);
    }

    #[test]
    fn test_rank_ties_broken_by_key() {
        let records = [
            record("zeta", 0.0, 1.0, vec![2.0, 0.0]),
            record("alpha", 0.0, 1.0, vec![1.0, 0.0]),
            record("mid", 0.0, 1.0, vec![3.0, 0.0]),
            record("low", 0.0, 1.0, vec![0.0, 1.0]),
        ];

        let ranking = rank(&[1.0, 0.0], &records, 3, None);
        let keys: Vec<&str> = ranking.results.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["alpha_0.00_1.00", "mid_0.00_1.00", "zeta_0.00_1.00"]);
    }

    #[test]
    fn test_rank_min_score() {
        let records = [
            record("a", 0.0, 1.0, vec![1.0, 0.0]),
            record("b", 0.0, 1.0, vec![1.0, 1.0]),
            record("c", 0.0, 1.0, vec![-1.0, 0.0]),
        ];

        let ranking = rank(&[1.0, 0.0], &records, 10, Some(0.5));
        assert_eq!(ranking.results.len(), 2);
        assert!(ranking.results.iter().all(|r| r.score >= 0.5));
    }

    #[test]
    fn test_rank_matches_full_sort() {
        // Deterministic pseudo-random stores of varying size.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            // Coarse values so that ties actually happen.
            ((seed % 7) as f32) - 3.0
        };

        for n in [0usize, 1, 2, 7, 40] {
            let records: Vec<EmbeddingRecord> = (0..n)
                .map(|i| record(&format!("s{}", i % 5), i as f64, i as f64 + 1.0, vec![next(), next(), next()]))
                .collect();
            let query = [next(), next(), 1.0];

            let mut expected: Vec<QueryResult> = records
                .iter()
                .map(|r| QueryResult::scored(r, cosine_similarity(&query, &r.embedding).unwrap()))
                .collect();
            expected.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));

            for k in [1usize, 3, 5, 100] {
                let ranking = rank(&query, &records, k, None);
                assert_eq!(ranking.results.len(), k.min(n));
                assert_eq!(ranking.results, expected[..k.min(n)].to_vec());
            }
        }
    }

    #[tokio::test]
    async fn test_search_engine() {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert_batch(&[
                record("beach.mp4", 0.0, 6.0, vec![1.0, 0.0, 0.0]),
                record("beach.mp4", 6.0, 12.0, vec![0.6, 0.8, 0.0]),
                record("city.mp4", 0.0, 6.0, vec![0.0, 0.0, 1.0]),
            ])
            .await
            .unwrap();

        let provider = Arc::new(FakeProvider::new().with_query("waves", vec![1.0, 0.0, 0.0]));
        let engine = SearchEngine::new(store, provider.clone(), "marengo3.0");

        let results = engine.search("waves", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].key, "beach.mp4_0.00_6.00");
        assert!((results[1].score - 0.6).abs() < EPS);
        assert_eq!(results[1].format_range(), "00:06 - 00:12");
        assert_eq!(provider.text_calls(), 1);
    }

    #[tokio::test]
    async fn test_search_rejects_bad_arguments() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = Arc::new(FakeProvider::new().with_query("q", vec![1.0]));
        let engine = SearchEngine::new(store, provider.clone(), "m");

        assert!(matches!(
            engine.search("q", 0).await.unwrap_err(),
            KikkError::InvalidArgument(_)
        ));
        assert!(matches!(
            engine.search("   ", 5).await.unwrap_err(),
            KikkError::InvalidArgument(_)
        ));
        assert_eq!(provider.text_calls(), 0);

        // Empty store is not an error.
        assert!(engine.search("q", DEFAULT_K).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_propagates_provider_failure() {
        let store = Arc::new(MemoryVectorStore::new());
        let provider = Arc::new(FakeProvider::new());
        provider.fail_with("auth rejected");
        let engine = SearchEngine::new(store, provider, "m");

        let err = engine.search("q", 1).await.unwrap_err();
        assert!(matches!(err, KikkError::ProviderFailure { .. }));
        assert!(err.to_string().contains("auth rejected"));
    }
}
