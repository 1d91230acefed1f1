//! In-memory store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use loreagent_core::error::StoreError;
use loreagent_core::record::{MessageRecord, SimilarHit};
use loreagent_core::store::{RecordFilter, SimilarFilter, SimilarityStore};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::similarity::rank_hits;

/// A store that keeps records in a Vec and scans them on every query.
/// The reference implementation of the naive backend shape.
pub struct MemoryStore {
    records: Arc<RwLock<Vec<MessageRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_similar(record: &MessageRecord, filter: &SimilarFilter) -> bool {
    if let Some(kind) = &filter.kind {
        if record.kind != *kind {
            return false;
        }
    }
    if let Some(conv) = &filter.conversation_id {
        if record.conversation_id.as_deref() != Some(conv.as_str()) {
            return false;
        }
    }
    true
}

fn matches_filter(record: &MessageRecord, filter: &RecordFilter) -> bool {
    if let Some(kind) = &filter.kind {
        if record.kind != *kind {
            return false;
        }
    }
    if let Some(query) = &filter.original_query {
        if record.original_query.as_deref() != Some(query.as_str()) {
            return false;
        }
    }
    if let Some(conv) = &filter.conversation_id {
        if record.conversation_id.as_deref() != Some(conv.as_str()) {
            return false;
        }
    }
    true
}

#[async_trait]
impl SimilarityStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn store(&self, record: MessageRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn find_similar(
        &self,
        embedding: &[f32],
        threshold: f32,
        filter: SimilarFilter,
    ) -> Result<Vec<SimilarHit>, StoreError> {
        let records = self.records.read().await;
        let candidates = records
            .iter()
            .filter(|r| matches_similar(r, &filter))
            .map(|r| (r.text.as_str(), r.embedding.as_slice()));
        Ok(rank_hits(candidates, embedding, threshold))
    }

    async fn find(&self, filter: RecordFilter) -> Result<Vec<MessageRecord>, StoreError> {
        let records = self.records.read().await;
        let mut results: Vec<MessageRecord> = records
            .iter()
            .filter(|r| matches_filter(r, &filter))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = filter.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;
    use chrono::{Duration, Utc};
    use loreagent_core::record::RecordKind;

    fn record(text: &str, embedding: Vec<f32>, kind: RecordKind) -> MessageRecord {
        MessageRecord::new(text, embedding, kind)
    }

    #[tokio::test]
    async fn store_and_find() {
        let store = MemoryStore::new();
        store
            .store(record("hello", vec![1.0, 0.0], RecordKind::user_message()))
            .await
            .unwrap();

        let results = store
            .find(RecordFilter::kind(RecordKind::user_message()))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "hello");
    }

    #[tokio::test]
    async fn find_similar_matches_brute_force_oracle() {
        let store = MemoryStore::new();
        // Deterministic pseudo-random embeddings.
        let embeddings: Vec<Vec<f32>> = (0..50)
            .map(|i| {
                (0..8)
                    .map(|j| ((i * 31 + j * 17) % 13) as f32 / 13.0 - 0.5)
                    .collect()
            })
            .collect();
        for (i, emb) in embeddings.iter().enumerate() {
            store
                .store(record(
                    &format!("msg-{i}"),
                    emb.clone(),
                    RecordKind::user_message(),
                ))
                .await
                .unwrap();
        }

        let query: Vec<f32> = (0..8).map(|j| ((j * 7) % 5) as f32 / 5.0).collect();
        let threshold = 0.3;
        let hits = store
            .find_similar(&query, threshold, SimilarFilter::default())
            .await
            .unwrap();

        // Oracle: score everything, filter, sort descending.
        let mut expected: Vec<(String, f32)> = embeddings
            .iter()
            .enumerate()
            .map(|(i, e)| (format!("msg-{i}"), cosine_similarity(e, &query)))
            .filter(|(_, s)| *s >= threshold)
            .collect();
        expected.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        assert_eq!(hits.len(), expected.len());
        for (hit, (text, sim)) in hits.iter().zip(expected.iter()) {
            assert_eq!(&hit.text, text);
            assert!((hit.similarity - sim).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn find_similar_threshold_inclusive() {
        let store = MemoryStore::new();
        store
            .store(record("match", vec![1.0, 0.0], RecordKind::knowledge_base()))
            .await
            .unwrap();

        // Identical vector: similarity exactly 1.0, threshold 1.0 keeps it.
        let hits = store
            .find_similar(&[1.0, 0.0], 1.0, SimilarFilter::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn find_similar_respects_kind_filter() {
        let store = MemoryStore::new();
        store
            .store(record("kb", vec![1.0, 0.0], RecordKind::knowledge_base()))
            .await
            .unwrap();
        store
            .store(record("user", vec![1.0, 0.0], RecordKind::user_message()))
            .await
            .unwrap();

        let hits = store
            .find_similar(
                &[1.0, 0.0],
                0.5,
                SimilarFilter::kind(RecordKind::knowledge_base()),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "kb");
    }

    #[tokio::test]
    async fn find_orders_newest_first_and_limits() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for i in 0..5 {
            let mut r = record(
                &format!("r{i}"),
                vec![1.0, 0.0],
                RecordKind::agent_response(),
            );
            r.timestamp = base + Duration::seconds(i);
            store.store(r).await.unwrap();
        }

        let results = store
            .find(RecordFilter::kind(RecordKind::agent_response()).with_limit(3))
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].text, "r4");
        assert_eq!(results[1].text, "r3");
        assert_eq!(results[2].text, "r2");
    }

    #[tokio::test]
    async fn find_filters_by_original_query() {
        let store = MemoryStore::new();
        let r = record("reply", vec![0.5, 0.5], RecordKind::agent_response())
            .with_original_query("what is rust?", vec![0.1, 0.2]);
        store.store(r).await.unwrap();
        store
            .store(record("other", vec![0.5, 0.5], RecordKind::agent_response()))
            .await
            .unwrap();

        let results = store
            .find(
                RecordFilter::kind(RecordKind::agent_response())
                    .with_original_query("what is rust?"),
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "reply");
    }

    #[tokio::test]
    async fn records_are_immutable_no_update_path() {
        let store = MemoryStore::new();
        store
            .store(record("v1", vec![1.0, 0.0], RecordKind::user_message()))
            .await
            .unwrap();
        store
            .store(record("v1", vec![1.0, 0.0], RecordKind::user_message()))
            .await
            .unwrap();

        // Storing the same text twice appends; nothing is overwritten.
        let results = store
            .find(RecordFilter::kind(RecordKind::user_message()))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }
}
