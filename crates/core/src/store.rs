//! The similarity store abstraction.
//!
//! Backends store [`MessageRecord`]s and answer two queries:
//! - `find_similar`: cosine similarity against a query embedding, with an
//!   inclusive threshold, ordered most-similar first
//! - `find`: exact metadata filters, ordered newest first
//!
//! Implementations live in the `loreagent-store` crate: an in-memory
//! backend, a SQLite backend that scans candidates in-process, and a
//! Postgres backend that pushes the similarity computation into pgvector.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{MessageRecord, RecordKind, SimilarHit};

/// Exact-match filters for similarity search.
#[derive(Debug, Clone, Default)]
pub struct SimilarFilter {
    /// Restrict to records of this kind.
    pub kind: Option<RecordKind>,

    /// Restrict to one conversation.
    pub conversation_id: Option<String>,
}

impl SimilarFilter {
    pub fn kind(kind: RecordKind) -> Self {
        Self {
            kind: Some(kind),
            conversation_id: None,
        }
    }

    pub fn with_conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }
}

/// Exact-match filters for metadata lookup.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub kind: Option<RecordKind>,
    pub original_query: Option<String>,
    pub conversation_id: Option<String>,

    /// Applied after ordering by timestamp descending.
    pub limit: Option<usize>,
}

impl RecordFilter {
    pub fn kind(kind: RecordKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn with_conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn with_original_query(mut self, query: impl Into<String>) -> Self {
        self.original_query = Some(query.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Storage backend for message records and similarity search.
///
/// Invariants all backends uphold:
/// - `find_similar` includes rows at exactly the threshold (`>=`), ordered
///   by similarity descending
/// - `find` orders by timestamp descending, then applies `limit`
/// - stored records are never mutated; there is no update operation
#[async_trait]
pub trait SimilarityStore: Send + Sync {
    /// Backend name for logging and diagnostics.
    fn name(&self) -> &str;

    /// Create tables/indexes as needed. Idempotent.
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Append one record.
    async fn store(&self, record: MessageRecord) -> Result<(), StoreError>;

    /// Rows whose cosine similarity to `embedding` is `>= threshold`,
    /// most similar first.
    async fn find_similar(
        &self,
        embedding: &[f32],
        threshold: f32,
        filter: SimilarFilter,
    ) -> Result<Vec<SimilarHit>, StoreError>;

    /// Full records matching the exact filters, newest first.
    async fn find(&self, filter: RecordFilter) -> Result<Vec<MessageRecord>, StoreError>;

    /// Release connections. Further calls may fail.
    async fn close(&self) -> Result<(), StoreError>;
}
