//! PostgreSQL + pgvector store — the database-native backend shape.
//!
//! Unlike the naive backends, similarity search never leaves the
//! database: pgvector's `<=>` cosine-distance operator scores, filters,
//! and orders rows in SQL. Observable behavior is identical to the
//! in-process backends (inclusive threshold, similarity descending).
//!
//! # Setup
//!
//! ```sql
//! CREATE EXTENSION IF NOT EXISTS vector;
//! ```
//!
//! # Feature gate
//!
//! This module is behind the `postgres` feature flag:
//!
//! ```toml
//! loreagent-store = { workspace = true, features = ["postgres"] }
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use tracing::{debug, info};

use loreagent_core::error::StoreError;
use loreagent_core::record::{MessageRecord, RecordKind, SimilarHit};
use loreagent_core::store::{RecordFilter, SimilarFilter, SimilarityStore};

/// PostgreSQL similarity store backed by pgvector.
pub struct PgVectorStore {
    pool: PgPool,
    /// Dimension of embedding vectors (default 1024 for bge-large).
    embedding_dim: usize,
}

impl PgVectorStore {
    /// Create a new store from a connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Storage(format!("PostgreSQL connection failed: {e}")))?;

        info!("Connected to PostgreSQL for similarity store");
        Ok(Self {
            pool,
            embedding_dim: 1024,
        })
    }

    /// Create from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            embedding_dim: 1024,
        }
    }

    /// Set the embedding dimension (default: 1024).
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Render an embedding as a pgvector literal, e.g. `[0.1,0.2]`.
    fn vector_literal(embedding: &[f32]) -> String {
        let mut s = String::with_capacity(embedding.len() * 10 + 2);
        s.push('[');
        for (i, v) in embedding.iter().enumerate() {
            if i > 0 {
                s.push(',');
            }
            s.push_str(&v.to_string());
        }
        s.push(']');
        s
    }

    /// Parse a pgvector text representation back into f32s.
    fn parse_vector(text: &str) -> Vec<f32> {
        text.trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .filter_map(|v| v.trim().parse::<f32>().ok())
            .collect()
    }

    fn row_to_record(row: &PgRow) -> Result<MessageRecord, StoreError> {
        let text: String = row
            .try_get("text")
            .map_err(|e| StoreError::QueryFailed(format!("text column: {e}")))?;
        let embedding_text: String = row
            .try_get("embedding_text")
            .map_err(|e| StoreError::QueryFailed(format!("embedding column: {e}")))?;
        let timestamp: chrono::DateTime<Utc> = row
            .try_get("timestamp")
            .map_err(|e| StoreError::QueryFailed(format!("timestamp column: {e}")))?;
        let kind: String = row
            .try_get("kind")
            .map_err(|e| StoreError::QueryFailed(format!("kind column: {e}")))?;
        let conversation_id: Option<String> = row
            .try_get("conversation_id")
            .map_err(|e| StoreError::QueryFailed(format!("conversation_id column: {e}")))?;
        let source: Option<String> = row
            .try_get("source")
            .map_err(|e| StoreError::QueryFailed(format!("source column: {e}")))?;
        let original_query: Option<String> = row
            .try_get("original_query")
            .map_err(|e| StoreError::QueryFailed(format!("original_query column: {e}")))?;
        let original_embedding_text: Option<String> = row
            .try_get("original_embedding_text")
            .map_err(|e| StoreError::QueryFailed(format!("original_embedding column: {e}")))?;
        let classification: Option<String> = row
            .try_get("classification")
            .map_err(|e| StoreError::QueryFailed(format!("classification column: {e}")))?;
        let key_topics: Option<Vec<String>> = row
            .try_get("key_topics")
            .map_err(|e| StoreError::QueryFailed(format!("key_topics column: {e}")))?;
        let tool_audit: Option<String> = row
            .try_get("tool_audit")
            .map_err(|e| StoreError::QueryFailed(format!("tool_audit column: {e}")))?;

        Ok(MessageRecord {
            text,
            embedding: Self::parse_vector(&embedding_text),
            timestamp,
            kind: RecordKind::from(kind),
            conversation_id,
            source,
            original_query,
            original_embedding: original_embedding_text.as_deref().map(Self::parse_vector),
            classification,
            key_topics,
            tool_audit,
        })
    }
}

#[async_trait]
impl SimilarityStore for PgVectorStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("vector extension: {e}")))?;

        let dim = self.embedding_dim;
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS message_records (
                id                 BIGSERIAL PRIMARY KEY,
                text               TEXT NOT NULL,
                embedding          vector({dim}) NOT NULL,
                timestamp          TIMESTAMPTZ NOT NULL,
                kind               TEXT NOT NULL,
                conversation_id    TEXT,
                source             TEXT,
                original_query     TEXT,
                original_embedding vector({dim}),
                classification     TEXT,
                key_topics         TEXT[],
                tool_audit         TEXT
            )
            "#
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("message_records table: {e}")))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_records_embedding
            ON message_records USING ivfflat (embedding vector_cosine_ops)
            WITH (lists = 100)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("ivfflat index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_records_kind_ts ON message_records(kind, timestamp DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("kind/timestamp index: {e}")))?;

        info!("pgvector schema ready (dim = {dim})");
        Ok(())
    }

    async fn store(&self, record: MessageRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO message_records
                (text, embedding, timestamp, kind, conversation_id, source,
                 original_query, original_embedding, classification, key_topics, tool_audit)
            VALUES ($1, $2::vector, $3, $4, $5, $6, $7, $8::vector, $9, $10, $11)
            "#,
        )
        .bind(&record.text)
        .bind(Self::vector_literal(&record.embedding))
        .bind(record.timestamp)
        .bind(record.kind.as_str())
        .bind(&record.conversation_id)
        .bind(&record.source)
        .bind(&record.original_query)
        .bind(
            record
                .original_embedding
                .as_deref()
                .map(Self::vector_literal),
        )
        .bind(&record.classification)
        .bind(&record.key_topics)
        .bind(&record.tool_audit)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT failed: {e}")))?;

        debug!(kind = %record.kind, "stored record");
        Ok(())
    }

    async fn find_similar(
        &self,
        embedding: &[f32],
        threshold: f32,
        filter: SimilarFilter,
    ) -> Result<Vec<SimilarHit>, StoreError> {
        // Similarity computed twice is fine; the planner folds it, and the
        // inclusive >= matches the naive backends exactly.
        let mut sql = String::from(
            "SELECT text, 1 - (embedding <=> $1::vector) AS similarity \
             FROM message_records \
             WHERE 1 - (embedding <=> $1::vector) >= $2",
        );
        let mut next_param = 3;
        if filter.kind.is_some() {
            sql.push_str(&format!(" AND kind = ${next_param}"));
            next_param += 1;
        }
        if filter.conversation_id.is_some() {
            sql.push_str(&format!(" AND conversation_id = ${next_param}"));
        }
        sql.push_str(" ORDER BY similarity DESC");

        let mut query = sqlx::query(&sql)
            .bind(Self::vector_literal(embedding))
            .bind(threshold as f64);
        if let Some(kind) = &filter.kind {
            query = query.bind(kind.as_str().to_string());
        }
        if let Some(conv) = &filter.conversation_id {
            query = query.bind(conv);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("similarity search: {e}")))?;

        rows.iter()
            .map(|row| {
                let text: String = row
                    .try_get("text")
                    .map_err(|e| StoreError::QueryFailed(format!("text column: {e}")))?;
                let similarity: f64 = row
                    .try_get("similarity")
                    .map_err(|e| StoreError::QueryFailed(format!("similarity column: {e}")))?;
                Ok(SimilarHit {
                    text,
                    similarity: similarity as f32,
                })
            })
            .collect()
    }

    async fn find(&self, filter: RecordFilter) -> Result<Vec<MessageRecord>, StoreError> {
        let mut sql = String::from(
            "SELECT text, embedding::text AS embedding_text, timestamp, kind, \
             conversation_id, source, original_query, \
             original_embedding::text AS original_embedding_text, \
             classification, key_topics, tool_audit \
             FROM message_records WHERE TRUE",
        );
        let mut next_param = 1;
        if filter.kind.is_some() {
            sql.push_str(&format!(" AND kind = ${next_param}"));
            next_param += 1;
        }
        if filter.original_query.is_some() {
            sql.push_str(&format!(" AND original_query = ${next_param}"));
            next_param += 1;
        }
        if filter.conversation_id.is_some() {
            sql.push_str(&format!(" AND conversation_id = ${next_param}"));
            next_param += 1;
        }
        sql.push_str(" ORDER BY timestamp DESC");
        if filter.limit.is_some() {
            sql.push_str(&format!(" LIMIT ${next_param}"));
        }

        let mut query = sqlx::query(&sql);
        if let Some(kind) = &filter.kind {
            query = query.bind(kind.as_str().to_string());
        }
        if let Some(orig) = &filter.original_query {
            query = query.bind(orig);
        }
        if let Some(conv) = &filter.conversation_id {
            query = query.bind(conv);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit as i64);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("find: {e}")))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_literal_formatting() {
        assert_eq!(PgVectorStore::vector_literal(&[0.5, -1.0, 2.0]), "[0.5,-1,2]");
        assert_eq!(PgVectorStore::vector_literal(&[]), "[]");
    }

    #[test]
    fn parse_vector_round_trip() {
        let v = vec![0.25f32, -0.5, 1.0];
        let literal = PgVectorStore::vector_literal(&v);
        let parsed = PgVectorStore::parse_vector(&literal);
        assert_eq!(parsed, v);
    }

    #[test]
    fn parse_vector_handles_spaces() {
        assert_eq!(PgVectorStore::parse_vector("[0.1, 0.2, 0.3]"), vec![0.1, 0.2, 0.3]);
    }
}
