//! SQLite store — the naive backend shape.
//!
//! One table holds every record; embeddings are stored as little-endian
//! f32 BLOBs. Similarity search selects the candidate rows that pass the
//! exact-match filters and computes cosine similarity in-process, so it
//! is O(n) in the number of candidates. Fine for a single agent's
//! history, and the behavior oracle for the pgvector backend.

use async_trait::async_trait;
use chrono::Utc;
use loreagent_core::error::StoreError;
use loreagent_core::record::{MessageRecord, RecordKind, SimilarHit};
use loreagent_core::store::{RecordFilter, SimilarFilter, SimilarityStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// SQLite-backed similarity store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.initialize().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    /// Serialize an embedding vector to bytes.
    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize an embedding blob back into f32s.
    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    /// Parse a `MessageRecord` from a SQLite row.
    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<MessageRecord, StoreError> {
        let text: String = row
            .try_get("text")
            .map_err(|e| StoreError::QueryFailed(format!("text column: {e}")))?;
        let embedding: Vec<u8> = row
            .try_get("embedding")
            .map_err(|e| StoreError::QueryFailed(format!("embedding column: {e}")))?;
        let timestamp_str: String = row
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
        let original_embedding: Option<Vec<u8>> = row
            .try_get("original_embedding")
            .map_err(|e| StoreError::QueryFailed(format!("original_embedding column: {e}")))?;
        let classification: Option<String> = row
            .try_get("classification")
            .map_err(|e| StoreError::QueryFailed(format!("classification column: {e}")))?;
        let key_topics_json: Option<String> = row
            .try_get("key_topics")
            .map_err(|e| StoreError::QueryFailed(format!("key_topics column: {e}")))?;
        let tool_audit: Option<String> = row
            .try_get("tool_audit")
            .map_err(|e| StoreError::QueryFailed(format!("tool_audit column: {e}")))?;

        let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let key_topics: Option<Vec<String>> =
            key_topics_json.and_then(|json| serde_json::from_str(&json).ok());

        Ok(MessageRecord {
            text,
            embedding: Self::blob_to_embedding(&embedding),
            timestamp,
            kind: RecordKind::from(kind),
            conversation_id,
            source,
            original_query,
            original_embedding: original_embedding.map(|b| Self::blob_to_embedding(&b)),
            classification,
            key_topics,
            tool_audit,
        })
    }
}

#[async_trait]
impl SimilarityStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS message_records (
                id                 TEXT PRIMARY KEY,
                text               TEXT NOT NULL,
                embedding          BLOB NOT NULL,
                timestamp          TEXT NOT NULL,
                kind               TEXT NOT NULL,
                conversation_id    TEXT,
                source             TEXT,
                original_query     TEXT,
                original_embedding BLOB,
                classification     TEXT,
                key_topics         TEXT,
                tool_audit         TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("message_records table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_records_kind_ts ON message_records(kind, timestamp DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("kind/timestamp index: {e}")))?;

        debug!("SQLite schema ready");
        Ok(())
    }

    async fn store(&self, record: MessageRecord) -> Result<(), StoreError> {
        let key_topics_json = match &record.key_topics {
            Some(topics) => Some(
                serde_json::to_string(topics)
                    .map_err(|e| StoreError::Serialization(format!("key_topics: {e}")))?,
            ),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO message_records
                (id, text, embedding, timestamp, kind, conversation_id, source,
                 original_query, original_embedding, classification, key_topics, tool_audit)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&record.text)
        .bind(Self::embedding_to_blob(&record.embedding))
        .bind(record.timestamp.to_rfc3339())
        .bind(record.kind.as_str())
        .bind(&record.conversation_id)
        .bind(&record.source)
        .bind(&record.original_query)
        .bind(
            record
                .original_embedding
                .as_deref()
                .map(Self::embedding_to_blob),
        )
        .bind(&record.classification)
        .bind(key_topics_json)
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
        let mut sql = String::from("SELECT text, embedding FROM message_records WHERE 1=1");
        if filter.kind.is_some() {
            sql.push_str(" AND kind = ?");
        }
        if filter.conversation_id.is_some() {
            sql.push_str(" AND conversation_id = ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(kind) = &filter.kind {
            query = query.bind(kind.as_str());
        }
        if let Some(conv) = &filter.conversation_id {
            query = query.bind(conv);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("candidate scan: {e}")))?;

        let candidates: Vec<(String, Vec<f32>)> = rows
            .iter()
            .filter_map(|row| {
                let text: String = row.try_get("text").ok()?;
                let blob: Vec<u8> = row.try_get("embedding").ok()?;
                Some((text, Self::blob_to_embedding(&blob)))
            })
            .collect();

        Ok(crate::similarity::rank_hits(
            candidates.iter().map(|(t, e)| (t.as_str(), e.as_slice())),
            embedding,
            threshold,
        ))
    }

    async fn find(&self, filter: RecordFilter) -> Result<Vec<MessageRecord>, StoreError> {
        let mut sql = String::from("SELECT * FROM message_records WHERE 1=1");
        if filter.kind.is_some() {
            sql.push_str(" AND kind = ?");
        }
        if filter.original_query.is_some() {
            sql.push_str(" AND original_query = ?");
        }
        if filter.conversation_id.is_some() {
            sql.push_str(" AND conversation_id = ?");
        }
        sql.push_str(" ORDER BY timestamp DESC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(kind) = &filter.kind {
            query = query.bind(kind.as_str());
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
    use chrono::Duration;

    async fn test_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    fn make_record(text: &str, embedding: Vec<f32>, kind: RecordKind) -> MessageRecord {
        MessageRecord::new(text, embedding, kind)
    }

    #[tokio::test]
    async fn store_and_find_round_trip() {
        let db = test_store().await;
        let record = make_record("rust is fast", vec![0.1, 0.2, 0.3], RecordKind::user_message())
            .with_conversation("42")
            .with_source("telegram")
            .with_classification("FACTUAL")
            .with_key_topics(vec!["rust".into(), "performance".into()])
            .with_tool_audit(r#"{"tool_call":"current_time","processed":true,"args":{}}"#);
        db.store(record).await.unwrap();

        let results = db
            .find(RecordFilter::kind(RecordKind::user_message()))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.text, "rust is fast");
        assert_eq!(r.conversation_id.as_deref(), Some("42"));
        assert_eq!(r.source.as_deref(), Some("telegram"));
        assert_eq!(r.classification.as_deref(), Some("FACTUAL"));
        assert_eq!(r.key_topics.as_ref().unwrap().len(), 2);
        assert!(r.tool_audit.as_ref().unwrap().contains("current_time"));
        assert!((r.embedding[0] - 0.1).abs() < 1e-6);
        assert!((r.embedding[2] - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn find_similar_orders_descending() {
        let db = test_store().await;
        db.store(make_record("orthogonal", vec![0.0, 1.0], RecordKind::knowledge_base()))
            .await
            .unwrap();
        db.store(make_record("identical", vec![1.0, 0.0], RecordKind::knowledge_base()))
            .await
            .unwrap();
        db.store(make_record("partial", vec![0.5, 0.5], RecordKind::knowledge_base()))
            .await
            .unwrap();

        let hits = db
            .find_similar(&[1.0, 0.0], 0.0, SimilarFilter::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, "identical");
        assert_eq!(hits[1].text, "partial");
        assert_eq!(hits[2].text, "orthogonal");
    }

    #[tokio::test]
    async fn find_similar_threshold_inclusive() {
        let db = test_store().await;
        db.store(make_record("exact", vec![2.0, 0.0], RecordKind::knowledge_base()))
            .await
            .unwrap();

        let hits = db
            .find_similar(&[1.0, 0.0], 1.0, SimilarFilter::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn find_similar_filters_by_kind_and_conversation() {
        let db = test_store().await;
        db.store(
            make_record("in conv", vec![1.0, 0.0], RecordKind::agent_response())
                .with_conversation("a"),
        )
        .await
        .unwrap();
        db.store(
            make_record("other conv", vec![1.0, 0.0], RecordKind::agent_response())
                .with_conversation("b"),
        )
        .await
        .unwrap();
        db.store(make_record("kb", vec![1.0, 0.0], RecordKind::knowledge_base()))
            .await
            .unwrap();

        let hits = db
            .find_similar(
                &[1.0, 0.0],
                0.5,
                SimilarFilter::kind(RecordKind::agent_response()).with_conversation("a"),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "in conv");
    }

    #[tokio::test]
    async fn find_orders_by_timestamp_descending_with_limit() {
        let db = test_store().await;
        let base = Utc::now();
        for i in 0..5 {
            let mut r = make_record(&format!("r{i}"), vec![1.0], RecordKind::agent_response());
            r.timestamp = base + Duration::seconds(i);
            db.store(r).await.unwrap();
        }

        let results = db
            .find(RecordFilter::kind(RecordKind::agent_response()).with_limit(2))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "r4");
        assert_eq!(results[1].text, "r3");
    }

    #[tokio::test]
    async fn original_query_back_reference_round_trip() {
        let db = test_store().await;
        let r = make_record("the answer", vec![0.2, 0.8], RecordKind::agent_response())
            .with_original_query("the question", vec![0.3, 0.7]);
        db.store(r).await.unwrap();

        let results = db
            .find(
                RecordFilter::kind(RecordKind::agent_response())
                    .with_original_query("the question"),
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].original_query.as_deref(), Some("the question"));
        let orig = results[0].original_embedding.as_ref().unwrap();
        assert!((orig[0] - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn unknown_kind_round_trips() {
        let db = test_store().await;
        db.store(make_record("custom", vec![1.0], RecordKind::from("weekly_digest")))
            .await
            .unwrap();

        let results = db
            .find(RecordFilter::kind(RecordKind::from("weekly_digest")))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind.as_str(), "weekly_digest");
    }

    #[tokio::test]
    async fn backend_name() {
        let db = test_store().await;
        assert_eq!(db.name(), "sqlite");
    }
}
