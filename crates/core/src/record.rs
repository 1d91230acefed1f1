//! Message records — the unit of storage for the similarity store.
//!
//! A [`MessageRecord`] pairs a piece of text with its embedding and the
//! metadata the agent needs to reconstruct context later: which
//! conversation it belongs to, which interface it arrived on, what query
//! produced it, and any tool audit attached to it. Records are immutable
//! once stored; history is append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role a record plays in the store.
///
/// This is an open set: the well-known kinds have associated constants,
/// but any string round-trips unchanged so callers can introduce new
/// kinds without touching this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKind(String);

impl RecordKind {
    /// An inbound message from a user.
    pub fn user_message() -> Self {
        Self("user_message".into())
    }

    /// A reply the agent produced.
    pub fn agent_response() -> Self {
        Self("agent_response".into())
    }

    /// A curated knowledge-base entry.
    pub fn knowledge_base() -> Self {
        Self("knowledge_base".into())
    }

    /// An intermediate chain-of-thought step (not shown to users).
    pub fn reasoning_step() -> Self {
        Self("reasoning_step".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordKind {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordKind {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for RecordKind {
    fn default() -> Self {
        Self::user_message()
    }
}

/// A single stored message with its embedding and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Raw message text.
    pub text: String,

    /// Dense embedding of `text`. Skipped in JSON serialization; backends
    /// persist it in their own representation.
    #[serde(skip)]
    pub embedding: Vec<f32>,

    /// When the record was created.
    pub timestamp: DateTime<Utc>,

    /// What role this record plays (user message, agent response, ...).
    pub kind: RecordKind,

    /// Conversation identifier. Absent ids are canonicalized to the
    /// literal string "None" before storage (see
    /// [`canonical_conversation_id`]).
    pub conversation_id: Option<String>,

    /// Name of the interface the message arrived on.
    pub source: Option<String>,

    /// For responses: the query text that produced this record.
    pub original_query: Option<String>,

    /// For responses: the embedding of `original_query`.
    #[serde(skip)]
    pub original_embedding: Option<Vec<f32>>,

    /// Coarse classification of a response (FACTUAL, OPINION, ...).
    pub classification: Option<String>,

    /// Extracted topic keywords.
    pub key_topics: Option<Vec<String>>,

    /// Serialized tool audit from [`crate::tool::ToolDispatch`], if a
    /// tool ran while producing this record.
    pub tool_audit: Option<String>,
}

impl MessageRecord {
    /// Create a record with the current timestamp and no optional
    /// metadata.
    pub fn new(text: impl Into<String>, embedding: Vec<f32>, kind: RecordKind) -> Self {
        Self {
            text: text.into(),
            embedding,
            timestamp: Utc::now(),
            kind,
            conversation_id: None,
            source: None,
            original_query: None,
            original_embedding: None,
            classification: None,
            key_topics: None,
            tool_audit: None,
        }
    }

    pub fn with_conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_original_query(mut self, query: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.original_query = Some(query.into());
        self.original_embedding = Some(embedding);
        self
    }

    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    pub fn with_key_topics(mut self, topics: Vec<String>) -> Self {
        self.key_topics = Some(topics);
        self
    }

    pub fn with_tool_audit(mut self, audit: impl Into<String>) -> Self {
        self.tool_audit = Some(audit.into());
        self
    }
}

/// A similarity-search hit: the stored text and its cosine similarity to
/// the query embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarHit {
    pub text: String,
    pub similarity: f32,
}

/// Canonicalize an optional conversation id to the string form used in
/// storage and filtering. An absent id becomes the literal string
/// "None"; downstream filters key off that exact value, so it must be
/// produced consistently.
pub fn canonical_conversation_id(id: Option<&str>) -> String {
    match id {
        Some(s) => s.to_string(),
        None => "None".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_kind_roundtrips_unknown_values() {
        let kind: RecordKind = "weekly_digest".into();
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, "\"weekly_digest\"");
        let back: RecordKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kind);
    }

    #[test]
    fn builder_sets_metadata() {
        let record = MessageRecord::new("hello", vec![0.1, 0.2], RecordKind::agent_response())
            .with_conversation("42")
            .with_original_query("hi", vec![0.3, 0.4])
            .with_classification("FACTUAL")
            .with_key_topics(vec!["greeting".into()]);

        assert_eq!(record.conversation_id.as_deref(), Some("42"));
        assert_eq!(record.original_query.as_deref(), Some("hi"));
        assert_eq!(record.classification.as_deref(), Some("FACTUAL"));
        assert_eq!(record.key_topics.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn absent_conversation_id_becomes_none_literal() {
        assert_eq!(canonical_conversation_id(None), "None");
        assert_eq!(canonical_conversation_id(Some("chat-7")), "chat-7");
    }

    #[test]
    fn embedding_is_not_serialized() {
        let record = MessageRecord::new("x", vec![1.0, 2.0], RecordKind::user_message());
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("embedding"));
    }
}
