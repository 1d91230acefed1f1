//! Knowledge base loading.
//!
//! Reads a JSON file of knowledge entries, flattens each to text,
//! embeds it, and stores anything the agent does not already know.
//! Near-duplicates of stored knowledge are skipped.

use std::path::Path;

use loreagent_core::error::{Error, StoreError};
use loreagent_core::record::{MessageRecord, RecordKind};
use loreagent_core::store::SimilarFilter;
use tracing::{debug, info};

use crate::pipeline::AgentCore;

/// Outcome of a load: how many entries went in and how many were
/// already known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnowledgeStats {
    pub loaded: usize,
    pub skipped: usize,
}

/// Load a knowledge file into the store. The file holds either a JSON
/// array of objects or a single object.
pub async fn load_knowledge(core: &AgentCore, path: &Path) -> Result<KnowledgeStats, Error> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::Store(StoreError::Storage(format!(
            "reading {}: {e}",
            path.display()
        )))
    })?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;

    let entries: Vec<&serde_json::Map<String, serde_json::Value>> = match &parsed {
        serde_json::Value::Array(items) => items.iter().filter_map(|v| v.as_object()).collect(),
        serde_json::Value::Object(obj) => vec![obj],
        _ => {
            return Err(Error::Store(StoreError::Serialization(
                "knowledge file must be a JSON object or array of objects".into(),
            )))
        }
    };

    let dedup_threshold = core.config.retrieval.dedup_threshold;
    let mut stats = KnowledgeStats {
        loaded: 0,
        skipped: 0,
    };

    for entry in entries {
        let text = flatten_entry(entry);
        if text.is_empty() {
            stats.skipped += 1;
            continue;
        }

        let embedding = core.embeddings.embed(&text).await.map_err(Error::Provider)?;
        let existing = core
            .store
            .find_similar(
                &embedding,
                dedup_threshold,
                SimilarFilter::kind(RecordKind::knowledge_base()),
            )
            .await
            .map_err(Error::Store)?;
        if !existing.is_empty() {
            debug!(similarity = existing[0].similarity, "Skipping near-duplicate entry");
            stats.skipped += 1;
            continue;
        }

        let topics: Vec<String> = entry.keys().take(3).cloned().collect();
        let record = MessageRecord::new(text, embedding, RecordKind::knowledge_base())
            .with_classification("FACTUAL")
            .with_key_topics(topics);
        core.store.store(record).await.map_err(Error::Store)?;
        stats.loaded += 1;
    }

    info!(
        loaded = stats.loaded,
        skipped = stats.skipped,
        path = %path.display(),
        "Knowledge load complete"
    );
    Ok(stats)
}

/// Flatten an object to `key: value` lines separated by blank lines.
/// Scalars render directly; nested values render as compact JSON.
fn flatten_entry(entry: &serde_json::Map<String, serde_json::Value>) -> String {
    let lines: Vec<String> = entry
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Null => "null".into(),
                nested => nested.to_string(),
            };
            format!("{key}: {rendered}")
        })
        .collect();
    lines.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_scalars_directly() {
        let entry = serde_json::json!({
            "name": "Lore",
            "age": 3,
            "active": true
        });
        let text = flatten_entry(entry.as_object().unwrap());
        assert!(text.contains("name: Lore"));
        assert!(text.contains("age: 3"));
        assert!(text.contains("active: true"));
        assert!(text.contains("\n\n"));
    }

    #[test]
    fn nested_values_render_as_compact_json() {
        let entry = serde_json::json!({
            "traits": {"curious": true},
            "tags": ["a", "b"]
        });
        let text = flatten_entry(entry.as_object().unwrap());
        assert!(text.contains(r#"traits: {"curious":true}"#));
        assert!(text.contains(r#"tags: ["a","b"]"#));
    }

    #[test]
    fn empty_object_flattens_to_empty() {
        let entry = serde_json::Map::new();
        assert!(flatten_entry(&entry).is_empty());
    }
}
