//! Context block assembly.
//!
//! Turns retrieval results into the text blocks woven into the system
//! prompt. Every builder returns `None` when it has nothing to add so
//! callers can skip the section entirely.

use loreagent_core::record::{MessageRecord, SimilarHit};

/// Knowledge entries relevant to the current message, framed as facts
/// the model must take as given.
pub fn knowledge_block(hits: &[SimilarHit]) -> Option<String> {
    if hits.is_empty() {
        return None;
    }
    let mut block = String::from("Consider the following as facts when responding:\n");
    for hit in hits {
        block.push_str("- ");
        block.push_str(&hit.text);
        block.push('\n');
    }
    Some(block)
}

/// Prior exchanges from this conversation, oldest first.
///
/// `records` arrive newest-first from the store and are replayed in
/// chronological order here.
pub fn conversation_block(records: &[MessageRecord]) -> Option<String> {
    if records.is_empty() {
        return None;
    }
    let mut block = String::from("Recent conversation:\n");
    for record in records.iter().rev() {
        if let Some(query) = &record.original_query {
            block.push_str("User: ");
            block.push_str(query);
            block.push('\n');
        }
        block.push_str("Agent: ");
        block.push_str(&record.text);
        block.push('\n');
    }
    Some(block)
}

/// Past responses to messages similar to this one, deduplicated by
/// response text and capped at `limit`. The framing steers the model
/// away from repeating itself.
pub fn similar_block(hits: &[SimilarHit], limit: usize) -> Option<String> {
    if hits.is_empty() || limit == 0 {
        return None;
    }
    let mut seen = Vec::new();
    for hit in hits {
        if seen.iter().any(|s: &&str| *s == hit.text) {
            continue;
        }
        seen.push(hit.text.as_str());
        if seen.len() == limit {
            break;
        }
    }
    let mut block = String::from(
        "You have responded to similar messages before; provide a response that \
         differs from these recent replies and do not use the same words:\n",
    );
    for text in seen {
        block.push_str("- ");
        block.push_str(text);
        block.push('\n');
    }
    Some(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loreagent_core::record::RecordKind;

    fn hit(text: &str, similarity: f32) -> SimilarHit {
        SimilarHit {
            text: text.into(),
            similarity,
        }
    }

    #[test]
    fn empty_inputs_give_no_block() {
        assert!(knowledge_block(&[]).is_none());
        assert!(conversation_block(&[]).is_none());
        assert!(similar_block(&[], 10).is_none());
    }

    #[test]
    fn knowledge_lists_every_hit_framed_as_facts() {
        let block = knowledge_block(&[hit("a fact", 0.9), hit("another", 0.7)]).unwrap();
        assert!(block.starts_with("Consider the following as facts"));
        assert!(block.contains("- a fact"));
        assert!(block.contains("- another"));
    }

    #[test]
    fn conversation_is_replayed_chronologically() {
        let older = MessageRecord::new("first reply", vec![], RecordKind::agent_response())
            .with_original_query("first question", vec![]);
        let newer = MessageRecord::new("second reply", vec![], RecordKind::agent_response())
            .with_original_query("second question", vec![]);

        // Newest-first, the store's ordering.
        let block = conversation_block(&[newer, older]).unwrap();
        let first = block.find("first reply").unwrap();
        let second = block.find("second reply").unwrap();
        assert!(first < second);
        assert!(block.contains("User: first question"));
    }

    #[test]
    fn similar_dedupes_and_caps() {
        let hits = vec![
            hit("same answer", 0.95),
            hit("same answer", 0.93),
            hit("different", 0.91),
            hit("third", 0.90),
        ];
        let block = similar_block(&hits, 2).unwrap();
        assert_eq!(block.matches("same answer").count(), 1);
        assert!(block.contains("different"));
        assert!(!block.contains("third"));
    }

    #[test]
    fn similar_block_tells_the_model_not_to_repeat_itself() {
        let block = similar_block(&[hit("old reply", 0.95)], 10).unwrap();
        assert!(block.contains("differs from these recent replies"));
        assert!(block.contains("do not use the same words"));
    }
}
