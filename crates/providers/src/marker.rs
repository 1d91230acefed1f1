//! Textual tool-call marker normalization.
//!
//! Some models emit tool calls as inline text instead of the structured
//! field: `<function=NAME>{"arg": "value"}</function>`. The closing tag
//! comes in several sloppy variants in the wild (`</function>`,
//! `<function>`, `<function/>`, `></function>`), all of which are
//! accepted here. Providers run this over response text so callers only
//! ever see structured [`RequestedToolCall`]s.

use loreagent_core::provider::RequestedToolCall;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<function=([A-Za-z0-9_\-]+)>?\s*(\{.*?\})\s*(?:</function>|<function>|<function/>|></function>)",
    )
    .unwrap_or_else(|e| panic!("marker regex: {e}"))
});

/// Extract the first tool-call marker from `text`.
///
/// Returns the parsed call and the text with the marker removed. Returns
/// `None` when there is no marker or its arguments are not valid JSON
/// (in which case the text is passed through untouched).
pub fn extract_marker_call(text: &str) -> Option<(RequestedToolCall, String)> {
    let captures = MARKER_RE.captures(text)?;
    let full = captures.get(0)?;
    let name = captures.get(1)?.as_str().to_string();
    let raw_args = captures.get(2)?.as_str();

    let arguments: serde_json::Value = match serde_json::from_str(raw_args) {
        Ok(v) => v,
        Err(e) => {
            warn!(tool = %name, error = %e, "tool marker carried invalid JSON, ignoring");
            return None;
        }
    };

    let mut cleaned = String::with_capacity(text.len());
    cleaned.push_str(&text[..full.start()]);
    cleaned.push_str(&text[full.end()..]);

    Some((
        RequestedToolCall { name, arguments },
        cleaned.trim().to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_well_formed_marker() {
        let text = r#"Sure! <function=crypto_price>{"symbol": "BTC"}</function>"#;
        let (call, cleaned) = extract_marker_call(text).unwrap();
        assert_eq!(call.name, "crypto_price");
        assert_eq!(call.arguments["symbol"], "BTC");
        assert_eq!(cleaned, "Sure!");
    }

    #[test]
    fn accepts_sloppy_closing_variants() {
        for closing in ["</function>", "<function>", "<function/>", "></function>"] {
            let text = format!(r#"<function=current_time>{{}}{closing}"#);
            let (call, _) = extract_marker_call(&text)
                .unwrap_or_else(|| panic!("variant {closing} not accepted"));
            assert_eq!(call.name, "current_time");
        }
    }

    #[test]
    fn rejects_invalid_json_arguments() {
        let text = r#"<function=crypto_price>{not json}</function>"#;
        assert!(extract_marker_call(text).is_none());
    }

    #[test]
    fn no_marker_returns_none() {
        assert!(extract_marker_call("just a plain reply").is_none());
        assert!(extract_marker_call("").is_none());
    }

    #[test]
    fn multiline_arguments() {
        let text = "<function=generate_image>{\n  \"prompt\": \"a fox\"\n}</function>";
        let (call, cleaned) = extract_marker_call(text).unwrap();
        assert_eq!(call.name, "generate_image");
        assert_eq!(call.arguments["prompt"], "a fox");
        assert!(cleaned.is_empty());
    }

    #[test]
    fn only_first_marker_is_extracted() {
        let text = r#"<function=a>{"x":1}</function> and <function=b>{"y":2}</function>"#;
        let (call, cleaned) = extract_marker_call(text).unwrap();
        assert_eq!(call.name, "a");
        assert!(cleaned.contains("<function=b>"));
    }
}
