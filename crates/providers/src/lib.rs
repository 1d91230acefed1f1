//! Provider implementations for LoreAgent.
//!
//! All providers implement the `loreagent_core` completion and embedding
//! traits. The OpenAI-compatible client covers the vast majority of
//! hosted endpoints.

pub mod marker;
pub mod openai_compat;

pub use marker::extract_marker_call;
pub use openai_compat::OpenAiCompatProvider;
