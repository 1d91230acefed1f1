//! # LoreAgent Core
//!
//! Domain types, traits, and error definitions for the LoreAgent
//! conversational runtime. This crate has **zero framework dependencies** —
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod interface;
pub mod provider;
pub mod record;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ChannelError, Error, ProviderError, Result, StoreError, ToolError};
pub use interface::Interface;
pub use provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, EmbeddingProvider,
    RequestedToolCall, ToolChoice, ToolDefinition,
};
pub use record::{MessageRecord, RecordKind, SimilarHit};
pub use store::{RecordFilter, SimilarFilter, SimilarityStore};
pub use tool::{AgentContext, Tool, ToolAudit, ToolDispatch, ToolOutput, ToolRegistry};
