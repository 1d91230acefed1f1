//! The message handling core of Loreagent.
//!
//! A message moves through a fixed pipeline:
//!
//! 1. **Receive** the text and normalize the conversation id
//! 2. **Pre-filter** relevance with the small model (fail closed)
//! 3. **Retrieve context** (knowledge, conversation, similar exchanges)
//! 4. **Complete** with the persona prompt and tool definitions
//! 5. **Dispatch** at most one tool call, always auditing it
//! 6. **Persist** the exchange with back-references
//! 7. **Return** the reply triple
//!
//! `ChainOfThought` layers plan-execute-synthesize orchestration on top
//! of the same pipeline, and `load_knowledge` seeds the store.

pub mod context;
pub mod cot;
pub mod knowledge;
pub mod pipeline;

pub use cot::{ChainOfThought, PlanStep};
pub use knowledge::{load_knowledge, KnowledgeStats};
pub use pipeline::{
    AgentCore, AgentReply, HandleOptions, ImageGenerator, GENERIC_APOLOGY, PROVIDER_APOLOGY,
};
