//! Completion and embedding provider traits.
//!
//! A completion provider takes a system prompt, a user prompt, and an
//! optional set of tool definitions, and returns text plus at most one
//! requested tool call. Providers are expected to normalize textual
//! tool-call markers into structured calls before returning (see
//! `loreagent-providers`), so callers never have to scrape response text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// How the model is allowed to use tools for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolChoice {
    /// The model decides whether to call a tool.
    #[default]
    Auto,

    /// The model must call one of the supplied tools.
    Required,

    /// Tools are disabled even if definitions are supplied.
    None,
}

/// A tool definition in provider wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,

    /// JSON Schema for the arguments object.
    pub parameters: serde_json::Value,
}

/// A tool call the model asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestedToolCall {
    pub name: String,

    /// Arguments as a JSON object.
    pub arguments: serde_json::Value,
}

/// Request to a completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// The model to use (e.g. "meta-llama/llama-3.3-70b-instruct").
    pub model: String,

    pub system_prompt: String,

    pub user_prompt: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,

    /// Maximum tokens to generate (provider default when None).
    pub max_tokens: Option<u32>,

    /// Tool definitions to expose. Ignored when `tool_choice` is `None`.
    pub tools: Vec<ToolDefinition>,

    pub tool_choice: ToolChoice,
}

impl CompletionRequest {
    pub fn new(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.4,
            max_tokens: None,
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>, choice: ToolChoice) -> Self {
        self.tools = tools;
        self.tool_choice = choice;
        self
    }
}

/// Response from a completion provider.
///
/// At most one tool call surfaces per response; when the model emits
/// several, providers keep the first.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub text: String,
    pub tool_call: Option<RequestedToolCall>,
}

/// Chat-completion capability.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;
}

/// Text-embedding capability.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_defaults() {
        let req = CompletionRequest::new("m", "sys", "user");
        assert_eq!(req.temperature, 0.4);
        assert!(req.tools.is_empty());
        assert_eq!(req.tool_choice, ToolChoice::Auto);
    }

    #[test]
    fn with_tools_sets_choice() {
        let def = ToolDefinition {
            name: "current_time".into(),
            description: "Get the time".into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        };
        let req = CompletionRequest::new("m", "s", "u").with_tools(vec![def], ToolChoice::Required);
        assert_eq!(req.tools.len(), 1);
        assert_eq!(req.tool_choice, ToolChoice::Required);
    }
}
