//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, Fireworks
//! AI, and any endpoint exposing `/chat/completions` and `/embeddings`.
//!
//! Transient failures (network errors, 429, 5xx) are retried with
//! exponential backoff before surfacing. Textual tool markers in the
//! response are normalized into structured calls (see [`crate::marker`]).

use async_trait::async_trait;
use loreagent_core::error::ProviderError;
use loreagent_core::provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, EmbeddingProvider,
    RequestedToolCall, ToolChoice, ToolDefinition,
};
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::marker::extract_marker_call;

/// An OpenAI-compatible provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    embedding_model: String,
    max_retries: u32,
    initial_retry_delay: Duration,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
            embedding_model: "baai/bge-large-en-v1.5".into(),
            max_retries: 3,
            initial_retry_delay: Duration::from_secs(1),
        })
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Result<Self, ProviderError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Set the model used for `/embeddings` requests.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Override the retry policy (default: 3 attempts, 1s initial delay,
    /// doubling).
    pub fn with_retry(mut self, max_retries: u32, initial_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_retry_delay = initial_delay;
        self
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// One POST with status mapping; the retry loop lives in the callers.
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::Api {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }

    /// POST with bounded exponential backoff for transient failures.
    async fn post_with_retry(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut delay = self.initial_retry_delay;
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.post_json(url, body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() => {
                    warn!(
                        attempt,
                        max = self.max_retries,
                        error = %e,
                        "transient provider failure, backing off"
                    );
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(ProviderError::RetriesExhausted {
            attempts: self.max_retries,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".into()),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt },
            ],
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() && request.tool_choice != ToolChoice::None {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
            body["tool_choice"] = match request.tool_choice {
                ToolChoice::Required => serde_json::json!("required"),
                _ => serde_json::json!("auto"),
            };
        }

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self.post_with_retry(&url, &body).await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::Api {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

        let mut text = choice.message.content.unwrap_or_default();

        // Keep the first structured call, if any.
        let mut tool_call = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .find_map(|tc| match serde_json::from_str(&tc.function.arguments) {
                Ok(arguments) => Some(RequestedToolCall {
                    name: tc.function.name,
                    arguments,
                }),
                Err(e) => {
                    warn!(tool = %tc.function.name, error = %e, "unparseable tool arguments, skipping");
                    None
                }
            });

        // Textual fallback: normalize an inline marker into a structured call.
        if tool_call.is_none() {
            if let Some((call, cleaned)) = extract_marker_call(&text) {
                debug!(tool = %call.name, "normalized textual tool marker");
                tool_call = Some(call);
                text = cleaned;
            }
        }

        Ok(CompletionResponse { text, tool_call })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": self.embedding_model,
            "input": [text],
            "encoding_format": "float",
        });

        debug!(provider = %self.name, chars = text.len(), "Sending embedding request");

        let response = self.post_with_retry(&url, &body).await?;

        let api_resp: EmbeddingApiResponse =
            response.json().await.map_err(|e| ProviderError::Api {
                status_code: 200,
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        api_resp
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::MalformedResponse("No embedding in response".into()))
    }
}

// --- Wire format structs ---

#[derive(Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Deserialize)]
struct ApiToolCall {
    function: ApiFunction,
}

#[derive(Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openrouter_constructor() {
        let provider = OpenAiCompatProvider::openrouter("sk-test").unwrap();
        assert_eq!(provider.name(), "openrouter");
        assert!(provider.base_url.contains("openrouter.ai"));
    }

    #[test]
    fn ollama_constructor() {
        let provider = OpenAiCompatProvider::ollama(None).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert!(provider.base_url.contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider =
            OpenAiCompatProvider::new("custom", "https://example.com/v1/", "key").unwrap();
        assert_eq!(provider.base_url, "https://example.com/v1");
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "crypto_price".into(),
            description: "Get a crypto price".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let api_tools = OpenAiCompatProvider::to_api_tools(&tools);
        assert_eq!(api_tools.len(), 1);
        assert_eq!(api_tools[0].function.name, "crypto_price");
        assert_eq!(api_tools[0].r#type, "function");
    }

    #[test]
    fn api_response_parses_structured_tool_call() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "function": { "name": "current_time", "arguments": "{}" }
                    }]
                }
            }]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        let calls = parsed.choices[0].message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "current_time");
    }
}
