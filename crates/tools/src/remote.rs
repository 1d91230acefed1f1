//! Tools hosted by another process, reached over HTTP.
//!
//! The peer exposes `GET /tools` returning a list of tool definitions
//! and `POST /tools/{name}` executing one. Remote failures never bubble
//! up as dispatch errors; they land in the audit with `processed: false`
//! so the agent can keep replying.

use loreagent_core::error::ToolError;
use loreagent_core::provider::ToolDefinition;
use loreagent_core::tool::{ToolAudit, ToolDispatch, ToolOutput};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct RemoteToolSet {
    base_url: String,
    client: reqwest::Client,
    definitions: RwLock<Vec<ToolDefinition>>,
}

#[derive(Deserialize)]
struct RemoteInvokeResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl RemoteToolSet {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            definitions: RwLock::new(Vec::new()),
        }
    }

    /// Seed definitions without fetching, for peers whose catalog is
    /// known ahead of time.
    pub fn with_definitions(mut self, definitions: Vec<ToolDefinition>) -> Self {
        *self.definitions.get_mut() = definitions;
        self
    }

    /// Fetch the peer's tool list. Call once at startup and again
    /// whenever the peer signals a change.
    pub async fn refresh(&self) -> Result<usize, ToolError> {
        let url = format!("{}/tools", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolError::Remote(format!("fetching tool list: {e}")))?;

        if !response.status().is_success() {
            return Err(ToolError::Remote(format!(
                "tool list request returned status {}",
                response.status().as_u16()
            )));
        }

        let fetched: Vec<ToolDefinition> = response
            .json()
            .await
            .map_err(|e| ToolError::Remote(format!("unparseable tool list: {e}")))?;

        debug!(count = fetched.len(), base_url = %self.base_url, "remote tools refreshed");
        let count = fetched.len();
        *self.definitions.write().await = fetched;
        Ok(count)
    }

    pub async fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.read().await.clone()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.definitions.read().await.iter().any(|d| d.name == name)
    }

    /// Execute a tool on the peer. Mirrors `ToolRegistry::dispatch`:
    /// every outcome carries an audit, and transport failures stamp
    /// `processed: false` instead of erroring.
    pub async fn dispatch(&self, name: &str, arguments: serde_json::Value) -> ToolDispatch {
        let url = format!("{}/tools/{name}", self.base_url);
        let sent = self
            .client
            .post(&url)
            .json(&arguments)
            .send()
            .await;

        let response = match sent {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                let reason = format!("remote tool returned status {}", r.status().as_u16());
                warn!(tool = name, %reason, "remote dispatch failed");
                return Self::failed(name, arguments, reason);
            }
            Err(e) => {
                let reason = format!("remote dispatch error: {e}");
                warn!(tool = name, %reason, "remote dispatch failed");
                return Self::failed(name, arguments, reason);
            }
        };

        let body: RemoteInvokeResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                let reason = format!("unparseable remote tool response: {e}");
                warn!(tool = name, %reason, "remote dispatch failed");
                return Self::failed(name, arguments, reason);
            }
        };

        let output = ToolOutput {
            result: body.result,
            image_url: body.image_url,
            error: body.error,
        };
        let audit = ToolAudit {
            tool_call: name.to_string(),
            processed: true,
            args: arguments,
            result: output.result.clone(),
            error: output.error.clone(),
        };
        ToolDispatch { output, audit }
    }

    fn failed(name: &str, arguments: serde_json::Value, reason: String) -> ToolDispatch {
        ToolDispatch {
            output: ToolOutput {
                error: Some(reason.clone()),
                ..Default::default()
            },
            audit: ToolAudit {
                tool_call: name.to_string(),
                processed: false,
                args: arguments,
                result: None,
                error: Some(reason),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_until_refreshed() {
        let set = RemoteToolSet::new("http://127.0.0.1:1/");
        assert!(set.definitions().await.is_empty());
        assert!(!set.contains("anything").await);
    }

    #[tokio::test]
    async fn unreachable_peer_stamps_unprocessed() {
        // Port 1 is never listening, so the send itself fails.
        let set = RemoteToolSet::new("http://127.0.0.1:1");
        let dispatch = set.dispatch("echo", serde_json::json!({"x": 1})).await;
        assert!(!dispatch.audit.processed);
        assert_eq!(dispatch.audit.tool_call, "echo");
        assert!(dispatch.output.error.is_some());
    }
}
