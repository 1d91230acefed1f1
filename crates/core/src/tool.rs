//! Tool trait and registry — the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act: look up prices,
//! generate images, tell the time. The registry dispatches by name and
//! stamps every dispatch with an audit record, so the conversation
//! history always shows what ran, with which arguments, and whether it
//! succeeded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// What a tool handler produced.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Text to weave into the reply.
    pub result: Option<String>,

    /// URL of an image the tool produced.
    pub image_url: Option<String>,

    /// An error the tool ran into but handled itself (e.g. an upstream
    /// API refusing a symbol). The tool still counts as processed.
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn text(result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
            ..Default::default()
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            ..Default::default()
        }
    }
}

/// The audit record stamped on every dispatch.
///
/// Serialized to JSON and attached to stored responses so history shows
/// exactly what ran. `processed: false` marks dispatches that never
/// reached a handler (unknown name) or whose handler failed outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolAudit {
    /// The tool name as requested.
    pub tool_call: String,

    pub processed: bool,

    pub args: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolAudit {
    /// Serialize to the compact JSON form stored on records.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!("{{\"tool_call\":\"{}\",\"processed\":false}}", self.tool_call)
        })
    }
}

/// Outcome of dispatching a tool call: the handler output (if any)
/// plus the audit record, which is always present.
#[derive(Debug, Clone)]
pub struct ToolDispatch {
    pub output: ToolOutput,
    pub audit: ToolAudit,
}

/// Narrow callback surface tools can use to reenter the agent.
///
/// Only tools whose `requires_context` returns true receive it.
#[async_trait]
pub trait AgentContext: Send + Sync {
    /// Generate an image for a prompt and return its URL.
    async fn generate_image(&self, prompt: &str) -> Result<String, ToolError>;
}

/// The core Tool trait.
///
/// Tools are registered in the [`ToolRegistry`] and exposed to the
/// model as definitions; the registry invokes them when the model asks.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g. "crypto_price").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Whether this tool needs a callback into the agent. Tools that
    /// return false are invoked with `ctx = None`.
    fn requires_context(&self) -> bool {
        false
    }

    /// Run the tool with the given arguments.
    async fn invoke(
        &self,
        arguments: serde_json::Value,
        ctx: Option<&dyn AgentContext>,
    ) -> Result<ToolOutput, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The agent uses this to:
/// 1. Get tool definitions to send to the model
/// 2. Look up and dispatch tools when the model requests them
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Silently replaces any existing tool with the
    /// same name; the last registration wins.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "replaced existing tool registration");
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool definitions for sending to the model, optionally restricted
    /// to a set of names.
    pub fn definitions(&self, only: Option<&[String]>) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .filter(|t| match only {
                Some(names) => names.iter().any(|n| n == t.name()),
                None => true,
            })
            .map(|t| t.to_definition())
            .collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Dispatch a tool call by name.
    ///
    /// Always returns a [`ToolDispatch`] carrying an audit record. An
    /// unknown name is not an error to the caller: it produces an
    /// unprocessed audit and empty output, and the conversation goes on.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: serde_json::Value,
        ctx: Option<&dyn AgentContext>,
    ) -> ToolDispatch {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = %name, "tool not registered, leaving call unprocessed");
            return ToolDispatch {
                output: ToolOutput::default(),
                audit: ToolAudit {
                    tool_call: name.to_string(),
                    processed: false,
                    args: arguments,
                    result: None,
                    error: Some(ToolError::NotFound(name.to_string()).to_string()),
                },
            };
        };

        let ctx = if tool.requires_context() { ctx } else { None };
        match tool.invoke(arguments.clone(), ctx).await {
            Ok(output) => {
                debug!(tool = %name, has_image = output.image_url.is_some(), "tool dispatched");
                ToolDispatch {
                    audit: ToolAudit {
                        tool_call: name.to_string(),
                        processed: true,
                        args: arguments,
                        result: output.result.clone(),
                        error: output.error.clone(),
                    },
                    output,
                }
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "tool handler failed");
                ToolDispatch {
                    output: ToolOutput::default(),
                    audit: ToolAudit {
                        tool_call: name.to_string(),
                        processed: false,
                        args: arguments,
                        result: None,
                        error: Some(e.to_string()),
                    },
                }
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
