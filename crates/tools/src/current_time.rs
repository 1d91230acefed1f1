//! Current time tool.

use async_trait::async_trait;
use chrono::Utc;
use loreagent_core::error::ToolError;
use loreagent_core::tool::{AgentContext, Tool, ToolOutput};

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in UTC."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn invoke(
        &self,
        _arguments: serde_json::Value,
        _ctx: Option<&dyn AgentContext>,
    ) -> Result<ToolOutput, ToolError> {
        let now = Utc::now();
        Ok(ToolOutput::text(
            now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_formatted_utc_time() {
        let output = CurrentTimeTool
            .invoke(serde_json::json!({}), None)
            .await
            .unwrap();
        let text = output.result.unwrap();
        assert!(text.ends_with("UTC"));
        assert_eq!(text.len(), "2026-01-01 00:00:00 UTC".len());
    }
}
