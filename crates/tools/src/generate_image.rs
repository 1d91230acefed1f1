//! Image generation tool. Delegates to the host agent, which owns the
//! actual image model; the tool only shapes the request and the reply.

use async_trait::async_trait;
use loreagent_core::error::ToolError;
use loreagent_core::tool::{AgentContext, Tool, ToolOutput};
use tracing::debug;

pub struct GenerateImageTool;

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> &str {
        "generate_image"
    }

    fn description(&self) -> &str {
        "Generate an image from a text prompt and return its URL."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "Text description of the image to generate"
                }
            },
            "required": ["prompt"]
        })
    }

    fn requires_context(&self) -> bool {
        true
    }

    async fn invoke(
        &self,
        arguments: serde_json::Value,
        ctx: Option<&dyn AgentContext>,
    ) -> Result<ToolOutput, ToolError> {
        let prompt = arguments["prompt"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'prompt' argument".into()))?;

        let ctx = ctx.ok_or_else(|| ToolError::ExecutionFailed {
            tool_name: "generate_image".into(),
            reason: "no agent context available for image generation".into(),
        })?;

        debug!(prompt, "generating image");
        let url = ctx.generate_image(prompt).await?;
        Ok(ToolOutput {
            result: Some(format!("Generated image: {url}")),
            image_url: Some(url),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedImageContext;

    #[async_trait]
    impl AgentContext for FixedImageContext {
        async fn generate_image(&self, prompt: &str) -> Result<String, ToolError> {
            Ok(format!("https://img.example/{prompt}.png"))
        }
    }

    #[tokio::test]
    async fn delegates_to_context() {
        let tool = GenerateImageTool;
        let out = tool
            .invoke(serde_json::json!({"prompt": "a fox"}), Some(&FixedImageContext))
            .await
            .unwrap();
        assert_eq!(out.image_url.as_deref(), Some("https://img.example/a fox.png"));
        assert!(out.result.unwrap().contains("Generated image"));
    }

    #[tokio::test]
    async fn missing_context_fails() {
        let tool = GenerateImageTool;
        let err = tool
            .invoke(serde_json::json!({"prompt": "a fox"}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}
