//! Telegram interface adapter.
//!
//! Delivers replies through the Bot API: `sendMessage` for plain text,
//! `sendPhoto` with a caption when the reply carries an image URL.

use std::time::Duration;

use async_trait::async_trait;
use loreagent_core::error::ChannelError;
use loreagent_core::interface::Interface;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub bot_token: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .finish()
    }
}

pub struct TelegramInterface {
    config: TelegramConfig,
    client: reqwest::Client,
    api_base: String,
}

#[derive(Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramInterface {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_base: "https://api.telegram.org".into(),
        }
    }

    /// Point at a different Bot API host (used by tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<bool, ChannelError> {
        let url = format!("{}/bot{}/{method}", self.api_base, self.config.bot_token);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::DeliveryFailed {
                channel: "telegram".into(),
                reason: e.to_string(),
            })?;

        let parsed: BotApiResponse =
            response
                .json()
                .await
                .map_err(|e| ChannelError::DeliveryFailed {
                    channel: "telegram".into(),
                    reason: format!("unparseable Bot API response: {e}"),
                })?;

        if !parsed.ok {
            warn!(
                method,
                description = parsed.description.as_deref().unwrap_or("unknown"),
                "Bot API rejected the request"
            );
        }
        Ok(parsed.ok)
    }
}

#[async_trait]
impl Interface for TelegramInterface {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(
        &self,
        conversation_id: &str,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<bool, ChannelError> {
        debug!(chat_id = %conversation_id, content_len = text.len(), "Telegram deliver");
        match image_url {
            Some(url) => {
                self.call(
                    "sendPhoto",
                    serde_json::json!({
                        "chat_id": conversation_id,
                        "photo": url,
                        "caption": text,
                    }),
                )
                .await
            }
            None => {
                self.call(
                    "sendMessage",
                    serde_json::json!({
                        "chat_id": conversation_id,
                        "text": text,
                    }),
                )
                .await
            }
        }
    }
}
