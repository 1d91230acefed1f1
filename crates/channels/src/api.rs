//! API interface — collects replies for a programmatic caller to pick
//! up instead of pushing them anywhere.

use async_trait::async_trait;
use loreagent_core::error::ChannelError;
use loreagent_core::interface::Interface;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub conversation_id: String,
    pub text: String,
    pub image_url: Option<String>,
}

#[derive(Default)]
pub struct ApiInterface {
    replies: Mutex<Vec<ApiReply>>,
}

impl ApiInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything delivered so far.
    pub async fn take_replies(&self) -> Vec<ApiReply> {
        std::mem::take(&mut *self.replies.lock().await)
    }
}

#[async_trait]
impl Interface for ApiInterface {
    fn name(&self) -> &str {
        "api"
    }

    async fn deliver(
        &self,
        conversation_id: &str,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<bool, ChannelError> {
        self.replies.lock().await.push(ApiReply {
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            image_url: image_url.map(str::to_string),
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collects_replies_in_order() {
        let iface = ApiInterface::new();
        iface.deliver("c1", "first", None).await.unwrap();
        iface.deliver("c1", "second", Some("http://img")).await.unwrap();

        let replies = iface.take_replies().await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].text, "first");
        assert_eq!(replies[1].image_url.as_deref(), Some("http://img"));

        assert!(iface.take_replies().await.is_empty());
    }
}
