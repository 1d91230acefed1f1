//! Interface trait — the abstraction over outbound delivery surfaces.
//!
//! An interface is anywhere a reply can be delivered: a terminal, a
//! Telegram chat, a programmatic API caller. Implementations live in
//! `loreagent-channels`.

use async_trait::async_trait;

use crate::error::ChannelError;

/// An outbound delivery surface.
#[async_trait]
pub trait Interface: Send + Sync {
    /// The unique name of this interface (e.g. "telegram", "terminal").
    fn name(&self) -> &str;

    /// Deliver a reply to a conversation. Returns whether the message
    /// was actually delivered.
    async fn deliver(
        &self,
        conversation_id: &str,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<bool, ChannelError>;
}
