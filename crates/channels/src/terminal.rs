//! Terminal interface — prints replies to stdout.

use async_trait::async_trait;
use loreagent_core::error::ChannelError;
use loreagent_core::interface::Interface;

pub struct TerminalInterface;

#[async_trait]
impl Interface for TerminalInterface {
    fn name(&self) -> &str {
        "terminal"
    }

    async fn deliver(
        &self,
        _conversation_id: &str,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<bool, ChannelError> {
        println!("{text}");
        if let Some(url) = image_url {
            println!("[image] {url}");
        }
        Ok(true)
    }
}
