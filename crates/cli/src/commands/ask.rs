//! `loreagent ask` — send one message and print the reply.

use loreagent_agent::{ChainOfThought, HandleOptions};
use loreagent_config::AppConfig;

use crate::runtime;

pub async fn run(message: &str, cot: bool, conversation: Option<String>) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let core = runtime::build_core(config).await?;

    let opts = HandleOptions {
        source: Some("terminal".into()),
        conversation_id: conversation,
        ..HandleOptions::default()
    };

    let reply = if cot {
        ChainOfThought::new(core).run(message, opts).await
    } else {
        core.handle_message(message, opts).await
    };

    match reply.text {
        Some(text) => println!("{text}"),
        None => println!("(no reply)"),
    }
    if let Some(url) = reply.image_url {
        println!("[image] {url}");
    }

    Ok(())
}
