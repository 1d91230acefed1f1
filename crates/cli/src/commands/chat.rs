//! `loreagent chat` — interactive terminal conversation.

use std::io::Write;
use std::sync::Arc;

use loreagent_agent::HandleOptions;
use loreagent_channels::{InterfaceRegistry, TerminalInterface};
use loreagent_config::AppConfig;

use crate::runtime;

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let persona_name = config.persona.name.clone();
    let model = config.provider.large_model.clone();
    let core = runtime::build_core(config).await?;

    let interfaces = Arc::new(InterfaceRegistry::new());
    interfaces.register(Arc::new(TerminalInterface)).await;

    println!();
    println!("  {persona_name} — interactive mode");
    println!("  Model: {model}");
    println!("  Type your message and press Enter. Type 'exit' to quit.");
    println!();

    let conversation_id = "terminal";
    let stdin = std::io::stdin();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }

        let opts = HandleOptions {
            source: Some("terminal".into()),
            conversation_id: Some(conversation_id.into()),
            skip_conversation: false,
            ..HandleOptions::default()
        };
        let reply = core.handle_message(line, opts).await;

        match reply.text {
            Some(text) => {
                println!();
                interfaces
                    .send_to("terminal", conversation_id, &text, reply.image_url.as_deref())
                    .await;
                println!();
            }
            None => println!("  (no reply)"),
        }
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}
