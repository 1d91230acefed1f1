//! Loreagent CLI — the main entry point.
//!
//! Commands:
//! - `ask`       — Send a single message (optionally with chain-of-thought)
//! - `chat`      — Interactive terminal conversation
//! - `knowledge` — Load a knowledge file into the store
//! - `status`    — Show the effective configuration

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "loreagent",
    about = "Loreagent — persona-driven conversational agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single message and print the reply
    Ask {
        /// The message text
        message: String,

        /// Plan and execute the message step by step
        #[arg(long)]
        cot: bool,

        /// Conversation id to thread the exchange under
        #[arg(short, long)]
        conversation: Option<String>,
    },

    /// Chat interactively in the terminal
    Chat,

    /// Load a JSON knowledge file into the store
    Knowledge {
        /// Path to the knowledge file
        file: std::path::PathBuf,
    },

    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Ask {
            message,
            cot,
            conversation,
        } => commands::ask::run(&message, cot, conversation).await?,
        Commands::Chat => commands::chat::run().await?,
        Commands::Knowledge { file } => commands::knowledge::run(&file).await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
