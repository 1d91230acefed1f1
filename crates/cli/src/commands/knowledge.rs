//! `loreagent knowledge` — load a JSON knowledge file into the store.

use std::path::Path;

use loreagent_agent::load_knowledge;
use loreagent_config::AppConfig;

use crate::runtime;

pub async fn run(file: &Path) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let core = runtime::build_core(config).await?;

    let stats = load_knowledge(&core, file).await?;
    println!(
        "Loaded {} entries, skipped {} already-known",
        stats.loaded, stats.skipped
    );
    Ok(())
}
