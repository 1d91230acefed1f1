//! `loreagent status` — show the effective configuration.

use loreagent_config::AppConfig;

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    println!("Loreagent Status");
    println!("================");
    println!("  Persona:         {}", config.persona.name);
    println!("  Base URL:        {}", config.provider.base_url);
    println!("  Large model:     {}", config.provider.large_model);
    println!("  Small model:     {}", config.provider.small_model);
    println!("  Embedding model: {}", config.provider.embedding_model);
    println!("  Store backend:   {}", config.store.backend);
    if config.store.backend == "sqlite" {
        println!("  Sqlite path:     {}", config.store.sqlite_path);
    }
    println!(
        "  Pre-filter:      {}",
        if config.prefilter.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  API key:         {}",
        if config.has_api_key() {
            "configured"
        } else {
            "MISSING"
        }
    );

    Ok(())
}
