//! Wires the configured providers, store, and tools into an `AgentCore`.

use std::sync::Arc;

use anyhow::{bail, Context};
use loreagent_agent::AgentCore;
use loreagent_config::AppConfig;
use loreagent_core::store::SimilarityStore;
use loreagent_providers::OpenAiCompatProvider;
use loreagent_store::{MemoryStore, PgVectorStore, SqliteStore};

pub async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn SimilarityStore>> {
    match config.store.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "sqlite" => {
            let store = SqliteStore::new(&config.store.sqlite_path)
                .await
                .context("opening sqlite store")?;
            Ok(Arc::new(store))
        }
        "postgres" => {
            let url = config
                .store
                .postgres_url
                .as_deref()
                .context("postgres backend needs store.postgres_url")?;
            let store = PgVectorStore::connect(url)
                .await
                .context("connecting to postgres")?
                .with_embedding_dim(config.store.embedding_dims);
            store.initialize().await.context("initializing pgvector")?;
            Ok(Arc::new(store))
        }
        other => bail!("unknown store backend: {other}"),
    }
}

pub async fn build_core(config: AppConfig) -> anyhow::Result<Arc<AgentCore>> {
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENROUTER_API_KEY   (recommended)");
        eprintln!("    OPENAI_API_KEY");
        eprintln!("    LOREAGENT_API_KEY");
        eprintln!();
        bail!("no API key found");
    }

    let api_key = config.provider.api_key.clone().unwrap_or_default();
    let provider = Arc::new(
        OpenAiCompatProvider::new("openai-compat", &config.provider.base_url, &api_key)
            .context("building provider")?
            .with_embedding_model(&config.provider.embedding_model),
    );
    let store = build_store(&config).await?;
    let tools = Arc::new(loreagent_tools::default_registry());

    Ok(Arc::new(AgentCore::new(
        Arc::new(config),
        provider.clone(),
        provider,
        store,
        tools,
    )))
}
