//! Configuration loading, validation, and management for LoreAgent.
//!
//! Loads configuration from a TOML file with environment variable
//! overrides for secrets. All settings are validated at startup; there
//! are no ambient globals, the loaded [`AppConfig`] is passed explicitly
//! to whatever needs it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `loreagent.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider connection and model selection.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Similarity store backend settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Persona definition: the agent's voice and interests.
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Pre-filter (relevance gate) settings.
    #[serde(default)]
    pub prefilter: PreFilterConfig,

    /// Context retrieval thresholds and limits.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Chain-of-thought orchestration settings.
    #[serde(default)]
    pub cot: CotConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("store", &self.store)
            .field("persona", &self.persona)
            .field("prefilter", &self.prefilter)
            .field("retrieval", &self.retrieval)
            .field("cot", &self.cot)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key; usually supplied via `LOREAGENT_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model for primary replies.
    #[serde(default = "default_large_model")]
    pub large_model: String,

    /// Model for classification, filtering, and topic extraction.
    #[serde(default = "default_small_model")]
    pub small_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_large_model() -> String {
    "meta-llama/llama-3.3-70b-instruct".into()
}
fn default_small_model() -> String {
    "meta-llama/llama-3.1-8b-instruct".into()
}
fn default_embedding_model() -> String {
    "baai/bge-large-en-v1.5".into()
}
fn default_temperature() -> f32 {
    0.4
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("large_model", &self.large_model)
            .field("small_model", &self.small_model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            large_model: default_large_model(),
            small_model: default_small_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "memory", "sqlite", or "postgres".
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// SQLite database path.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,

    /// Postgres connection URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgres_url: Option<String>,

    /// Embedding dimensionality the store columns are sized for.
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
}

fn default_store_backend() -> String {
    "sqlite".into()
}
fn default_sqlite_path() -> String {
    "loreagent.db".into()
}
fn default_embedding_dims() -> usize {
    1024
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            sqlite_path: default_sqlite_path(),
            postgres_url: None,
            embedding_dims: default_embedding_dims(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_persona_name")]
    pub name: String,

    /// Base system prompt; basic settings and interaction styles are
    /// sampled and appended at request time.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Short statements about the persona (sampled, up to 5 per call).
    #[serde(default)]
    pub basic_settings: Vec<String>,

    /// Tone/style directives (sampled, up to 5 per call).
    #[serde(default)]
    pub interaction_styles: Vec<String>,

    /// Phrases that make the pre-filter accept a message outright.
    #[serde(default)]
    pub trigger_phrases: Vec<String>,

    /// Topics the persona cares about, used by the pre-filter.
    #[serde(default)]
    pub topics: Vec<String>,
}

fn default_persona_name() -> String {
    "Lore".into()
}
fn default_system_prompt() -> String {
    "You are a helpful, knowledgeable assistant.".into()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            system_prompt: default_system_prompt(),
            basic_settings: vec![],
            interaction_styles: vec![],
            trigger_phrases: vec![],
            topics: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreFilterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Sources that skip the relevance gate entirely.
    #[serde(default = "default_bypass_sources")]
    pub bypass_sources: Vec<String>,
}

fn default_true() -> bool {
    true
}
fn default_bypass_sources() -> Vec<String> {
    [
        "api",
        "twitter",
        "twitter_reply",
        "farcaster",
        "farcaster_reply",
        "telegram",
        "terminal",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for PreFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bypass_sources: default_bypass_sources(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum similarity for knowledge-base hits.
    #[serde(default = "default_knowledge_threshold")]
    pub knowledge_threshold: f32,

    /// Minimum similarity for similar-exchange hits.
    #[serde(default = "default_similar_threshold")]
    pub similar_threshold: f32,

    /// Similarity at which a knowledge entry counts as a duplicate.
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f32,

    /// How many past responses to replay as conversation context.
    #[serde(default = "default_conversation_limit")]
    pub conversation_limit: usize,

    /// Cap on similar-exchange exemplars.
    #[serde(default = "default_similar_limit")]
    pub similar_limit: usize,
}

fn default_knowledge_threshold() -> f32 {
    0.6
}
fn default_similar_threshold() -> f32 {
    0.9
}
fn default_dedup_threshold() -> f32 {
    0.99
}
fn default_conversation_limit() -> usize {
    10
}
fn default_similar_limit() -> usize {
    10
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            knowledge_threshold: default_knowledge_threshold(),
            similar_threshold: default_similar_threshold(),
            dedup_threshold: default_dedup_threshold(),
            conversation_limit: default_conversation_limit(),
            similar_limit: default_similar_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CotConfig {
    /// Attempts per step when the model keeps emitting raw tool markers.
    #[serde(default = "default_max_step_retries")]
    pub max_step_retries: u32,

    /// Delay between those attempts.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_max_step_retries() -> u32 {
    5
}
fn default_retry_delay_secs() -> u64 {
    5
}

impl Default for CotConfig {
    fn default() -> Self {
        Self {
            max_step_retries: default_max_step_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (`loreagent.toml` in the
    /// working directory), then apply environment overrides:
    /// - `LOREAGENT_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(Path::new("loreagent.toml"))?;

        if config.provider.api_key.is_none() {
            config.provider.api_key = std::env::var("LOREAGENT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("LOREAGENT_MODEL") {
            config.provider.large_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path. A missing file is
    /// not an error; defaults apply.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::Validation(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        for (name, value) in [
            ("knowledge_threshold", self.retrieval.knowledge_threshold),
            ("similar_threshold", self.retrieval.similar_threshold),
            ("dedup_threshold", self.retrieval.dedup_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "retrieval.{name} must be between 0.0 and 1.0"
                )));
            }
        }

        match self.store.backend.as_str() {
            "memory" | "sqlite" => {}
            "postgres" => {
                if self.store.postgres_url.is_none() {
                    return Err(ConfigError::Validation(
                        "store.postgres_url is required for the postgres backend".into(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::Validation(format!(
                    "unknown store backend: {other}"
                )));
            }
        }

        if self.store.embedding_dims == 0 {
            return Err(ConfigError::Validation(
                "store.embedding_dims must be > 0".into(),
            ));
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            store: StoreConfig::default(),
            persona: PersonaConfig::default(),
            prefilter: PreFilterConfig::default(),
            retrieval: RetrievalConfig::default(),
            cot: CotConfig::default(),
        }
    }
}

/// Configuration errors. These are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.backend, "sqlite");
        assert_eq!(config.retrieval.knowledge_threshold, 0.6);
        assert_eq!(config.retrieval.similar_threshold, 0.9);
        assert_eq!(config.cot.max_step_retries, 5);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.large_model, config.provider.large_model);
        assert_eq!(parsed.store.backend, config.store.backend);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            provider: ProviderConfig {
                temperature: 5.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn postgres_backend_requires_url() {
        let config = AppConfig {
            store: StoreConfig {
                backend: "postgres".into(),
                postgres_url: None,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/loreagent.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().store.backend, "sqlite");
    }

    #[test]
    fn persona_config_parsing() {
        let toml_str = r#"
[persona]
name = "Sage"
system_prompt = "You are Sage, keeper of obscure facts."
basic_settings = ["Curious about everything", "Never condescending"]
interaction_styles = ["Warm", "Concise"]
trigger_phrases = ["hey sage"]
topics = ["history", "mythology"]

[prefilter]
bypass_sources = ["api"]
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.persona.name, "Sage");
        assert_eq!(config.persona.basic_settings.len(), 2);
        assert_eq!(config.prefilter.bypass_sources, vec!["api"]);
    }

    #[test]
    fn bypass_sources_default_list() {
        let config = AppConfig::default();
        assert!(config.prefilter.bypass_sources.contains(&"api".to_string()));
        assert!(
            config
                .prefilter
                .bypass_sources
                .contains(&"telegram".to_string())
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            provider: ProviderConfig {
                api_key: Some("sk-secret".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[provider]\nlarge_model = \"test-model\"").unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.provider.large_model, "test-model");
    }
}
