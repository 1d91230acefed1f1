//! The message handling pipeline.
//!
//! `AgentCore` owns every collaborator explicitly: the completion and
//! embedding providers, the similarity store, and the tool registries.
//! `handle_message` runs the full receive, filter, retrieve, complete,
//! dispatch, persist sequence and never lets an error escape; callers
//! always get a reply, even if it is an apology.

use std::sync::Arc;

use async_trait::async_trait;
use loreagent_config::AppConfig;
use loreagent_core::error::{Error, ToolError};
use loreagent_core::provider::{
    CompletionProvider, CompletionRequest, EmbeddingProvider, ToolChoice, ToolDefinition,
};
use loreagent_core::record::{canonical_conversation_id, MessageRecord, RecordKind};
use loreagent_core::store::{RecordFilter, SimilarFilter, SimilarityStore};
use loreagent_core::tool::{AgentContext, ToolDispatch, ToolRegistry};
use loreagent_tools::RemoteToolSet;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::context;

/// Fixed reply when the completion provider fails.
pub const PROVIDER_APOLOGY: &str = "Sorry, I encountered an error processing your message.";

/// Fixed reply for any other internal failure.
pub const GENERIC_APOLOGY: &str = "Sorry, something went wrong.";

/// Produces an image URL from a text prompt. Wired into tools through
/// the `AgentContext` the core hands out at dispatch time.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ToolError>;
}

/// Per-message knobs. Everything has a usable default; the skip flags
/// let orchestrators run partial pipelines.
#[derive(Clone)]
pub struct HandleOptions {
    /// Kind stamped on the inbound record.
    pub kind: RecordKind,
    pub source: Option<String>,
    pub conversation_id: Option<String>,
    /// Replaces the persona-derived system prompt entirely.
    pub system_prompt: Option<String>,
    /// Overrides the configured large model.
    pub model: Option<String>,
    /// Overrides the configured temperature.
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tool_choice: Option<ToolChoice>,
    /// When set, only these tools are offered to the model.
    pub allowed_tools: Option<Vec<String>>,
    pub skip_store: bool,
    pub skip_similar: bool,
    pub skip_tools: bool,
    pub skip_conversation: bool,
    pub skip_pre_filter: bool,
}

impl Default for HandleOptions {
    fn default() -> Self {
        Self {
            kind: RecordKind::user_message(),
            source: None,
            conversation_id: None,
            system_prompt: None,
            model: None,
            temperature: None,
            max_tokens: None,
            tool_choice: None,
            allowed_tools: None,
            skip_store: false,
            skip_similar: true,
            skip_tools: false,
            skip_conversation: true,
            skip_pre_filter: false,
        }
    }
}

/// What `handle_message` returns. All fields empty means the message
/// was filtered out.
#[derive(Debug, Clone, Default)]
pub struct AgentReply {
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub tool_audit: Option<String>,
}

impl AgentReply {
    fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

pub struct AgentCore {
    pub(crate) config: Arc<AppConfig>,
    completion: Arc<dyn CompletionProvider>,
    pub(crate) embeddings: Arc<dyn EmbeddingProvider>,
    pub(crate) store: Arc<dyn SimilarityStore>,
    tools: Arc<ToolRegistry>,
    remote_tools: Option<Arc<RemoteToolSet>>,
    image_generator: Option<Arc<dyn ImageGenerator>>,
}

impl AgentCore {
    pub fn new(
        config: Arc<AppConfig>,
        completion: Arc<dyn CompletionProvider>,
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn SimilarityStore>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            config,
            completion,
            embeddings,
            store,
            tools,
            remote_tools: None,
            image_generator: None,
        }
    }

    pub fn with_remote_tools(mut self, remote: Arc<RemoteToolSet>) -> Self {
        self.remote_tools = Some(remote);
        self
    }

    pub fn with_image_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.image_generator = Some(generator);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run a message through the full pipeline. Never errors: provider
    /// failures become a fixed apology, everything else a generic one,
    /// and a filtered message comes back empty.
    pub async fn handle_message(&self, text: &str, opts: HandleOptions) -> AgentReply {
        match self.run_pipeline(text, &opts).await {
            Ok(reply) => reply,
            Err(Error::Provider(e)) => {
                warn!(error = %e, "Completion failed");
                AgentReply::text_only(PROVIDER_APOLOGY)
            }
            Err(e) => {
                warn!(error = %e, "Pipeline failed");
                AgentReply::text_only(GENERIC_APOLOGY)
            }
        }
    }

    async fn run_pipeline(&self, text: &str, opts: &HandleOptions) -> Result<AgentReply, Error> {
        // RECEIVE: an absent chat id becomes the literal "None" and is
        // used that way everywhere downstream.
        let conversation_id = canonical_conversation_id(opts.conversation_id.as_deref());
        debug!(conversation = %conversation_id, kind = %opts.kind, "Handling message");

        // PRE_FILTER
        if !self.should_respond(text, opts).await {
            info!(conversation = %conversation_id, "Message filtered out");
            return Ok(AgentReply::default());
        }

        // RETRIEVE_CONTEXT
        let embedding = self.embeddings.embed(text).await.map_err(Error::Provider)?;
        let context_blocks = self
            .assemble_context(&embedding, &conversation_id, opts)
            .await;

        // COMPLETE
        let system_prompt = match &opts.system_prompt {
            Some(prompt) => prompt.clone(),
            None => self.persona_prompt(),
        };
        let system_prompt = if context_blocks.is_empty() {
            system_prompt
        } else {
            format!("{system_prompt}\n\n{}", context_blocks.join("\n"))
        };

        let model = opts
            .model
            .clone()
            .unwrap_or_else(|| self.config.provider.large_model.clone());
        let mut request = CompletionRequest::new(model, system_prompt, text)
            .with_temperature(
                opts.temperature
                    .unwrap_or(self.config.provider.temperature),
            );
        if let Some(max_tokens) = opts.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if !opts.skip_tools {
            let definitions = self.tool_definitions(opts.allowed_tools.as_deref()).await;
            if !definitions.is_empty() {
                request = request
                    .with_tools(definitions, opts.tool_choice.unwrap_or(ToolChoice::Auto));
            }
        }

        let response = self
            .completion
            .complete(request)
            .await
            .map_err(Error::Provider)?;

        // DISPATCH_TOOL: at most one call per message.
        let mut reply_text = response.text;
        let mut image_url = None;
        let mut tool_audit = None;
        if let (Some(call), false) = (response.tool_call, opts.skip_tools) {
            let dispatch = self.dispatch_tool(&call.name, call.arguments).await;
            if let Some(result) = dispatch.output.result {
                reply_text = if reply_text.is_empty() {
                    result
                } else {
                    format!("{reply_text}\n\n{result}")
                };
            }
            image_url = dispatch.output.image_url;
            tool_audit = Some(dispatch.audit.to_json());
        }

        // PERSIST
        if !opts.skip_store {
            self.persist_exchange(
                text,
                embedding,
                &reply_text,
                &conversation_id,
                opts,
                tool_audit.as_deref(),
            )
            .await;
        }

        // RETURN
        Ok(AgentReply {
            text: Some(reply_text),
            image_url,
            tool_audit,
        })
    }

    /// The relevance gate. Fail closed: if the small model cannot be
    /// reached or gives no usable verdict, the message is ignored.
    async fn should_respond(&self, text: &str, opts: &HandleOptions) -> bool {
        if opts.skip_pre_filter || !self.config.prefilter.enabled {
            return true;
        }
        if let Some(source) = &opts.source {
            if self
                .config
                .prefilter
                .bypass_sources
                .iter()
                .any(|s| s == source)
            {
                debug!(source = %source, "Pre-filter bypassed");
                return true;
            }
        }

        let persona = &self.config.persona;
        let system_prompt = format!(
            "You decide whether {} should respond to a message. Respond via the \
             filter_message tool. Trigger phrases: {}. Topics of interest: {}.",
            persona.name,
            persona.trigger_phrases.join(", "),
            persona.topics.join(", "),
        );
        let filter_tool = ToolDefinition {
            name: "filter_message".into(),
            description: "Report whether the agent should respond to this message.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "should_respond": {
                        "type": "boolean",
                        "description": "True if the agent should reply"
                    },
                    "reason": {
                        "type": "string",
                        "description": "Short justification"
                    }
                },
                "required": ["should_respond"]
            }),
        };
        let request = CompletionRequest::new(
            self.config.provider.small_model.clone(),
            system_prompt,
            text,
        )
        .with_tools(vec![filter_tool], ToolChoice::Required);

        match self.completion.complete(request).await {
            Ok(response) => match response.tool_call {
                Some(call) => call.arguments["should_respond"].as_bool().unwrap_or(false),
                None => {
                    warn!("Pre-filter returned no verdict, ignoring message");
                    false
                }
            },
            Err(e) => {
                warn!(error = %e, "Pre-filter failed, ignoring message");
                false
            }
        }
    }

    /// Builds the context blocks. Store read failures degrade to empty
    /// blocks so retrieval never takes the reply down with it.
    async fn assemble_context(
        &self,
        embedding: &[f32],
        conversation_id: &str,
        opts: &HandleOptions,
    ) -> Vec<String> {
        let retrieval = &self.config.retrieval;
        let mut blocks = Vec::new();

        let knowledge = self
            .store
            .find_similar(
                embedding,
                retrieval.knowledge_threshold,
                SimilarFilter::kind(RecordKind::knowledge_base()),
            )
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Knowledge retrieval failed");
                Vec::new()
            });
        if let Some(block) = context::knowledge_block(&knowledge) {
            blocks.push(block);
        }

        if !opts.skip_conversation {
            let history = self
                .store
                .find(
                    RecordFilter::kind(RecordKind::agent_response())
                        .with_conversation(conversation_id)
                        .with_limit(retrieval.conversation_limit),
                )
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Conversation retrieval failed");
                    Vec::new()
                });
            if let Some(block) = context::conversation_block(&history) {
                blocks.push(block);
            }
        }

        if !opts.skip_similar {
            let similar = self
                .store
                .find_similar(
                    embedding,
                    retrieval.similar_threshold,
                    SimilarFilter::kind(RecordKind::agent_response()),
                )
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Similar-exchange retrieval failed");
                    Vec::new()
                });
            if let Some(block) = context::similar_block(&similar, retrieval.similar_limit) {
                blocks.push(block);
            }
        }

        blocks
    }

    /// Persona base prompt plus a random sample of voice settings, so
    /// repeated calls vary in phrasing.
    fn persona_prompt(&self) -> String {
        let persona = &self.config.persona;
        let mut prompt = persona.system_prompt.clone();
        let mut rng = rand::thread_rng();

        let settings: Vec<&String> = persona
            .basic_settings
            .choose_multiple(&mut rng, 5.min(persona.basic_settings.len()))
            .collect();
        if !settings.is_empty() {
            prompt.push_str("\n\nAbout you:\n");
            for setting in settings {
                prompt.push_str("- ");
                prompt.push_str(setting);
                prompt.push('\n');
            }
        }

        let styles: Vec<&String> = persona
            .interaction_styles
            .choose_multiple(&mut rng, 5.min(persona.interaction_styles.len()))
            .collect();
        if !styles.is_empty() {
            prompt.push_str("\nHow you interact:\n");
            for style in styles {
                prompt.push_str("- ");
                prompt.push_str(style);
                prompt.push('\n');
            }
        }

        prompt
    }

    /// Local definitions first, then remote ones whose names do not
    /// collide with a local tool.
    async fn tool_definitions(&self, only: Option<&[String]>) -> Vec<ToolDefinition> {
        let mut definitions = self.tools.definitions(only);
        if let Some(remote) = &self.remote_tools {
            for definition in remote.definitions().await {
                let allowed = only.is_none_or(|names| names.contains(&definition.name));
                if allowed && !self.tools.contains(&definition.name) {
                    definitions.push(definition);
                }
            }
        }
        definitions
    }

    /// A local tool wins over a remote one with the same name. Names
    /// known to neither side still go through the local registry, which
    /// stamps the unprocessed audit.
    async fn dispatch_tool(&self, name: &str, arguments: serde_json::Value) -> ToolDispatch {
        if self.tools.contains(name) {
            return self.tools.dispatch(name, arguments, Some(self)).await;
        }
        if let Some(remote) = &self.remote_tools {
            if remote.contains(name).await {
                return remote.dispatch(name, arguments).await;
            }
        }
        self.tools.dispatch(name, arguments, Some(self)).await
    }

    /// Stores the inbound message and the response, with the response
    /// carrying back-references to the query. Failures here are logged
    /// and swallowed; persistence never fails the reply.
    async fn persist_exchange(
        &self,
        query: &str,
        query_embedding: Vec<f32>,
        reply_text: &str,
        conversation_id: &str,
        opts: &HandleOptions,
        tool_audit: Option<&str>,
    ) {
        let mut inbound =
            MessageRecord::new(query, query_embedding.clone(), opts.kind.clone())
                .with_conversation(conversation_id);
        if let Some(source) = &opts.source {
            inbound = inbound.with_source(source.clone());
        }
        if let Err(e) = self.store.store(inbound).await {
            warn!(error = %e, "Failed to store inbound message");
        }

        let reply_embedding = match self.embeddings.embed(reply_text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "Failed to embed response, storing without embedding");
                Vec::new()
            }
        };

        let mut response = MessageRecord::new(
            reply_text,
            reply_embedding,
            RecordKind::agent_response(),
        )
        .with_conversation(conversation_id)
        .with_original_query(query, query_embedding)
        .with_classification(self.classify(reply_text).await)
        .with_key_topics(self.extract_topics(reply_text).await);
        if let Some(source) = &opts.source {
            response = response.with_source(source.clone());
        }
        if let Some(audit) = tool_audit {
            response = response.with_tool_audit(audit);
        }
        if let Err(e) = self.store.store(response).await {
            warn!(error = %e, "Failed to store response");
        }
    }

    /// Small-model response classification; any failure means "general".
    async fn classify(&self, text: &str) -> String {
        let request = CompletionRequest::new(
            self.config.provider.small_model.clone(),
            "You label agent responses with a single category word.",
            format!(
                "Classify this response as one of: FACTUAL, OPINION, QUESTION, \
                 EMOTIONAL, ACTION\n\n{text}"
            ),
        );
        match self.completion.complete(request).await {
            Ok(response) => {
                let label = response.text.trim().to_uppercase();
                if ["FACTUAL", "OPINION", "QUESTION", "EMOTIONAL", "ACTION"]
                    .contains(&label.as_str())
                {
                    label
                } else {
                    "general".into()
                }
            }
            Err(e) => {
                debug!(error = %e, "Classification failed");
                "general".into()
            }
        }
    }

    /// Small-model topic extraction; any failure means no topics.
    async fn extract_topics(&self, text: &str) -> Vec<String> {
        let request = CompletionRequest::new(
            self.config.provider.small_model.clone(),
            "You extract topics from text.",
            format!("Extract 2-3 main topics from this text as comma-separated keywords:\n\n{text}"),
        );
        match self.completion.complete(request).await {
            Ok(response) => response
                .text
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .take(3)
                .collect(),
            Err(e) => {
                debug!(error = %e, "Topic extraction failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl AgentContext for AgentCore {
    async fn generate_image(&self, prompt: &str) -> Result<String, ToolError> {
        match &self.image_generator {
            Some(generator) => generator.generate(prompt).await,
            None => Err(ToolError::ExecutionFailed {
                tool_name: "generate_image".into(),
                reason: "no image generator configured".into(),
            }),
        }
    }
}
