//! Chain-of-thought orchestration.
//!
//! Plans a message as a JSON list of steps, executes the steps one at a
//! time feeding each the accumulated results, then synthesizes a final
//! answer. Every failure path degrades to a plain `handle_message` of
//! the original text, so the orchestrator can never do worse than the
//! direct pipeline.

use std::sync::Arc;
use std::time::Duration;

use loreagent_core::error::Error;
use loreagent_core::provider::ToolChoice;
use loreagent_core::record::RecordKind;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::pipeline::{AgentCore, AgentReply, HandleOptions};

/// One planned step. `tool` is the literal string "None" when the step
/// needs no tool.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanStep {
    pub step: String,
    pub tool: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

type MalformedCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;

pub struct ChainOfThought {
    core: Arc<AgentCore>,
    max_step_retries: u32,
    retry_delay: Duration,
    malformed: MalformedCheck,
}

impl ChainOfThought {
    pub fn new(core: Arc<AgentCore>) -> Self {
        let cot = &core.config().cot;
        let max_step_retries = cot.max_step_retries;
        let retry_delay = Duration::from_secs(cot.retry_delay_secs);
        Self {
            core,
            max_step_retries,
            retry_delay,
            // A raw marker in the text means the model tried to call a
            // tool but the call never surfaced as structured output.
            malformed: Arc::new(|text: &str| text.contains("<function")),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Replace the predicate deciding whether a step response is
    /// malformed and should be retried.
    pub fn with_malformed_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.malformed = Arc::new(check);
        self
    }

    /// Run the plan-execute-synthesize cycle. Falls back to a direct
    /// `handle_message` when planning or orchestration fails.
    pub async fn run(&self, text: &str, opts: HandleOptions) -> AgentReply {
        match self.orchestrate(text, &opts).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Chain-of-thought failed, answering directly");
                self.core.handle_message(text, opts).await
            }
        }
    }

    async fn orchestrate(&self, text: &str, opts: &HandleOptions) -> Result<AgentReply, Error> {
        let plan = self.plan(text, opts).await?;
        info!(steps = plan.len(), "Plan ready");

        let mut results: Vec<String> = Vec::new();
        let mut last_image = None;
        for (index, step) in plan.iter().enumerate() {
            let reply = self.execute_step(text, step, &results, opts).await;
            if reply.image_url.is_some() {
                last_image = reply.image_url;
            }
            let result = reply.text.unwrap_or_default();
            debug!(step = index + 1, result_len = result.len(), "Step complete");
            results.push(format!("Step {} ({}): {}", index + 1, step.step, result));
        }

        let synthesis = self.synthesize(text, &results, opts).await;
        Ok(AgentReply {
            text: synthesis.text,
            image_url: last_image,
            tool_audit: None,
        })
    }

    /// Ask for the plan with tools disabled and nothing persisted.
    /// A response that is not a JSON step array is an error, which the
    /// caller turns into the direct fallback.
    async fn plan(&self, text: &str, opts: &HandleOptions) -> Result<Vec<PlanStep>, Error> {
        let tool_names = self.core.tools().names().join(", ");
        let prompt = format!(
            "Break this message into a plan of steps. Respond ONLY with a JSON \
             array of objects, each {{\"step\": \"what to do\", \"tool\": \"tool \
             name or None\", \"parameters\": {{}}}}. Available tools: {tool_names}.\n\n\
             Message: {text}"
        );
        let reply = self
            .core
            .handle_message(&prompt, Self::quiet_options(opts))
            .await;
        let raw = reply.text.unwrap_or_default();
        serde_json::from_str::<Vec<PlanStep>>(raw.trim())
            .map_err(|e| Error::Internal(format!("unparseable plan: {e}")))
    }

    /// Run one step against the accumulated results. A step is retried
    /// when the response is malformed or when it named a tool that was
    /// never invoked, up to the configured attempt count with a fixed
    /// delay between attempts; retries force tool use. After exhaustion
    /// the last response stands.
    async fn execute_step(
        &self,
        original: &str,
        step: &PlanStep,
        prior_results: &[String],
        opts: &HandleOptions,
    ) -> AgentReply {
        let expects_tool = step.tool != "None";
        let mut step_opts = Self::quiet_options(opts);
        step_opts.kind = RecordKind::reasoning_step();
        if expects_tool && self.core.tools().contains(&step.tool) {
            step_opts.skip_tools = false;
            step_opts.tool_choice = Some(ToolChoice::Required);
            step_opts.allowed_tools = Some(vec![step.tool.clone()]);
        }

        let mut prompt = format!("Original message: {original}\n\n");
        if !prior_results.is_empty() {
            prompt.push_str("Results so far:\n");
            prompt.push_str(&prior_results.join("\n"));
            prompt.push_str("\n\n");
        }
        prompt.push_str(&format!("Current step: {}", step.step));
        if !step.parameters.is_null() && step.parameters != serde_json::json!({}) {
            prompt.push_str(&format!("\nParameters: {}", step.parameters));
        }

        let mut reply = AgentReply::default();
        for attempt in 1..=self.max_step_retries {
            reply = self.core.handle_message(&prompt, step_opts.clone()).await;
            let malformed = reply
                .text
                .as_deref()
                .map(|t| (self.malformed)(t))
                .unwrap_or(false);
            let tool_missing = expects_tool && reply.tool_audit.is_none();
            if !malformed && !tool_missing {
                return reply;
            }
            warn!(
                step = %step.step,
                attempt,
                max_attempts = self.max_step_retries,
                malformed,
                tool_missing,
                "Retrying step"
            );
            if attempt < self.max_step_retries {
                // Subsequent attempts run with tool use forced
                // mandatory, restricted to the named tool when it is
                // registered.
                step_opts.skip_tools = false;
                step_opts.tool_choice = Some(ToolChoice::Required);
                if step_opts.allowed_tools.is_none()
                    && self.core.tools().contains(&step.tool)
                {
                    step_opts.allowed_tools = Some(vec![step.tool.clone()]);
                }
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        reply
    }

    /// The final answer, composed from all step results with tools
    /// disabled. This is the one call in the cycle that persists.
    async fn synthesize(
        &self,
        original: &str,
        results: &[String],
        opts: &HandleOptions,
    ) -> AgentReply {
        let prompt = format!(
            "Original message: {original}\n\nStep results:\n{}\n\n\
             Compose the final answer to the original message from these results. \
             Do not perform more steps or request more information.",
            results.join("\n")
        );
        let mut synth_opts = opts.clone();
        synth_opts.skip_tools = true;
        synth_opts.tool_choice = None;
        synth_opts.allowed_tools = None;
        synth_opts.skip_pre_filter = true;
        self.core.handle_message(&prompt, synth_opts).await
    }

    /// Options for internal calls: no tools, no persistence, no gate.
    fn quiet_options(opts: &HandleOptions) -> HandleOptions {
        HandleOptions {
            conversation_id: opts.conversation_id.clone(),
            source: opts.source.clone(),
            model: opts.model.clone(),
            temperature: opts.temperature,
            skip_tools: true,
            skip_store: true,
            skip_pre_filter: true,
            ..HandleOptions::default()
        }
    }
}
