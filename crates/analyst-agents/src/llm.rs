//! LLM access for the research nodes

use crate::error::PromptError;
use analyst_core::{NodeContext, NodeFault, Stage};
use analyst_llm::{complete_text, LLMError, LLMProvider, Prompt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Provider plus model, shared by every LLM node of a run
#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Complete a prompt, giving up when the run is cancelled
    pub async fn ask(
        &self,
        stage: Stage,
        prompt: &Prompt,
        ctx: &NodeContext,
    ) -> Result<String, NodeFault> {
        debug!(
            %stage,
            model = %self.model,
            prompt_chars = prompt.system.len() + prompt.user.len(),
            "Sending prompt"
        );

        tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => Err(NodeFault::cancelled(stage)),
            result = complete_text(self.provider.as_ref(), &self.model, prompt) => {
                result.map_err(|e| llm_fault(stage, e))
            }
        }
    }
}

/// Classify a backend error for the controller
pub(crate) fn llm_fault(stage: Stage, err: LLMError) -> NodeFault {
    match err {
        LLMError::EmptyCompletion => NodeFault::malformed(stage, "model returned no text"),
        other => {
            if !other.is_transient() {
                warn!(%stage, error = %other, "Non-transient LLM error");
            }
            NodeFault::backend(stage, other.to_string())
        }
    }
}

/// Template failures are programming errors, never retried
pub(crate) fn prompt_fault(stage: Stage, err: PromptError) -> NodeFault {
    NodeFault::internal(stage, err.to_string())
}
