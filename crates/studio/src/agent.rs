use backend::AgentRequest;
use serde_json::Value;
use tracing::{debug, info};
use workflow::{operation, resolve_media_url, GenerationForm};

use crate::{AgentContext, Busy, Studio, StudioError, TreeUpdate};

/// Operation used when the agent recommends nothing the catalog knows.
const FALLBACK_MODULE: &str = "TextGenerateImage";

impl Studio {
    /// Asks the planning agent about `node_id`. The answer replaces any
    /// earlier agent context.
    pub async fn invoke_agent(
        &self,
        node_id: &str,
        user_input: &str,
        image_path: Option<&str>,
    ) -> Result<AgentContext, StudioError> {
        let module = self.state.lock().node(node_id).map(|n| n.module_id.clone());
        let Some(module) = module else {
            return Err(self.fail("Agent", StudioError::UnknownNode(node_id.to_string())));
        };
        let request = AgentRequest {
            user_input: user_input.to_string(),
            node_id: node_id.to_string(),
            image_url: image_path.map(|p| resolve_media_url(self.config.media_base(), p)),
            workflow_context: Some(module),
        };
        debug!(node_id, "invoking agent");
        let _busy = self.busy(Busy::Agent);
        self.set_status("Asking the planning agent...");
        let result = self
            .backend
            .process_agent(&request)
            .await
            .map_err(|e| self.fail("Agent", e.into()))?;
        let context = AgentContext {
            node_id: node_id.to_string(),
            user_input: user_input.to_string(),
            result,
        };
        info!(
            node_id,
            recommended = ?context.result.recommended_module(),
            "agent answered"
        );
        let mut state = self.state.lock();
        state.agent_context = Some(context.clone());
        state.status = "Agent suggestion ready.".to_string();
        Ok(context)
    }

    pub fn agent_context(&self) -> Option<AgentContext> {
        self.state.lock().agent_context.clone()
    }

    pub fn clear_agent_context(&self) {
        self.state.lock().agent_context = None;
    }

    /// Creates a child of `anchor` from the stored agent context: the
    /// recommended operation, prefilled with the suggested prompts. The
    /// context is consumed once the node exists.
    pub async fn create_from_agent(&self, anchor: &str) -> Result<TreeUpdate, StudioError> {
        let context = self.agent_context();
        let Some(context) = context else {
            return Err(self.fail("Create from agent", StudioError::NoAgentContext));
        };
        let module = context
            .result
            .recommended_module()
            .filter(|m| operation(m).is_some())
            .unwrap_or(FALLBACK_MODULE);

        let mut form = GenerationForm::open(None, Some(module), Some(anchor.to_string()));
        let prompts = &context.result.prompts;
        for (key, value) in [
            ("positive_prompt", &prompts.positive),
            ("negative_prompt", &prompts.negative),
            ("text", &prompts.text),
        ] {
            if let Some(value) = value {
                form.set(key, Value::String(value.clone()));
            }
        }
        let (module_id, parameters) = form.submit();
        let update = self
            .create_node("Create from agent", &module_id, parameters, vec![anchor.to_string()])
            .await?;
        self.clear_agent_context();
        Ok(update)
    }
}
