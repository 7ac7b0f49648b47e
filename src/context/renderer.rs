//! Context message renderers (CMRs).
//!
//! A CMR turns a tagged context-role history entry into rendered prompt
//! text, typically via an external lookup. Rendering never aborts the call:
//! any failure drops that one message.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{AgentError, Result};
use crate::types::{ChatMessage, CmrInvokeConfig, Role};

/// Renders one kind of context message into prompt text.
#[async_trait]
pub trait ContextRenderer: Send + Sync {
    /// Renderer kind, matched case-insensitively against
    /// [`crate::types::ContextData::kind`].
    fn kind(&self) -> &str;

    /// Render the message. Must reject non-context messages; the registry
    /// treats any error as "drop this message".
    async fn render(&self, message: &ChatMessage) -> Result<String>;
}

/// Kind-keyed renderer registry.
#[derive(Default)]
pub struct RendererRegistry {
    renderers: HashMap<String, Arc<dyn ContextRenderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, renderer: Arc<dyn ContextRenderer>) {
        self.renderers
            .insert(renderer.kind().to_ascii_lowercase(), renderer);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn ContextRenderer>> {
        self.renderers.get(&kind.to_ascii_lowercase()).cloned()
    }

    /// Replace context messages in `messages` with synthetic system messages
    /// at the same history position. A context message whose kind has no
    /// active renderer, or whose renderer fails or returns empty text, is
    /// dropped without error.
    pub async fn render_history(
        &self,
        messages: &[ChatMessage],
        active: &[CmrInvokeConfig],
    ) -> Vec<ChatMessage> {
        let mut rendered = Vec::with_capacity(messages.len());
        for message in messages {
            if message.role != Role::Context {
                rendered.push(message.clone());
                continue;
            }
            match self.render_context_message(message, active).await {
                Some(text) => rendered.push(ChatMessage::system(text)),
                None => {}
            }
        }
        rendered
    }

    async fn render_context_message(
        &self,
        message: &ChatMessage,
        active: &[CmrInvokeConfig],
    ) -> Option<String> {
        let Some(data) = message.context_data() else {
            warn!("context message without payload; dropping");
            return None;
        };
        let activated = active
            .iter()
            .any(|cfg| cfg.kind.eq_ignore_ascii_case(&data.kind));
        if !activated {
            debug!(kind = %data.kind, "no active renderer for context message; dropping");
            return None;
        }
        let Some(renderer) = self.get(&data.kind) else {
            debug!(kind = %data.kind, "no registered renderer for context message; dropping");
            return None;
        };
        match renderer.render(message).await {
            Ok(text) if text.is_empty() => {
                debug!(kind = %data.kind, "renderer produced empty text; dropping");
                None
            }
            Ok(text) => Some(text),
            Err(err) => {
                warn!(kind = %data.kind, error = %err, "context renderer failed; dropping message");
                None
            }
        }
    }
}

/// Guard for renderer implementations: error unless `message` is a
/// context message.
pub fn require_context_role(message: &ChatMessage) -> Result<()> {
    if message.role != Role::Context {
        return Err(AgentError::InvalidState(format!(
            "renderer expected a context message, got role '{}'",
            message.role
        )));
    }
    Ok(())
}
