//! Prompt assembly for one generation call.
//!
//! Order: system instructions, the concatenated context-injector block, the
//! tool section (descriptions and explanations), the CMR-rendered history,
//! and finally the output log translated back to message form.

use std::sync::Arc;

use tracing::warn;

use crate::context::{InjectorRegistry, RendererRegistry};
use crate::tools::{CallContext, Tool};
use crate::types::{
    outputs_to_messages, ChatMessage, CmrInvokeConfig, ContextInjectorConfig, Output,
};

/// The per-call prompt pieces that do not change between iterations:
/// everything except the output-log tail.
pub struct PromptBase {
    messages: Vec<ChatMessage>,
}

impl PromptBase {
    /// Resolve injectors, tool explanations, and CMR rendering once for the
    /// whole call.
    pub async fn assemble(
        system: Option<&str>,
        injectors: &InjectorRegistry,
        renderers: &RendererRegistry,
        enabled_injectors: &[ContextInjectorConfig],
        enabled_renderers: &[CmrInvokeConfig],
        ctx: &CallContext,
        history: &[ChatMessage],
        active_tools: &[Arc<dyn Tool>],
    ) -> Self {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(ChatMessage::system(system));
        }
        if let Some(block) = injectors.resolve_block(enabled_injectors, ctx).await {
            messages.push(ChatMessage::system(format!("# Context\n\n{block}")));
        }
        if let Some(tool_section) = tool_section(active_tools).await {
            messages.push(ChatMessage::system(tool_section));
        }
        messages.extend(renderers.render_history(history, enabled_renderers).await);
        Self { messages }
    }

    /// The base plus the current output log, for one iteration's request.
    pub fn with_outputs(&self, outputs: &[Output]) -> Vec<ChatMessage> {
        let mut messages = self.messages.clone();
        messages.extend(outputs_to_messages(outputs));
        messages
    }
}

/// Render the tool section: each active tool's description plus its
/// explanation when it provides one. A failing `explain` only loses that
/// tool's explanation.
async fn tool_section(active_tools: &[Arc<dyn Tool>]) -> Option<String> {
    if active_tools.is_empty() {
        return None;
    }
    let explanations =
        futures::future::join_all(active_tools.iter().map(|tool| tool.explain())).await;
    let mut lines = vec!["# Tools".to_string()];
    for (tool, explanation) in active_tools.iter().zip(explanations) {
        lines.push(format!("- {}: {}", tool.name(), tool.description()));
        match explanation {
            Ok(Some(text)) => lines.push(format!("  {text}")),
            Ok(None) => {}
            Err(err) => {
                warn!(tool = tool.name(), error = %err, "tool explanation failed; omitting");
            }
        }
    }
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ArgsSchema, FnTool};
    use crate::types::{MessageOutput, Role};

    #[tokio::test]
    async fn base_orders_system_then_tools_then_history() {
        let injectors = InjectorRegistry::new();
        let renderers = RendererRegistry::new();
        let tool: Arc<dyn Tool> = Arc::new(
            FnTool::new("calculator", "Arithmetic", ArgsSchema::empty(), |_, _| async {
                Ok(serde_json::Value::Null)
            })
            .with_explanation("Use for exact arithmetic."),
        );
        let base = PromptBase::assemble(
            Some("You are a tutor."),
            &injectors,
            &renderers,
            &[],
            &[],
            &CallContext::default(),
            &[ChatMessage::user("Hello!")],
            &[tool],
        )
        .await;

        let messages = base.with_outputs(&[Output::Message(MessageOutput {
            id: "0:0:message".into(),
            content: "Hi!".into(),
        })]);
        assert_eq!(messages[0].text(), "You are a tutor.");
        assert!(messages[1].text().contains("calculator: Arithmetic"));
        assert!(messages[1].text().contains("Use for exact arithmetic."));
        assert_eq!(messages[2].role, Role::User);
        assert_eq!(messages[3].role, Role::Assistant);
    }

    #[tokio::test]
    async fn no_tools_means_no_tool_section() {
        let base = PromptBase::assemble(
            None,
            &InjectorRegistry::new(),
            &RendererRegistry::new(),
            &[],
            &[],
            &CallContext::default(),
            &[ChatMessage::user("Hello!")],
            &[],
        )
        .await;
        let messages = base.with_outputs(&[]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }
}
