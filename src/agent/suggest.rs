//! Suggested-next-messages generation.
//!
//! A single-shot sibling of the loop: same injector and renderer assembly,
//! one structured generation, no iteration.

use futures::StreamExt;
use serde_json::{json, Value};
use tracing::debug;

use crate::backend::GenerateRequest;
use crate::error::Result;
use crate::tools::CallContext;
use crate::types::{ChatMessage, SuggestRequest, SuggestResult};

use super::history::{collect_history, ChatHistorySource};
use super::prompt::PromptBase;
use super::stream::AgentLoop;

impl AgentLoop {
    /// Propose candidate follow-up user messages for the given chat history,
    /// streaming partial suggestion lists to the request's sink.
    pub async fn stream_suggested_next_messages(
        &self,
        request: SuggestRequest,
        history: &dyn ChatHistorySource,
    ) -> Result<SuggestResult> {
        debug!(call_id = %request.call_id, count = request.count, "suggestion stream start");

        let full_history = collect_history(history).await?;
        let base = PromptBase::assemble(
            request.system.as_deref(),
            &self.injectors,
            &self.renderers,
            &request.active_context_injectors,
            &request.active_renderers,
            &CallContext::default(),
            &full_history,
            &[],
        )
        .await;

        let mut messages = base.with_outputs(&[]);
        messages.push(ChatMessage::system(format!(
            "Propose up to {} short candidate messages the user might plausibly \
             send next, phrased in the user's voice.",
            request.count
        )));

        let mut snapshots = self
            .backend
            .generate(GenerateRequest {
                schema: suggestion_schema(request.count),
                schema_name: "suggested_user_messages".into(),
                messages,
                provider_args: request.settings.provider_args.clone(),
            })
            .await?;

        let mut latest: Vec<String> = Vec::new();
        while let Some(snapshot) = snapshots.next().await {
            let suggestions = parse_suggestions(&snapshot?);
            // Partial lists only ever grow; never retract a shown suggestion.
            if suggestions.len() >= latest.len() {
                latest = suggestions;
                if let Some(sink) = &request.on_partial_suggestions {
                    sink(&latest);
                }
            }
        }

        Ok(SuggestResult {
            suggested_user_messages: latest,
        })
    }
}

fn suggestion_schema(count: usize) -> Value {
    json!({
        "type": "object",
        "properties": {
            "suggested_user_messages": {
                "type": "array",
                "items": { "type": "string" },
                "maxItems": count,
            },
        },
        "required": ["suggested_user_messages"],
    })
}

fn parse_suggestions(snapshot: &Value) -> Vec<String> {
    snapshot
        .get("suggested_user_messages")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ignores_incomplete_items() {
        let snapshot = json!({
            "suggested_user_messages": ["Tell me more", null, "What next?"],
        });
        assert_eq!(
            parse_suggestions(&snapshot),
            vec!["Tell me more".to_string(), "What next?".to_string()]
        );
        assert!(parse_suggestions(&json!({})).is_empty());
    }

    #[test]
    fn schema_caps_item_count() {
        let schema = suggestion_schema(3);
        assert_eq!(schema["properties"]["suggested_user_messages"]["maxItems"], 3);
    }
}
