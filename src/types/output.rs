//! The agent's cumulative output log: messages, tool calls, tool results.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::message::{ChatMessage, ContentPart, Role, ToolCallContent, ToolResultContent};

/// One entry in the output log.
///
/// Ids are assigned at first appearance during reconciliation and never
/// reassigned to a different logical output; the value behind an id may be
/// refined in place while its partial snapshot is still completing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    Message(MessageOutput),
    ToolCall(ToolCallOutput),
    ToolResult(ToolResultOutput),
}

/// Assistant text produced during an iteration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageOutput {
    pub id: String,
    pub content: String,
}

/// A tool call the model chose to make.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallOutput {
    pub id: String,
    pub tool: String,
    pub args: serde_json::Value,
}

/// The result of invoking a tool call, linked by `call_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResultOutput {
    pub id: String,
    pub call_id: String,
    pub result: serde_json::Value,
}

/// Discriminator for the output union; also the type component of ids.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutputKind {
    Message,
    ToolCall,
    ToolResult,
}

impl Output {
    pub fn id(&self) -> &str {
        match self {
            Self::Message(m) => &m.id,
            Self::ToolCall(c) => &c.id,
            Self::ToolResult(r) => &r.id,
        }
    }

    pub fn kind(&self) -> OutputKind {
        match self {
            Self::Message(_) => OutputKind::Message,
            Self::ToolCall(_) => OutputKind::ToolCall,
            Self::ToolResult(_) => OutputKind::ToolResult,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCallOutput> {
        match self {
            Self::ToolCall(c) => Some(c),
            _ => None,
        }
    }
}

/// Translate the output log to caller-facing chat messages.
///
/// message → assistant text, tool_call → assistant tool-invocation entry,
/// tool_result → tool-role entry; every entry keeps its id as the message
/// `name` so callers can correlate.
pub fn outputs_to_messages(outputs: &[Output]) -> Vec<ChatMessage> {
    outputs
        .iter()
        .map(|output| match output {
            Output::Message(m) => {
                let mut msg = ChatMessage::assistant(m.content.clone());
                msg.name = Some(m.id.clone());
                msg
            }
            Output::ToolCall(c) => ChatMessage {
                role: Role::Assistant,
                content: vec![ContentPart::ToolCall(ToolCallContent {
                    id: c.id.clone(),
                    tool: c.tool.clone(),
                    args: c.args.clone(),
                })],
                name: Some(c.id.clone()),
                timestamp: None,
            },
            Output::ToolResult(r) => {
                let mut msg = ChatMessage::tool_result(r.call_id.clone(), r.result.clone(), false);
                msg.name = Some(r.id.clone());
                msg
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_preserves_order_and_roles() {
        let outputs = vec![
            Output::Message(MessageOutput {
                id: "o0".into(),
                content: "Let me check.".into(),
            }),
            Output::ToolCall(ToolCallOutput {
                id: "o1".into(),
                tool: "calculator".into(),
                args: serde_json::json!({"a": 1}),
            }),
            Output::ToolResult(ToolResultOutput {
                id: "o1-result".into(),
                call_id: "o1".into(),
                result: serde_json::json!(2),
            }),
        ];
        let messages = outputs_to_messages(&outputs);
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::Assistant, Role::Tool]);
        assert_eq!(messages[1].tool_calls()[0].tool, "calculator");
        assert_eq!(messages[2].name.as_deref(), Some("o1-result"));
    }

    #[test]
    fn kind_matches_variant() {
        let call = Output::ToolCall(ToolCallOutput {
            id: "x".into(),
            tool: "search".into(),
            args: serde_json::Value::Null,
        });
        assert_eq!(call.kind(), OutputKind::ToolCall);
        assert_eq!(call.kind().to_string(), "tool_call");
    }
}
