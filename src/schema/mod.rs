//! Structured-output schema construction for the current iteration.
//!
//! The generation backend is asked for JSON matching one of three shapes:
//! a free-form array of outputs, a single object with one nullable field per
//! tool, or an exec-order object whose positional keys pin the iteration to
//! its declared slots.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::{AgentError, Result};
use crate::types::{ExecIteration, ExecSlot, ToolMode};
use crate::tools::Tool;

/// The output-mode variants the builder is keyed on.
#[derive(Debug, Clone)]
pub enum OutputMode {
    /// Ordered sequence; elements are the tagged union of message and one
    /// variant per active tool.
    Array,
    /// Single object: a `message` field plus one nullable field per active
    /// tool, for turns expecting at most one call per tool.
    Object,
    /// Positional object keyed `"0".."k-1"`, one key per declared slot of
    /// the current iteration.
    ExecOrder(ExecIteration),
}

impl OutputMode {
    /// Select the mode for one iteration: the exec order wins when present,
    /// otherwise the request's tool mode.
    pub fn for_iteration(
        exec_order: Option<&[ExecIteration]>,
        iteration: usize,
        tool_mode: ToolMode,
    ) -> Result<Self> {
        match exec_order {
            Some(order) => {
                let iter = order.get(iteration).ok_or_else(|| {
                    AgentError::Configuration(format!(
                        "exec order has no iteration {iteration}"
                    ))
                })?;
                Ok(Self::ExecOrder(iter.clone()))
            }
            None => Ok(match tool_mode {
                ToolMode::Array => Self::Array,
                ToolMode::Object => Self::Object,
            }),
        }
    }
}

/// Build the structured-output schema for the current iteration.
pub fn build_output_schema(mode: &OutputMode, active_tools: &[Arc<dyn Tool>]) -> Result<Value> {
    match mode {
        OutputMode::Array => Ok(json!({
            "type": "array",
            "items": { "anyOf": output_variants(active_tools) },
        })),
        OutputMode::Object => {
            let mut properties = serde_json::Map::new();
            properties.insert(
                "message".to_string(),
                json!({ "type": ["string", "null"] }),
            );
            for tool in active_tools {
                properties.insert(tool.name().to_string(), nullable(tool.args_schema()));
            }
            let required: Vec<String> = properties.keys().cloned().collect();
            Ok(json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }))
        }
        OutputMode::ExecOrder(iteration) => {
            if iteration.outputs.is_empty() {
                return Err(AgentError::Configuration(
                    "exec order iteration declares no output slots".into(),
                ));
            }
            let mut properties = serde_json::Map::new();
            for (position, slot) in iteration.outputs.iter().enumerate() {
                properties.insert(position.to_string(), slot_schema(slot, active_tools)?);
            }
            let required: Vec<String> = properties.keys().cloned().collect();
            Ok(json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }))
        }
    }
}

/// Schema for one exec-order slot: the standard message schema, or a call
/// schema scoped to the named tool (nullable when the slot is optional).
fn slot_schema(slot: &ExecSlot, active_tools: &[Arc<dyn Tool>]) -> Result<Value> {
    match slot {
        ExecSlot::Message => Ok(message_schema()),
        ExecSlot::ToolCall { tool, optional } => {
            let tool = active_tools
                .iter()
                .find(|t| t.name().eq_ignore_ascii_case(tool))
                .ok_or_else(|| {
                    AgentError::Configuration(format!(
                        "exec order slot references inactive tool '{tool}'"
                    ))
                })?;
            let schema = tool_call_schema(tool.as_ref(), *optional);
            Ok(if *optional { nullable(schema) } else { schema })
        }
    }
}

/// Tagged-union variants for array mode: the message variant plus one call
/// variant per active tool.
fn output_variants(active_tools: &[Arc<dyn Tool>]) -> Vec<Value> {
    let mut variants = vec![message_schema()];
    variants.extend(
        active_tools
            .iter()
            .map(|tool| tool_call_schema(tool.as_ref(), false)),
    );
    variants
}

fn message_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": { "const": "message" },
            "content": { "type": "string" },
        },
        "required": ["type", "content"],
    })
}

fn tool_call_schema(tool: &dyn Tool, nullable_args: bool) -> Value {
    let args = if nullable_args {
        nullable(tool.args_schema())
    } else {
        tool.args_schema()
    };
    json!({
        "type": "object",
        "properties": {
            "type": { "const": "tool_call" },
            "tool": { "const": tool.name() },
            "args": args,
        },
        "required": ["type", "tool", "args"],
    })
}

fn nullable(schema: Value) -> Value {
    json!({ "anyOf": [schema, { "type": "null" }] })
}
