//! Request and result types for the agent loop.

use std::sync::Arc;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::message::ChatMessage;
use super::output::Output;

/// Unique identifier for one `stream()` invocation, used for log correlation.
pub type CallId = Uuid;

/// Callback invoked with the filtered output log after every reconciliation.
pub type PartialOutputSink = Arc<dyn Fn(&[Output]) + Send + Sync>;

/// Callback invoked with the partial suggestion list as it streams in.
pub type SuggestionSink = Arc<dyn Fn(&[String]) + Send + Sync>;

/// How tool calls are shaped in the structured output when no exec order
/// is supplied.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ToolMode {
    /// Free-form ordered sequence of messages and tool calls.
    #[default]
    Array,
    /// One nullable field per active tool; at most one call per tool.
    Object,
}

/// One required output slot within an exec-order iteration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum ExecSlot {
    Message,
    ToolCall {
        tool: String,
        #[serde(default)]
        optional: bool,
    },
}

impl ExecSlot {
    /// A required call slot for `tool`.
    pub fn tool_call(tool: impl Into<String>) -> Self {
        Self::ToolCall {
            tool: tool.into(),
            optional: false,
        }
    }

    /// An optional call slot for `tool`; the model may decline it by
    /// emitting null args.
    pub fn optional_tool_call(tool: impl Into<String>) -> Self {
        Self::ToolCall {
            tool: tool.into(),
            optional: true,
        }
    }
}

/// The declared output slots for one iteration of the loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecIteration {
    pub outputs: Vec<ExecSlot>,
}

impl ExecIteration {
    pub fn new(outputs: Vec<ExecSlot>) -> Self {
        Self { outputs }
    }
}

/// Caller-specified per-iteration turn choreography. When present, the loop
/// runs exactly `len()` iterations and each iteration's structured output is
/// pinned to its declared slots.
pub type ExecOrder = Vec<ExecIteration>;

/// Enables one registered context injector for this call, with per-call
/// configuration deep-merged onto the injector's declared default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextInjectorConfig {
    pub name: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl ContextInjectorConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: serde_json::Value::Null,
        }
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }
}

/// Enables one registered context message renderer for this call; `kind` is
/// matched case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CmrInvokeConfig {
    pub kind: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl CmrInvokeConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            config: serde_json::Value::Null,
        }
    }
}

/// Tunables for one loop invocation.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct LoopSettings {
    /// Hard iteration cap. The loop warns and returns accumulated outputs
    /// when it is hit.
    #[builder(default = 10)]
    pub max_iterations: usize,
    /// Streaming-debounce threshold: raw entries with fewer populated fields
    /// are suppressed as half-formed JSON. Not a semantic guarantee.
    #[builder(default = 2)]
    pub min_populated_fields: usize,
    /// Opaque arguments forwarded to the generation backend.
    #[builder(default)]
    pub provider_args: serde_json::Value,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            min_populated_fields: 2,
            provider_args: serde_json::Value::Null,
        }
    }
}

/// Request payload for `AgentLoop::stream`.
#[derive(Clone)]
pub struct AgentStreamRequest {
    pub call_id: CallId,
    pub messages: Vec<ChatMessage>,
    pub system: Option<String>,
    /// Names of tools (from the registry) the model may call this turn.
    pub active_tools: Vec<String>,
    pub active_context_injectors: Vec<ContextInjectorConfig>,
    pub active_renderers: Vec<CmrInvokeConfig>,
    pub exec_order: Option<ExecOrder>,
    pub tool_mode: ToolMode,
    pub on_partial_outputs: Option<PartialOutputSink>,
    pub settings: LoopSettings,
    /// Opaque caller metadata handed to tools and injectors.
    pub metadata: serde_json::Value,
}

impl AgentStreamRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            messages,
            system: None,
            active_tools: Vec::new(),
            active_context_injectors: Vec::new(),
            active_renderers: Vec::new(),
            exec_order: None,
            tool_mode: ToolMode::default(),
            on_partial_outputs: None,
            settings: LoopSettings::default(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_active_tools(mut self, tools: Vec<String>) -> Self {
        self.active_tools = tools;
        self
    }

    pub fn with_context_injectors(mut self, injectors: Vec<ContextInjectorConfig>) -> Self {
        self.active_context_injectors = injectors;
        self
    }

    pub fn with_renderers(mut self, renderers: Vec<CmrInvokeConfig>) -> Self {
        self.active_renderers = renderers;
        self
    }

    pub fn with_exec_order(mut self, exec_order: ExecOrder) -> Self {
        self.exec_order = Some(exec_order);
        self
    }

    pub fn with_tool_mode(mut self, mode: ToolMode) -> Self {
        self.tool_mode = mode;
        self
    }

    pub fn with_partial_output_sink(mut self, sink: PartialOutputSink) -> Self {
        self.on_partial_outputs = Some(sink);
        self
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Final result of one loop invocation.
#[derive(Debug, Clone)]
pub struct AgentStreamResult {
    /// The raw output log, in first-appearance order.
    pub outputs: Vec<Output>,
    /// The log translated to caller-facing chat messages.
    pub messages: Vec<ChatMessage>,
    /// Number of generation iterations that ran.
    pub iterations: usize,
}

/// Request payload for the suggested-next-messages generator.
#[derive(Clone)]
pub struct SuggestRequest {
    pub call_id: CallId,
    pub system: Option<String>,
    pub active_context_injectors: Vec<ContextInjectorConfig>,
    pub active_renderers: Vec<CmrInvokeConfig>,
    /// How many candidate messages to ask for.
    pub count: usize,
    pub on_partial_suggestions: Option<SuggestionSink>,
    pub settings: LoopSettings,
}

impl SuggestRequest {
    pub fn new() -> Self {
        Self {
            call_id: Uuid::new_v4(),
            system: None,
            active_context_injectors: Vec::new(),
            active_renderers: Vec::new(),
            count: 3,
            on_partial_suggestions: None,
            settings: LoopSettings::default(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_context_injectors(mut self, injectors: Vec<ContextInjectorConfig>) -> Self {
        self.active_context_injectors = injectors;
        self
    }

    pub fn with_renderers(mut self, renderers: Vec<CmrInvokeConfig>) -> Self {
        self.active_renderers = renderers;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_suggestion_sink(mut self, sink: SuggestionSink) -> Self {
        self.on_partial_suggestions = Some(sink);
        self
    }
}

impl Default for SuggestRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Final result of a suggestion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestResult {
    pub suggested_user_messages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_builder_defaults() {
        let settings = LoopSettings::builder().build();
        assert_eq!(settings.max_iterations, 10);
        assert_eq!(settings.min_populated_fields, 2);
    }

    #[test]
    fn exec_slot_serde_shape() {
        let slot = ExecSlot::optional_tool_call("calculator");
        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json["slot"], "tool_call");
        assert_eq!(json["optional"], true);
    }
}
