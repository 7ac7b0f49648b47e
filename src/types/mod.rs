//! Core types: messages, outputs, requests.

pub mod message;
pub mod output;
pub mod request;

pub use message::{ChatMessage, ContentPart, ContextData, Role, ToolCallContent, ToolResultContent};
pub use output::{
    outputs_to_messages, MessageOutput, Output, OutputKind, ToolCallOutput, ToolResultOutput,
};
pub use request::{
    AgentStreamRequest, AgentStreamResult, CallId, CmrInvokeConfig, ContextInjectorConfig,
    ExecIteration, ExecOrder, ExecSlot, LoopSettings, PartialOutputSink, SuggestRequest,
    SuggestResult, SuggestionSink, ToolMode,
};
