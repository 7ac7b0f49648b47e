//! Common imports for working with Ouro.

pub use crate::agent::{AgentLoop, ChatHistorySource, HistoryMessage, HistoryPage};
pub use crate::backend::{GenerateRequest, GenerationBackend, PartialObjectStream};
pub use crate::context::{ContextInjector, ContextRenderer, InjectorRegistry, RendererRegistry};
pub use crate::error::{AgentError, Result};
pub use crate::tools::{ArgsSchema, CallContext, FnTool, Tool, ToolArgs, ToolRegistry};
pub use crate::types::{
    AgentStreamRequest, AgentStreamResult, ChatMessage, CmrInvokeConfig, ContextInjectorConfig,
    ExecIteration, ExecOrder, ExecSlot, LoopSettings, Output, Role, SuggestRequest, SuggestResult,
    ToolMode,
};
