//! Tool system: trait, registry, and invocation bookkeeping.

pub mod registry;
pub mod status;
pub mod tool;

pub use registry::ToolRegistry;
pub use status::{CallLedger, CallStatus};
pub use tool::{ArgsSchema, ArgsSchemaBuilder, CallContext, FnTool, Tool, ToolArgs};
