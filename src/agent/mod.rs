//! The agent loop and its single-shot siblings.

pub mod history;
pub mod prompt;
pub mod stream;
pub mod suggest;

pub use history::{collect_history, ChatHistorySource, HistoryMessage, HistoryPage};
pub use prompt::PromptBase;
pub use stream::AgentLoop;
