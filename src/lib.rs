//! Ouro: agent orchestration core.
//!
//! Drives multi-turn interaction between a language-generation backend, a
//! set of pluggable context providers, and a set of invokable tools,
//! producing an ordered, append-only log of typed outputs (messages, tool
//! calls, tool results). Transport, model selection, and persistence stay
//! with the collaborators behind [`backend::GenerationBackend`] and
//! [`agent::ChatHistorySource`].
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ouro::prelude::*;
//!
//! # async fn example(backend: Arc<dyn GenerationBackend>) -> ouro::error::Result<()> {
//! let agent = AgentLoop::new(backend);
//! let result = agent
//!     .stream(AgentStreamRequest::new(vec![ChatMessage::user("Hello!")]))
//!     .await?;
//! for message in &result.messages {
//!     println!("{}: {}", message.role, message.text());
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod backend;
pub mod context;
pub mod error;
pub mod prelude;
pub mod reconcile;
pub mod schema;
pub mod tools;
pub mod types;
