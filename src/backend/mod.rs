//! Generation backend collaborator interface.
//!
//! The backend owns model selection, transport, and retry policy. This crate
//! consumes it only as a source of increasingly complete partial snapshots of
//! one structured response; the final object is the last snapshot yielded.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::Result;
use crate::types::ChatMessage;

/// An asynchronous sequence of increasingly complete structured snapshots.
pub type PartialObjectStream = BoxStream<'static, Result<Value>>;

/// One structured-generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// JSON Schema the response must satisfy.
    pub schema: Value,
    /// Schema name hint for backends that want one.
    pub schema_name: String,
    /// Fully assembled prompt messages.
    pub messages: Vec<ChatMessage>,
    /// Opaque caller arguments forwarded untouched.
    pub provider_args: Value,
}

/// Language-generation backend.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Start one structured generation, returning the partial-object stream.
    ///
    /// Errors from this call or from the stream propagate to the caller
    /// uncaught; retries are the backend's concern.
    async fn generate(&self, request: GenerateRequest) -> Result<PartialObjectStream>;
}
