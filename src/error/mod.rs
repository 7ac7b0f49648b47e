//! Error types for Ouro.

use thiserror::Error;

/// Primary error type for all Ouro operations.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Invalid caller-supplied configuration: an empty exec-order iteration,
    /// a slot naming an inactive tool, or a required injector field still
    /// missing after the config merge. Propagates to the caller.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generation backend failure. Propagates uncaught; retry policy is
    /// owned by the backend collaborator.
    #[error("Backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A tool's `invoke` failed. Caught per call; the call's result is
    /// simply never appended.
    #[error("Tool invocation error: {tool_name}: {message}")]
    ToolInvocation { tool_name: String, message: String },

    /// A context injector or renderer failed. Caught per source; that
    /// source's contribution is omitted.
    #[error("Context resolution error: {source_name}: {message}")]
    ContextResolution {
        source_name: String,
        message: String,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl AgentError {
    /// Create a backend error from a message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Create a backend error wrapping an underlying error.
    pub fn backend_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a tool invocation error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Create a context resolution error.
    pub fn context(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ContextResolution {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error aborts the whole call, as opposed to being
    /// isolated at the extension point where it occurred.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Backend { .. } | Self::InvalidState(_)
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(AgentError::Configuration("bad".into()).is_fatal());
        assert!(AgentError::backend("down").is_fatal());
        assert!(!AgentError::tool("calc", "overflow").is_fatal());
        assert!(!AgentError::context("skills", "missing row").is_fatal());
    }

    #[test]
    fn display_includes_source_name() {
        let err = AgentError::context("lesson", "lookup failed");
        assert!(err.to_string().contains("lesson"));
    }
}
