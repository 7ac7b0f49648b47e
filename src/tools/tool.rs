//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AgentError, Result};

/// Context available while resolving extensions for one call: tool
/// invocations and context injectors both receive it.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Additional caller metadata.
    pub metadata: Value,
    /// Id of the tool-call output being invoked, when applicable.
    pub tool_call_id: Option<String>,
    /// Name of the tool being invoked, when applicable.
    pub tool_name: Option<String>,
}

/// An invokable capability the model may call.
///
/// Names are unique case-insensitively within a registry. A tool without
/// invocation behavior (`invoke` returning `Ok(None)`) still contributes its
/// schema and explanation; the loop skips it at invocation time.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model emits).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema for the call arguments.
    fn args_schema(&self) -> Value;

    /// Whether calling this tool forces another generation pass.
    fn requires_iteration(&self) -> bool {
        false
    }

    /// Invoke the tool. `Ok(None)` means the tool declares no invocation
    /// behavior and the call is skipped without a result.
    async fn invoke(&self, args: &ToolArgs, ctx: &CallContext) -> Result<Option<Value>> {
        let _ = (args, ctx);
        Ok(None)
    }

    /// Optional usage explanation included in the prompt's tool section.
    async fn explain(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Type alias for the closure-tool handler.
type ToolHandler = dyn Fn(ToolArgs, CallContext) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
pub struct FnTool {
    name: String,
    description: String,
    args_schema: ArgsSchema,
    requires_iteration: bool,
    explanation: Option<String>,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        args_schema: ArgsSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArgs, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            args_schema,
            requires_iteration: false,
            explanation: None,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }

    /// Mark the tool as forcing another generation pass after it is called.
    pub fn with_requires_iteration(mut self, requires: bool) -> Self {
        self.requires_iteration = requires;
        self
    }

    /// Attach a static usage explanation.
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn args_schema(&self) -> Value {
        self.args_schema.schema.clone()
    }

    fn requires_iteration(&self) -> bool {
        self.requires_iteration
    }

    async fn invoke(&self, args: &ToolArgs, ctx: &CallContext) -> Result<Option<Value>> {
        (self.handler)(args.clone(), ctx.clone()).await.map(Some)
    }

    async fn explain(&self) -> Result<Option<String>> {
        Ok(self.explanation.clone())
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("requires_iteration", &self.requires_iteration)
            .finish()
    }
}

/// Parsed tool-call arguments with typed accessors.
#[derive(Debug, Clone)]
pub struct ToolArgs {
    value: Value,
}

impl ToolArgs {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// The raw argument object.
    pub fn raw(&self) -> &Value {
        &self.value
    }

    /// Deserialize the whole argument object into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.value.clone())?)
    }

    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.value
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(key, "string"))
    }

    pub fn get_f64(&self, key: &str) -> Result<f64> {
        self.value
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| missing(key, "number"))
    }

    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.value
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| missing(key, "integer"))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.value
            .get(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| missing(key, "boolean"))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }
}

fn missing(key: &str, expected: &str) -> AgentError {
    AgentError::InvalidState(format!("argument '{key}' missing or not a {expected}"))
}

/// JSON Schema-based argument definition for a tool.
#[derive(Debug, Clone)]
pub struct ArgsSchema {
    pub schema: Value,
}

impl ArgsSchema {
    /// Create from a raw JSON Schema value.
    pub fn from_schema(schema: Value) -> Self {
        Self { schema }
    }

    /// Create an empty schema (no arguments).
    pub fn empty() -> Self {
        Self {
            schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
        }
    }

    /// Builder: create an object schema with properties.
    pub fn object() -> ArgsSchemaBuilder {
        ArgsSchemaBuilder {
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }
}

/// Builder for constructing tool argument schemas.
pub struct ArgsSchemaBuilder {
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl ArgsSchemaBuilder {
    /// Add a string property.
    pub fn string(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.property(name, "string", description, required)
    }

    /// Add a number property.
    pub fn number(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.property(name, "number", description, required)
    }

    /// Add a boolean property.
    pub fn boolean(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.property(name, "boolean", description, required)
    }

    /// Add an enum (string) property.
    pub fn string_enum(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
        required: bool,
    ) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            serde_json::json!({
                "type": "string",
                "description": description.into(),
                "enum": values,
            }),
        );
        if required {
            self.required.push(name);
        }
        self
    }

    fn property(
        mut self,
        name: impl Into<String>,
        kind: &str,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            serde_json::json!({
                "type": kind,
                "description": description.into(),
            }),
        );
        if required {
            self.required.push(name);
        }
        self
    }

    /// Build into an [`ArgsSchema`].
    pub fn build(self) -> ArgsSchema {
        ArgsSchema {
            schema: serde_json::json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}
