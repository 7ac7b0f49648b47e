//! Name-keyed tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

use super::tool::Tool;

/// Registry of invokable tools. Names are unique case-insensitively;
/// lookups ignore case; iteration follows registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, rejecting case-insensitive duplicates.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let key = tool.name().to_ascii_lowercase();
        if self.index.contains_key(&key) {
            return Err(AgentError::Configuration(format!(
                "tool '{}' is already registered",
                tool.name()
            )));
        }
        self.index.insert(key, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Look up a tool by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&i| Arc::clone(&self.tools[i]))
    }

    /// All registered tools, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    /// The subset named in `active`, in registration order. Unknown names
    /// are ignored; exec-order validation reports them where it matters.
    pub fn active_set(&self, active: &[String]) -> Vec<Arc<dyn Tool>> {
        let wanted: Vec<String> = active.iter().map(|n| n.to_ascii_lowercase()).collect();
        self.tools
            .iter()
            .filter(|t| wanted.iter().any(|w| w == &t.name().to_ascii_lowercase()))
            .map(Arc::clone)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
