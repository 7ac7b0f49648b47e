//! Context injectors: named providers of background prompt text.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::tools::CallContext;
use crate::types::ContextInjectorConfig;

/// One injector's rendered contribution to the prompt's context section.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSection {
    pub name: String,
    pub description: Option<String>,
    pub content: String,
}

/// Pluggable provider of background text, independent of message history.
///
/// `resolve` receives the per-call config deep-merged onto
/// [`ContextInjector::default_config`]. A missing required field should be
/// reported as [`crate::error::AgentError::Configuration`]; the loop catches
/// it per injector so siblings are unaffected.
#[async_trait]
pub trait ContextInjector: Send + Sync {
    fn name(&self) -> &str;

    fn default_config(&self) -> Value {
        Value::Null
    }

    async fn resolve(&self, ctx: &CallContext, config: &Value) -> Result<ContextSection>;
}

/// Explicit injector registry, passed at startup and injected into the loop.
/// Lookups are case-insensitive; iteration follows registration order.
#[derive(Default)]
pub struct InjectorRegistry {
    injectors: Vec<Arc<dyn ContextInjector>>,
    index: HashMap<String, usize>,
}

impl InjectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, injector: Arc<dyn ContextInjector>) {
        let key = injector.name().to_ascii_lowercase();
        if let Some(&at) = self.index.get(&key) {
            self.injectors[at] = injector;
            return;
        }
        self.index.insert(key, self.injectors.len());
        self.injectors.push(injector);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ContextInjector>> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&i| Arc::clone(&self.injectors[i]))
    }

    /// All registered injectors, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ContextInjector>> {
        self.injectors.iter()
    }

    /// Resolve one injector with per-call overrides deep-merged onto its
    /// declared default.
    pub async fn resolve_one(
        &self,
        name: &str,
        ctx: &CallContext,
        overrides: &Value,
    ) -> Option<Result<ContextSection>> {
        let injector = self.get(name)?;
        let merged = deep_merge(injector.default_config(), overrides);
        Some(injector.resolve(ctx, &merged).await)
    }

    /// Resolve every enabled injector and concatenate their sections into
    /// one context block. Sections run concurrently but concatenate in
    /// registration order, independent of completion order. A failing
    /// injector contributes nothing; siblings are unaffected.
    pub async fn resolve_block(
        &self,
        enabled: &[ContextInjectorConfig],
        ctx: &CallContext,
    ) -> Option<String> {
        let selected: Vec<(&Arc<dyn ContextInjector>, &ContextInjectorConfig)> = self
            .injectors
            .iter()
            .filter_map(|injector| {
                enabled
                    .iter()
                    .find(|cfg| cfg.name.eq_ignore_ascii_case(injector.name()))
                    .map(|cfg| (injector, cfg))
            })
            .collect();
        if selected.is_empty() {
            return None;
        }

        let resolutions = futures::future::join_all(selected.iter().map(|(injector, cfg)| {
            let merged = deep_merge(injector.default_config(), &cfg.config);
            async move { injector.resolve(ctx, &merged).await }
        }))
        .await;

        let mut sections = Vec::new();
        for ((injector, _), resolution) in selected.iter().zip(resolutions) {
            match resolution {
                Ok(section) => sections.push(render_section(&section)),
                Err(err) => {
                    warn!(
                        injector = injector.name(),
                        error = %err,
                        "context injector failed; omitting its section"
                    );
                }
            }
        }
        if sections.is_empty() {
            debug!("no context injector produced content");
            return None;
        }
        Some(sections.join("\n\n"))
    }
}

fn render_section(section: &ContextSection) -> String {
    match &section.description {
        Some(description) => format!(
            "## {}\n{}\n\n{}",
            section.name, description, section.content
        ),
        None => format!("## {}\n{}", section.name, section.content),
    }
}

/// Deep-merge `overrides` onto `base`: objects merge key by key, any other
/// override value replaces the base, null overrides are ignored.
pub fn deep_merge(base: Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (base, Value::Null) => base,
        (Value::Object(mut base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                let merged = match base.remove(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                base.insert(key.clone(), merged);
            }
            Value::Object(base)
        }
        (_, overrides) => overrides.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct StaticInjector {
        name: &'static str,
        default: Value,
    }

    #[async_trait]
    impl ContextInjector for StaticInjector {
        fn name(&self) -> &str {
            self.name
        }

        fn default_config(&self) -> Value {
            self.default.clone()
        }

        async fn resolve(&self, _ctx: &CallContext, config: &Value) -> Result<ContextSection> {
            let subject = config
                .get("subject")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    AgentError::Configuration(format!("injector '{}' requires 'subject'", self.name))
                })?;
            Ok(ContextSection {
                name: self.name.to_string(),
                description: None,
                content: format!("subject={subject}"),
            })
        }
    }

    #[test]
    fn deep_merge_nested_objects() {
        let base = json!({"a": {"x": 1, "y": 2}, "b": true});
        let merged = deep_merge(base, &json!({"a": {"y": 3}, "c": "new"}));
        assert_eq!(merged, json!({"a": {"x": 1, "y": 3}, "b": true, "c": "new"}));
    }

    #[test]
    fn deep_merge_null_override_keeps_base() {
        let merged = deep_merge(json!({"a": 1}), &Value::Null);
        assert_eq!(merged, json!({"a": 1}));
    }

    #[tokio::test]
    async fn block_concatenates_in_registration_order() {
        let mut registry = InjectorRegistry::new();
        registry.register(Arc::new(StaticInjector {
            name: "first",
            default: json!({"subject": "math"}),
        }));
        registry.register(Arc::new(StaticInjector {
            name: "second",
            default: json!({"subject": "music"}),
        }));

        // Enabled list in reverse order; registration order still wins.
        let enabled = vec![
            ContextInjectorConfig::new("SECOND"),
            ContextInjectorConfig::new("first"),
        ];
        let block = registry
            .resolve_block(&enabled, &CallContext::default())
            .await
            .unwrap();
        let first_at = block.find("## first").unwrap();
        let second_at = block.find("## second").unwrap();
        assert!(first_at < second_at);
    }

    #[tokio::test]
    async fn failing_injector_does_not_poison_siblings() {
        let mut registry = InjectorRegistry::new();
        registry.register(Arc::new(StaticInjector {
            name: "broken",
            default: Value::Null,
        }));
        registry.register(Arc::new(StaticInjector {
            name: "healthy",
            default: json!({"subject": "math"}),
        }));

        let enabled = vec![
            ContextInjectorConfig::new("broken"),
            ContextInjectorConfig::new("healthy"),
        ];
        let block = registry
            .resolve_block(&enabled, &CallContext::default())
            .await
            .unwrap();
        assert!(block.contains("## healthy"));
        assert!(!block.contains("broken"));
    }

    #[tokio::test]
    async fn per_call_config_overrides_default() {
        let mut registry = InjectorRegistry::new();
        registry.register(Arc::new(StaticInjector {
            name: "skills",
            default: json!({"subject": "math"}),
        }));

        let enabled = vec![ContextInjectorConfig::new("skills")
            .with_config(json!({"subject": "chemistry"}))];
        let block = registry
            .resolve_block(&enabled, &CallContext::default())
            .await
            .unwrap();
        assert_eq!(block, "## skills\nsubject=chemistry");
    }

    #[tokio::test]
    async fn resolve_one_merges_overrides() {
        let mut registry = InjectorRegistry::new();
        registry.register(Arc::new(StaticInjector {
            name: "skills",
            default: json!({"subject": "math"}),
        }));
        let section = registry
            .resolve_one("Skills", &CallContext::default(), &json!({"subject": "art"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(section.content, "subject=art");
        assert!(registry
            .resolve_one("unknown", &CallContext::default(), &Value::Null)
            .await
            .is_none());
        assert_eq!(registry.iter().count(), 1);
    }

    #[tokio::test]
    async fn disabled_injectors_are_not_invoked() {
        let mut registry = InjectorRegistry::new();
        registry.register(Arc::new(StaticInjector {
            name: "skills",
            default: json!({"subject": "math"}),
        }));
        let block = registry.resolve_block(&[], &CallContext::default()).await;
        assert!(block.is_none());
    }
}
