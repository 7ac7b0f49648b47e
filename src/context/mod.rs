//! Pluggable prompt-context sources: injectors and message renderers.

pub mod injector;
pub mod renderer;

pub use injector::{deep_merge, ContextInjector, ContextSection, InjectorRegistry};
pub use renderer::{require_context_role, ContextRenderer, RendererRegistry};
