//! Shared fixtures: a scripted in-process generation backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use ouro::backend::{GenerateRequest, GenerationBackend, PartialObjectStream};
use ouro::error::{AgentError, Result};

/// Backend that replays pre-scripted partial-snapshot sequences, one script
/// per `generate` call, and records every request it receives.
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Vec<Value>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<Vec<Value>>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Every request seen so far, in call order.
    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<PartialObjectStream> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::backend("scripted backend exhausted"))?;
        Ok(futures::stream::iter(script.into_iter().map(Ok)).boxed())
    }
}
