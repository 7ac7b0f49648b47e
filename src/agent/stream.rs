//! The agent loop: assemble prompt, generate, reconcile, invoke tools,
//! decide to continue or stop.

use std::sync::Arc;

use futures::future::join_all;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::backend::{GenerateRequest, GenerationBackend};
use crate::context::{InjectorRegistry, RendererRegistry};
use crate::error::{AgentError, Result};
use crate::reconcile::StreamReconciler;
use crate::schema::{build_output_schema, OutputMode};
use crate::tools::{CallContext, CallLedger, CallStatus, Tool, ToolArgs, ToolRegistry};
use crate::types::{
    outputs_to_messages, AgentStreamRequest, AgentStreamResult, Output, ToolCallOutput,
};

use super::prompt::PromptBase;

/// Orchestrates multi-turn interaction between the generation backend, the
/// context registries, and the tool registry. The loop itself is the only
/// component with cross-iteration state; one `stream()` call runs as a
/// single sequential asynchronous flow over a local output log.
pub struct AgentLoop {
    pub(crate) backend: Arc<dyn GenerationBackend>,
    pub(crate) tools: Arc<ToolRegistry>,
    pub(crate) injectors: Arc<InjectorRegistry>,
    pub(crate) renderers: Arc<RendererRegistry>,
}

impl AgentLoop {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            tools: Arc::new(ToolRegistry::new()),
            injectors: Arc::new(InjectorRegistry::new()),
            renderers: Arc::new(RendererRegistry::new()),
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_injectors(mut self, injectors: Arc<InjectorRegistry>) -> Self {
        self.injectors = injectors;
        self
    }

    pub fn with_renderers(mut self, renderers: Arc<RendererRegistry>) -> Self {
        self.renderers = renderers;
        self
    }

    /// Run the loop to completion, streaming the reconciled output log to
    /// the request's partial-output sink along the way.
    pub async fn stream(&self, request: AgentStreamRequest) -> Result<AgentStreamResult> {
        if matches!(&request.exec_order, Some(order) if order.is_empty()) {
            return Err(AgentError::Configuration(
                "exec order declares no iterations".into(),
            ));
        }

        debug!(call_id = %request.call_id, tools = request.active_tools.len(), "agent stream start");

        let active_tools = self.tools.active_set(&request.active_tools);
        let tool_order: Vec<String> = active_tools
            .iter()
            .map(|tool| tool.name().to_string())
            .collect();
        let ctx = CallContext {
            metadata: request.metadata.clone(),
            tool_call_id: None,
            tool_name: None,
        };

        // Injector, explanation, and CMR resolution happen once per call;
        // only the output-log tail changes between iterations.
        let base = PromptBase::assemble(
            request.system.as_deref(),
            &self.injectors,
            &self.renderers,
            &request.active_context_injectors,
            &request.active_renderers,
            &ctx,
            &request.messages,
            &active_tools,
        )
        .await;

        let mut reconciler = StreamReconciler::new(request.settings.min_populated_fields);
        let mut ledger = CallLedger::new();
        let mut iteration = 0usize;

        let capped = loop {
            // Iterating: request this iteration's schema and reconcile the
            // partial snapshots into the log.
            let mode = OutputMode::for_iteration(
                request.exec_order.as_deref(),
                iteration,
                request.tool_mode,
            )?;
            let schema = build_output_schema(&mode, &active_tools)?;
            let messages = base.with_outputs(reconciler.outputs());
            let mut snapshots = self
                .backend
                .generate(GenerateRequest {
                    schema,
                    schema_name: "agent_outputs".into(),
                    messages,
                    provider_args: request.settings.provider_args.clone(),
                })
                .await?;

            reconciler.begin_iteration(iteration, mode, tool_order.clone());
            while let Some(snapshot) = snapshots.next().await {
                let snapshot = snapshot?;
                let log = reconciler.apply_snapshot(&snapshot);
                if let Some(sink) = &request.on_partial_outputs {
                    sink(log);
                }
            }

            // InvokingTools: fan out every not-yet-invoked call concurrently.
            let appended = self
                .invoke_pending(&request, &active_tools, &mut reconciler, &mut ledger)
                .await;
            if appended {
                if let Some(sink) = &request.on_partial_outputs {
                    sink(reconciler.outputs());
                }
            }

            // Deciding: which calls still owe us another pass.
            let wants_iteration: Vec<String> = reconciler
                .outputs()
                .iter()
                .filter_map(Output::as_tool_call)
                .filter(|call| !ledger.is_iteration_granted(&call.id))
                .filter(|call| {
                    find_tool(&active_tools, &call.tool)
                        .map(|tool| tool.requires_iteration())
                        .unwrap_or(false)
                })
                .map(|call| call.id.clone())
                .collect();
            let stop = match &request.exec_order {
                Some(order) => iteration + 1 >= order.len(),
                None => wants_iteration.is_empty(),
            };
            for id in &wants_iteration {
                ledger.mark_iteration_granted(id);
            }
            iteration += 1;

            debug!(
                call_id = %request.call_id,
                iteration,
                outputs = reconciler.outputs().len(),
                stop,
                "agent iteration complete"
            );

            if stop {
                break false;
            }
            if iteration >= request.settings.max_iterations {
                break true;
            }
        };

        if capped {
            warn!(
                call_id = %request.call_id,
                cap = request.settings.max_iterations,
                "iteration cap reached; returning accumulated outputs"
            );
        }

        let outputs = reconciler.into_outputs();
        let messages = outputs_to_messages(&outputs);
        Ok(AgentStreamResult {
            outputs,
            messages,
            iterations: iteration,
        })
    }

    /// Invoke every pending tool call concurrently. Calls within one
    /// iteration are independent; a failing call loses only its own result.
    /// Returns whether any result was appended to the log.
    async fn invoke_pending(
        &self,
        request: &AgentStreamRequest,
        active_tools: &[Arc<dyn Tool>],
        reconciler: &mut StreamReconciler,
        ledger: &mut CallLedger,
    ) -> bool {
        let pending: Vec<ToolCallOutput> = reconciler
            .outputs()
            .iter()
            .filter_map(Output::as_tool_call)
            .filter(|call| ledger.status(&call.id) == CallStatus::Pending)
            .cloned()
            .collect();

        let mut invocations = Vec::new();
        for call in pending {
            let Some(tool) = find_tool(active_tools, &call.tool) else {
                debug!(tool = %call.tool, call_id = %call.id, "unknown tool; skipping call");
                ledger.mark_invoked(&call.id);
                continue;
            };
            if !ledger.mark_invoked(&call.id) {
                continue;
            }
            let tool = Arc::clone(tool);
            let ctx = CallContext {
                metadata: request.metadata.clone(),
                tool_call_id: Some(call.id.clone()),
                tool_name: Some(tool.name().to_string()),
            };
            invocations.push(async move {
                let args = ToolArgs::new(call.args.clone());
                let outcome = tool.invoke(&args, &ctx).await;
                (call, outcome)
            });
        }

        let mut appended = false;
        for (call, outcome) in join_all(invocations).await {
            match outcome {
                Ok(Some(value)) => {
                    reconciler.push_tool_result(&call.id, value);
                    appended = true;
                }
                Ok(None) => {
                    debug!(tool = %call.tool, call_id = %call.id, "tool declares no invoke; skipping");
                }
                Err(err) => {
                    warn!(
                        tool = %call.tool,
                        call_id = %call.id,
                        error = %err,
                        "tool invocation failed; its result is dropped"
                    );
                }
            }
        }
        appended
    }
}

fn find_tool<'a>(tools: &'a [Arc<dyn Tool>], name: &str) -> Option<&'a Arc<dyn Tool>> {
    tools
        .iter()
        .find(|tool| tool.name().eq_ignore_ascii_case(name))
}
