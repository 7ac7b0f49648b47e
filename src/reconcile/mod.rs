//! Incremental reconciliation of partial structured responses.
//!
//! The backend yields a sequence of increasingly complete snapshots of one
//! iteration's structured output. The reconciler normalizes each snapshot
//! into position-ordered raw entries, assigns deterministic ids, and merges
//! by id into the cumulative output log, so the same logical output keeps
//! one identity across successive, more-complete chunks.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::schema::OutputMode;
use crate::types::{ExecSlot, MessageOutput, Output, OutputKind, ToolCallOutput, ToolResultOutput};

/// One normalized raw entry for the current iteration.
struct RawEntry {
    /// Position within the iteration's raw list. Stable across chunks, so
    /// ids do not shift while earlier positions are still half-formed.
    position: usize,
    value: Value,
    /// Whether this position is an exec-order slot declared non-optional.
    /// Array and object modes make no such declaration; a half-streamed call
    /// there routinely passes through a null-args state.
    required_slot: bool,
}

/// Merges partial snapshots into a stable, identified output log.
///
/// The log is cumulative across iterations; entries from earlier iterations
/// are never touched by later snapshots. Tool results are appended by the
/// loop through [`StreamReconciler::push_tool_result`].
pub struct StreamReconciler {
    min_populated_fields: usize,
    outputs: Vec<Output>,
    index: HashMap<String, usize>,
    iteration: usize,
    /// Log length at the start of the current iteration; part of every id.
    prior_count: usize,
    mode: OutputMode,
    /// Active tool names in schema order, for object-mode normalization.
    tool_order: Vec<String>,
}

impl StreamReconciler {
    pub fn new(min_populated_fields: usize) -> Self {
        Self {
            min_populated_fields,
            outputs: Vec::new(),
            index: HashMap::new(),
            iteration: 0,
            prior_count: 0,
            mode: OutputMode::Array,
            tool_order: Vec::new(),
        }
    }

    /// Arm the reconciler for one iteration's snapshots.
    pub fn begin_iteration(&mut self, iteration: usize, mode: OutputMode, tool_order: Vec<String>) {
        self.iteration = iteration;
        self.prior_count = self.outputs.len();
        self.mode = mode;
        self.tool_order = tool_order;
    }

    /// Merge one partial snapshot; returns the updated, filtered log for
    /// delivery to the partial-output sink. Delivered state only ever grows.
    pub fn apply_snapshot(&mut self, snapshot: &Value) -> &[Output] {
        for entry in self.normalize(snapshot) {
            let Some(output) = self.classify(&entry) else {
                continue;
            };
            match self.index.get(output.id()) {
                Some(&at) => self.outputs[at] = output,
                None => {
                    self.index.insert(output.id().to_string(), self.outputs.len());
                    self.outputs.push(output);
                }
            }
        }
        &self.outputs
    }

    /// Append a tool result linked to `call_id`. The result id is derived
    /// from the call id, so identical runs produce identical logs.
    pub fn push_tool_result(&mut self, call_id: &str, result: Value) {
        let id = format!("{call_id}-result");
        if self.index.contains_key(&id) {
            return;
        }
        self.index.insert(id.clone(), self.outputs.len());
        self.outputs.push(Output::ToolResult(ToolResultOutput {
            id,
            call_id: call_id.to_string(),
            result,
        }));
    }

    /// The cumulative log, in first-appearance order.
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn into_outputs(self) -> Vec<Output> {
        self.outputs
    }

    /// Normalize the mode-specific snapshot shape into a position-ordered
    /// raw entry list for the current iteration.
    fn normalize(&self, snapshot: &Value) -> Vec<RawEntry> {
        match &self.mode {
            OutputMode::Array => snapshot
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .enumerate()
                        .map(|(position, value)| RawEntry {
                            position,
                            value: value.clone(),
                            required_slot: false,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            OutputMode::Object => {
                let Some(object) = snapshot.as_object() else {
                    return Vec::new();
                };
                let mut entries = Vec::new();
                // message first, then tool fields in schema order.
                if let Some(content) = object.get("message").and_then(Value::as_str) {
                    entries.push(RawEntry {
                        position: 0,
                        value: serde_json::json!({ "type": "message", "content": content }),
                        required_slot: false,
                    });
                }
                for (offset, tool) in self.tool_order.iter().enumerate() {
                    let Some(args) = object.get(tool) else {
                        continue;
                    };
                    entries.push(RawEntry {
                        position: 1 + offset,
                        value: serde_json::json!({
                            "type": "tool_call",
                            "tool": tool,
                            "args": args,
                        }),
                        // Every object-mode field is nullable by construction.
                        required_slot: false,
                    });
                }
                entries
            }
            OutputMode::ExecOrder(iteration) => {
                let Some(object) = snapshot.as_object() else {
                    return Vec::new();
                };
                iteration
                    .outputs
                    .iter()
                    .enumerate()
                    .filter_map(|(position, slot)| {
                        object.get(&position.to_string()).map(|value| RawEntry {
                            position,
                            value: value.clone(),
                            required_slot: matches!(
                                slot,
                                ExecSlot::ToolCall {
                                    optional: false,
                                    ..
                                }
                            ),
                        })
                    })
                    .collect()
            }
        }
    }

    /// Classify one raw entry, or suppress it.
    fn classify(&self, entry: &RawEntry) -> Option<Output> {
        let object = entry.value.as_object()?;
        // Debounce half-formed streaming JSON: too few populated fields or
        // no discriminator yet.
        let populated = object.values().filter(|v| !v.is_null()).count();
        if populated < self.min_populated_fields {
            return None;
        }
        let kind = object.get("type").and_then(Value::as_str)?;

        if kind == "message" {
            let content = object
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let id = self.output_id(entry.position, OutputKind::Message);
            return Some(Output::Message(MessageOutput { id, content }));
        }

        let args = object.get("args").cloned().unwrap_or(Value::Null);
        if args.is_null() {
            // Null args mean "tool not chosen". A required exec-order slot
            // was supposed to produce real args; everywhere else this is a
            // normal transient while args stream in, so stay quiet.
            if entry.required_slot {
                warn!(
                    iteration = self.iteration,
                    position = entry.position,
                    "null args on a required slot; dropping entry"
                );
            }
            return None;
        }
        let tool = object.get("tool").and_then(Value::as_str)?.to_string();
        let id = self.output_id(entry.position, OutputKind::ToolCall);
        Some(Output::ToolCall(ToolCallOutput { id, tool, args }))
    }

    /// Deterministic id from (iteration, cumulative prior output count,
    /// position within this iteration, type). The same logical output maps
    /// to the same id across successive chunks.
    fn output_id(&self, position: usize, kind: OutputKind) -> String {
        format!(
            "{}:{}:{}",
            self.iteration,
            self.prior_count + position,
            kind
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExecIteration;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn array_reconciler() -> StreamReconciler {
        let mut r = StreamReconciler::new(2);
        r.begin_iteration(0, OutputMode::Array, vec![]);
        r
    }

    #[test]
    fn half_formed_entries_are_suppressed() {
        let mut r = array_reconciler();
        let log = r.apply_snapshot(&json!([{ "type": "message" }]));
        assert!(log.is_empty());
        let log = r.apply_snapshot(&json!([{ "type": "message", "content": "Hi" }]));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn ids_are_stable_across_chunks() {
        let mut r = array_reconciler();
        r.apply_snapshot(&json!([{ "type": "message", "content": "He" }]));
        let first_id = r.outputs()[0].id().to_string();
        r.apply_snapshot(&json!([{ "type": "message", "content": "Hello!" }]));
        assert_eq!(r.outputs().len(), 1);
        assert_eq!(r.outputs()[0].id(), first_id);
        match &r.outputs()[0] {
            Output::Message(m) => assert_eq!(m.content, "Hello!"),
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn identical_sequences_yield_identical_logs() {
        let chunks = vec![
            json!([{ "type": "message", "content": "a" }]),
            json!([
                { "type": "message", "content": "ab" },
                { "type": "tool_call", "tool": "calculator", "args": { "a": 1 } },
            ]),
        ];
        let run = |chunks: &[Value]| {
            let mut r = array_reconciler();
            for chunk in chunks {
                r.apply_snapshot(chunk);
            }
            r.into_outputs()
        };
        assert_eq!(run(&chunks), run(&chunks));
    }

    #[test]
    fn null_args_means_tool_not_chosen() {
        let mut r = StreamReconciler::new(2);
        r.begin_iteration(
            0,
            OutputMode::ExecOrder(ExecIteration::new(vec![ExecSlot::optional_tool_call(
                "calculator",
            )])),
            vec!["calculator".into()],
        );
        let log = r.apply_snapshot(&json!({
            "0": { "type": "tool_call", "tool": "calculator", "args": null },
        }));
        assert!(log.is_empty());
    }

    #[test]
    fn half_streamed_call_resolves_once_args_arrive() {
        let mut r = array_reconciler();
        // "args" is the last field to stream in; until then the call is
        // dropped as half-formed, not surfaced as an error.
        let log = r.apply_snapshot(&json!([
            { "type": "tool_call", "tool": "calculator", "args": null },
        ]));
        assert!(log.is_empty());
        let log = r.apply_snapshot(&json!([
            { "type": "tool_call", "tool": "calculator", "args": { "a": 300, "b": 90 } },
        ]));
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].id(), "0:0:tool_call");
    }

    #[test]
    fn object_mode_synthesizes_entries() {
        let mut r = StreamReconciler::new(2);
        r.begin_iteration(0, OutputMode::Object, vec!["calculator".into(), "search".into()]);
        let log = r.apply_snapshot(&json!({
            "message": "Sure.",
            "calculator": { "a": 300, "b": 90 },
            "search": null,
        }));
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].kind(), OutputKind::Message);
        let call = log[1].as_tool_call().unwrap();
        assert_eq!(call.tool, "calculator");
        assert_eq!(call.args["a"], 300);
    }

    #[test]
    fn later_iterations_leave_earlier_outputs_untouched() {
        let mut r = array_reconciler();
        r.apply_snapshot(&json!([{ "type": "message", "content": "first" }]));
        r.push_tool_result("0:1:tool_call", json!(390));
        r.begin_iteration(1, OutputMode::Array, vec![]);
        r.apply_snapshot(&json!([{ "type": "message", "content": "second" }]));
        assert_eq!(r.outputs().len(), 3);
        match &r.outputs()[0] {
            Output::Message(m) => assert_eq!(m.content, "first"),
            other => panic!("unexpected output {other:?}"),
        }
        // Second-iteration ids account for everything already in the log.
        assert_eq!(r.outputs()[2].id(), "1:2:message");
    }

    #[test]
    fn tool_result_ids_derive_from_call_ids() {
        let mut r = array_reconciler();
        r.push_tool_result("0:0:tool_call", json!(390));
        r.push_tool_result("0:0:tool_call", json!(999));
        assert_eq!(r.outputs().len(), 1);
        match &r.outputs()[0] {
            Output::ToolResult(res) => {
                assert_eq!(res.id, "0:0:tool_call-result");
                assert_eq!(res.result, json!(390));
            }
            other => panic!("unexpected output {other:?}"),
        }
    }
}
