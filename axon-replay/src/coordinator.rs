// Copyright 2025 Axon Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `ReplayCoordinator`: the state machine that turns a
//! `replay_llm_request`/`replay_request` into the event pair the
//! subscription protocol promises.
//!
//! A fresh model call goes through [`crate::llm::LlmProvider`], its output
//! is grounded against the recorded transcript, and both the call's own
//! usage and the graph's attributed cost flow into one `replay_result`.
//! Outbound events reach connections only through the
//! [`crate::events::ReplaySink`] trait, so the coordinator never has to
//! know whether it's talking to one socket or a whole room.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axon_core::{pricing, NodeId, TokenUsage, TraceId};
use axon_graph::{earliest_node, GraphBuilder, SelectionMode, SubgraphSelector};
use axon_storage::Stores;
use axon_tools::TranscriptGrounder;
use chrono::Utc;
use tokio::time::timeout;

use crate::attribution::{CostAttributor, NodeOverride, TokenOverride};
use crate::error::ReplayError;
use crate::events::{trace_room, OutboundEvent, ReplaySink};
use crate::llm::LlmProvider;
use crate::request::{
    normalize_llm_request, validate_replay_request, NormalizedLlmRequest,
    ReplayLlmRequestPayload, ReplayRequestPayload,
};

/// Coarse, process-wide coordinator settings. `replay_mode` is read once
/// by the caller (server/CLI startup) from `REPLAY_MODE` and threaded in
/// here rather than read from the environment inside the selector itself.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub default_model: String,
    pub model_call_timeout: Duration,
    pub replay_mode: SelectionMode,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".to_string(),
            model_call_timeout: Duration::from_secs(120),
            replay_mode: SelectionMode::Staged,
        }
    }
}

pub struct ReplayCoordinator {
    stores: Arc<Stores>,
    grounder: Arc<TranscriptGrounder>,
    llm: Arc<dyn LlmProvider>,
    sink: Arc<dyn ReplaySink>,
    config: CoordinatorConfig,
}

impl ReplayCoordinator {
    pub fn new(
        stores: Arc<Stores>,
        grounder: Arc<TranscriptGrounder>,
        llm: Arc<dyn LlmProvider>,
        sink: Arc<dyn ReplaySink>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            stores,
            grounder,
            llm,
            sink,
            config,
        }
    }

    /// Issue a fresh model call, ground its output, and attribute cost
    /// over the executed set with the replay's own usage seeded as an
    /// override on the start node.
    pub async fn handle_replay_llm_request(&self, payload: ReplayLlmRequestPayload) {
        let normalized = normalize_llm_request(payload, &self.config.default_model);
        let request_id = normalized.request_id.clone();

        let started = Instant::now();
        match self.run_llm_request(&normalized).await {
            Ok(outcome) => {
                let llm_latency_ms = started.elapsed().as_millis() as u64;
                self.sink
                    .send(OutboundEvent::ReplayLlmResponse {
                        request_id: request_id.clone(),
                        ok: true,
                        text: Some(outcome.grounded_text.clone()),
                        error: None,
                        timestamp: Utc::now(),
                    })
                    .await;

                if let Some(trace_id) = &normalized.trace_id {
                    self.sink
                        .broadcast(
                            &trace_room(trace_id),
                            OutboundEvent::ReplayLlmResult {
                                trace_id: trace_id.clone(),
                                request_id: request_id.clone(),
                                text: outcome.grounded_text.clone(),
                                timestamp: Utc::now(),
                            },
                        )
                        .await;
                }

                self.finish_with_attribution(&normalized, Some(outcome), llm_latency_ms)
                    .await;
            }
            Err(err) => {
                tracing::warn!(request_id = %request_id, error = %err, "replay llm request failed");
                self.sink
                    .send(OutboundEvent::ReplayLlmResponse {
                        request_id: request_id.clone(),
                        ok: false,
                        text: None,
                        error: Some(err.to_string()),
                        timestamp: Utc::now(),
                    })
                    .await;
                self.emit_terminal_failure(&request_id, &normalized.trace_id, &normalized.start_node_id, err)
                    .await;
            }
        }
    }

    /// Attribution-only replay, no new LLM call — just re-run graph
    /// build + selection + attribution over the trace's recorded data.
    pub async fn handle_replay_request(&self, payload: ReplayRequestPayload) {
        let request_id = payload
            .request_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let (node_id, trace_id) = match validate_replay_request(&payload) {
            Ok(pair) => pair,
            Err(err) => {
                self.emit_terminal_failure(&request_id, &None, &None, err).await;
                return;
            }
        };

        match self
            .select_and_attribute(&trace_id, Some(node_id.clone()), &HashMap::new())
            .await
        {
            Ok((executed, skipped, summary)) => {
                self.sink
                    .send(OutboundEvent::ReplayResult {
                        request_id,
                        success: true,
                        executed_nodes: executed,
                        skipped_nodes: skipped,
                        node_costs: summary.node_costs,
                        total_cost: summary.total_cost,
                        total_latency_ms: summary.total_latency_ms,
                        replay_llm_cost: None,
                        llm_tokens: None,
                        start_trace_id: Some(trace_id),
                        start_node_id: Some(node_id),
                        error: None,
                    })
                    .await;
            }
            Err(err) => {
                self.emit_terminal_failure(&request_id, &Some(trace_id), &Some(node_id), err)
                    .await;
            }
        }
    }

    async fn run_llm_request(
        &self,
        normalized: &NormalizedLlmRequest,
    ) -> Result<LlmOutcome, ReplayError> {
        let call = self.call_model(normalized);
        match timeout(self.config.model_call_timeout, call).await {
            Ok(inner) => inner,
            Err(_) => Err(ReplayError::Model(format!(
                "model call timed out after {:?}",
                self.config.model_call_timeout
            ))),
        }
    }

    async fn call_model(&self, normalized: &NormalizedLlmRequest) -> Result<LlmOutcome, ReplayError> {
        let joined_input: String = normalized
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let estimated_input = ceil_div4(joined_input.len());

        let (final_text, input_tokens, output_tokens) = if normalized.stream {
            let mut rx = self
                .llm
                .stream_chat(
                    normalized.messages.clone(),
                    &normalized.model,
                    normalized.temperature,
                    normalized.max_tokens,
                )
                .await
                .map_err(|e| ReplayError::Model(e.to_string()))?;

            let mut accumulated = String::new();
            while let Some(delta) = rx.recv().await {
                if !delta.is_empty() {
                    self.sink
                        .send(OutboundEvent::ReplayLlmDelta {
                            request_id: normalized.request_id.clone(),
                            delta: delta.clone(),
                        })
                        .await;
                }
                accumulated.push_str(&delta);
            }
            let output_tokens = ceil_div4(accumulated.len());
            (accumulated, estimated_input, output_tokens)
        } else {
            let response = self
                .llm
                .chat(
                    normalized.messages.clone(),
                    &normalized.model,
                    normalized.temperature,
                    normalized.max_tokens,
                )
                .await
                .map_err(|e| ReplayError::Model(e.to_string()))?;

            let input_tokens = response.input_tokens.unwrap_or(estimated_input);
            let output_tokens = response
                .output_tokens
                .unwrap_or_else(|| ceil_div4(response.text.len()));
            (response.text, input_tokens, output_tokens)
        };

        let grounded_text = self.grounder.ground(&final_text).await;

        Ok(LlmOutcome {
            grounded_text,
            model: normalized.model.clone(),
            input_tokens,
            output_tokens,
        })
    }

    /// Compute `replayLlmCost`, seed the override bag, run graph-build +
    /// selection + attribution, and emit the terminal `replay_result`.
    async fn finish_with_attribution(
        &self,
        normalized: &NormalizedLlmRequest,
        outcome: Option<LlmOutcome>,
        llm_latency_ms: u64,
    ) {
        let request_id = normalized.request_id.clone();

        let Some(trace_id) = &normalized.trace_id else {
            // No trace to attribute against — emit a result carrying only
            // the replay's own LLM cost/tokens; without a trace there's
            // nothing to select, so executed/skipped are both empty and
            // the only latency to report is the model call itself.
            let (replay_llm_cost, llm_tokens, latency_ms) = match &outcome {
                Some(o) => {
                    let price = pricing::pricing(Some(&o.model));
                    (
                        Some(price.cost(o.input_tokens, o.output_tokens)),
                        Some(TokenUsage::new(o.input_tokens, o.output_tokens)),
                        llm_latency_ms,
                    )
                }
                None => (None, None, llm_latency_ms),
            };
            self.sink
                .send(OutboundEvent::ReplayResult {
                    request_id,
                    success: true,
                    executed_nodes: Vec::new(),
                    skipped_nodes: Vec::new(),
                    node_costs: HashMap::new(),
                    total_cost: replay_llm_cost.unwrap_or(0.0),
                    total_latency_ms: latency_ms,
                    replay_llm_cost,
                    llm_tokens,
                    start_trace_id: None,
                    start_node_id: normalized.start_node_id.clone(),
                    error: None,
                })
                .await;
            return;
        };

        let mut overrides = HashMap::new();
        let mut replay_llm_cost = None;
        let mut llm_tokens = None;

        if let (Some(outcome), Some(start_node_id)) = (&outcome, &normalized.start_node_id) {
            let price = pricing::pricing(Some(&outcome.model));
            let cost = price.cost(outcome.input_tokens, outcome.output_tokens);
            replay_llm_cost = Some(cost);
            llm_tokens = Some(TokenUsage::new(outcome.input_tokens, outcome.output_tokens));
            overrides.insert(
                start_node_id.clone(),
                NodeOverride {
                    cost: Some(cost),
                    tokens: Some(TokenOverride {
                        input: Some(outcome.input_tokens),
                        output: Some(outcome.output_tokens),
                        total: Some(outcome.input_tokens + outcome.output_tokens),
                    }),
                    ..Default::default()
                },
            );
        }

        match self
            .select_and_attribute(trace_id, normalized.start_node_id.clone(), &overrides)
            .await
        {
            Ok((executed, skipped, summary)) => {
                self.sink
                    .send(OutboundEvent::ReplayResult {
                        request_id,
                        success: true,
                        executed_nodes: executed,
                        skipped_nodes: skipped,
                        node_costs: summary.node_costs,
                        total_cost: summary.total_cost,
                        total_latency_ms: summary.total_latency_ms + llm_latency_ms,
                        replay_llm_cost,
                        llm_tokens,
                        start_trace_id: Some(trace_id.clone()),
                        start_node_id: normalized.start_node_id.clone(),
                        error: None,
                    })
                    .await;
            }
            Err(err) => {
                self.emit_terminal_failure(
                    &normalized.request_id,
                    &Some(trace_id.clone()),
                    &normalized.start_node_id,
                    err,
                )
                .await;
            }
        }
    }

    /// Load a trace's nodes/edges, build the canonical graph, select the
    /// executed/skipped split, and attribute cost, all chained together.
    async fn select_and_attribute(
        &self,
        trace_id: &TraceId,
        start_node_id: Option<NodeId>,
        overrides: &HashMap<NodeId, NodeOverride>,
    ) -> Result<
        (
            Vec<NodeId>,
            Vec<NodeId>,
            crate::attribution::AttributionSummary,
        ),
        ReplayError,
    > {
        if self
            .stores
            .traces
            .get_trace(trace_id)
            .await
            .map_err(|e| ReplayError::Internal(e.to_string()))?
            .is_none()
        {
            return Err(ReplayError::NotFound(format!("trace {trace_id} not found")));
        }

        let nodes = self
            .stores
            .nodes
            .list_nodes(trace_id)
            .await
            .map_err(|e| ReplayError::Internal(e.to_string()))?;
        let edges = self
            .stores
            .edges
            .list_edges(trace_id)
            .await
            .map_err(|e| ReplayError::Internal(e.to_string()))?;

        let graph = GraphBuilder::build(nodes, &edges);

        let start = match start_node_id {
            Some(id) => {
                if graph.node(&id).is_none() {
                    return Err(ReplayError::NotFound(format!("node {id} not found in trace")));
                }
                id
            }
            None => earliest_node(&graph)
                .ok_or_else(|| ReplayError::NotFound("trace has no nodes".to_string()))?,
        };

        let selection = SubgraphSelector::select(&graph, &start, self.config.replay_mode);
        let summary = CostAttributor::attribute(&graph, &selection.executed, overrides);

        Ok((selection.executed, selection.skipped, summary))
    }

    async fn emit_terminal_failure(
        &self,
        request_id: &str,
        trace_id: &Option<TraceId>,
        start_node_id: &Option<NodeId>,
        err: ReplayError,
    ) {
        tracing::warn!(request_id = %request_id, kind = err.kind(), error = %err, "replay failed");
        self.sink
            .send(OutboundEvent::ReplayResult {
                request_id: request_id.to_string(),
                success: false,
                executed_nodes: Vec::new(),
                skipped_nodes: Vec::new(),
                node_costs: HashMap::new(),
                total_cost: 0.0,
                total_latency_ms: 0,
                replay_llm_cost: None,
                llm_tokens: None,
                start_trace_id: trace_id.clone(),
                start_node_id: start_node_id.clone(),
                error: Some(err.to_string()),
            })
            .await;
    }
}

struct LlmOutcome {
    grounded_text: String,
    model: String,
    input_tokens: u64,
    output_tokens: u64,
}

fn ceil_div4(len: usize) -> u64 {
    ((len as u64) + 3) / 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ReplaySink;
    use crate::llm::{ChatMessage, EchoProvider};
    use axon_core::{Edge, Node, NodeData, NodeStatus, NodeType, RawRef, RunId, Trace, TraceStatus};
    use axon_tools::{ToolProviders, ToolRegistry};
    use chrono::{TimeZone, Utc as ChronoUtc};
    use tokio::sync::Mutex;

    struct RecordingSink {
        events: Mutex<Vec<OutboundEvent>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ReplaySink for RecordingSink {
        async fn send(&self, event: OutboundEvent) {
            self.events.lock().await.push(event);
        }

        async fn broadcast(&self, _room: &str, event: OutboundEvent) {
            self.events.lock().await.push(event);
        }
    }

    fn node(id: &str, run: &str, parent_run: Option<&str>, t: i64, input: u64, output: u64) -> Node {
        Node {
            node_id: NodeId::new(id),
            run_id: RunId::new(run),
            node_type: NodeType::Llm,
            status: NodeStatus::Complete,
            start_time: ChronoUtc.timestamp_opt(t, 0).unwrap(),
            end_time: None,
            latency_ms: Some(5),
            model: Some("gpt-4o-mini".to_string()),
            cost: 0.0,
            tokens: TokenUsage::new(input, output),
            data: NodeData::default(),
            parent_run_id: parent_run.map(RunId::new),
        }
    }

    async fn seeded_stores() -> Arc<Stores> {
        let stores = Arc::new(Stores::in_memory());
        let trace_id = TraceId::new("t1");
        stores
            .traces
            .put_trace(Trace {
                trace_id: trace_id.clone(),
                project_name: "demo".to_string(),
                start_time: ChronoUtc::now(),
                end_time: None,
                status: TraceStatus::Running,
                total_cost: 0.0,
                total_nodes: 2,
            })
            .await
            .unwrap();
        stores
            .nodes
            .put_node(trace_id.clone(), node("n1", "r1", None, 0, 10, 10))
            .await
            .unwrap();
        stores
            .nodes
            .put_node(trace_id.clone(), node("n2", "r2", Some("r1"), 1, 10, 10))
            .await
            .unwrap();
        stores
            .edges
            .put_edge(
                trace_id,
                Edge {
                    from: RawRef::new("n1"),
                    to: RawRef::new("n2"),
                },
            )
            .await
            .unwrap();
        stores
    }

    fn coordinator(stores: Arc<Stores>, sink: Arc<RecordingSink>) -> ReplayCoordinator {
        let registry = Arc::new(ToolRegistry::new(ToolProviders::empty()));
        let grounder = Arc::new(TranscriptGrounder::new(registry));
        ReplayCoordinator::new(
            stores,
            grounder,
            Arc::new(EchoProvider),
            sink,
            CoordinatorConfig::default(),
        )
    }

    #[tokio::test]
    async fn replay_request_emits_successful_result() {
        let stores = seeded_stores().await;
        let sink = Arc::new(RecordingSink::new());
        let coordinator = coordinator(stores, sink.clone());

        coordinator
            .handle_replay_request(ReplayRequestPayload {
                request_id: Some("req-1".to_string()),
                node_id: Some("n2".to_string()),
                trace_id: Some("t1".to_string()),
            })
            .await;

        let events = sink.events.lock().await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            OutboundEvent::ReplayResult { success, executed_nodes, .. } => {
                assert!(success);
                assert_eq!(executed_nodes, &vec![NodeId::new("n2")]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn replay_request_unknown_trace_is_not_found() {
        let stores = Arc::new(Stores::in_memory());
        let sink = Arc::new(RecordingSink::new());
        let coordinator = coordinator(stores, sink.clone());

        coordinator
            .handle_replay_request(ReplayRequestPayload {
                request_id: Some("req-2".to_string()),
                node_id: Some("n2".to_string()),
                trace_id: Some("ghost".to_string()),
            })
            .await;

        let events = sink.events.lock().await;
        match &events[0] {
            OutboundEvent::ReplayResult { success, error, .. } => {
                assert!(!success);
                assert!(error.is_some());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn replay_llm_request_emits_response_then_result() {
        let stores = seeded_stores().await;
        let sink = Arc::new(RecordingSink::new());
        let coordinator = coordinator(stores, sink.clone());

        coordinator
            .handle_replay_llm_request(ReplayLlmRequestPayload {
                request_id: Some("req-3".to_string()),
                trace_id: Some("t1".to_string()),
                start_node_id: Some("n2".to_string()),
                messages: Some(vec![ChatMessage {
                    role: "user".to_string(),
                    content: "hello there".to_string(),
                }]),
                ..Default::default()
            })
            .await;

        let events = sink.events.lock().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], OutboundEvent::ReplayLlmResponse { ok: true, .. }));
        match &events[1] {
            OutboundEvent::ReplayResult {
                success,
                replay_llm_cost,
                ..
            } => {
                assert!(success);
                assert!(replay_llm_cost.is_some());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn replay_llm_request_streams_deltas_before_response() {
        let stores = seeded_stores().await;
        let sink = Arc::new(RecordingSink::new());
        let coordinator = coordinator(stores, sink.clone());

        coordinator
            .handle_replay_llm_request(ReplayLlmRequestPayload {
                request_id: Some("req-4".to_string()),
                trace_id: Some("t1".to_string()),
                start_node_id: Some("n1".to_string()),
                messages: Some(vec![ChatMessage {
                    role: "user".to_string(),
                    content: "stream this please".to_string(),
                }]),
                stream: Some(true),
                ..Default::default()
            })
            .await;

        let events = sink.events.lock().await;
        assert!(events.len() >= 3);
        assert!(matches!(events[0], OutboundEvent::ReplayLlmDelta { .. }));
        let response_idx = events
            .iter()
            .position(|e| matches!(e, OutboundEvent::ReplayLlmResponse { .. }))
            .unwrap();
        let result_idx = events
            .iter()
            .position(|e| matches!(e, OutboundEvent::ReplayResult { .. }))
            .unwrap();
        assert!(response_idx < result_idx);
    }
}
