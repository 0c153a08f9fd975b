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

//! Wire DTOs for the subscription protocol: exact payload keys, built
//! from the domain types `axon-replay`/`axon-graph`/`axon-core` hand
//! back. Kept separate from those crates' own types so the wire shape can
//! evolve independently of the domain representation.

use std::collections::HashMap;

use axon_core::{Edge, Node, NodeId, TokenUsage, Trace};
use axon_replay::{NodeCost, OutboundEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCostDto {
    pub cost: f64,
    pub tokens: TokenUsage,
    pub latency_ms: u64,
}

impl From<&NodeCost> for NodeCostDto {
    fn from(nc: &NodeCost) -> Self {
        Self {
            cost: nc.cost,
            tokens: nc.tokens,
            latency_ms: nc.latency_ms,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStats {
    pub total_nodes: usize,
    pub total_cost: f64,
    pub total_latency: u64,
    pub llm_count: usize,
    pub tool_count: usize,
    pub chain_count: usize,
    pub error_count: usize,
    pub anomaly_count: usize,
}

impl TraceStats {
    /// Computed directly from the node list — anomaly detection itself is
    /// out of scope, so `anomaly_count` is always zero here.
    pub fn from_nodes(nodes: &[Node]) -> Self {
        use axon_core::{NodeStatus, NodeType};

        let mut stats = TraceStats {
            total_nodes: nodes.len(),
            total_cost: 0.0,
            total_latency: 0,
            llm_count: 0,
            tool_count: 0,
            chain_count: 0,
            error_count: 0,
            anomaly_count: 0,
        };

        for node in nodes {
            stats.total_cost += node.cost;
            stats.total_latency += node.effective_latency_ms();
            match node.node_type {
                NodeType::Llm | NodeType::LlmStart | NodeType::LlmEnd => stats.llm_count += 1,
                NodeType::Tool | NodeType::ToolStart | NodeType::ToolEnd => stats.tool_count += 1,
                NodeType::Chain | NodeType::ChainStart | NodeType::ChainEnd | NodeType::Agent => {
                    stats.chain_count += 1
                }
            }
            if node.status == NodeStatus::Error {
                stats.error_count += 1;
            }
        }
        stats.total_cost = axon_core::pricing::round6(stats.total_cost);
        stats
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceDataPayload {
    pub trace: Option<Trace>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub anomalies: Vec<serde_json::Value>,
    pub stats: TraceStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplayLlmDeltaPayload<'a> {
    request_id: &'a str,
    delta: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplayLlmResponsePayload<'a> {
    request_id: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplayResultPayload<'a> {
    request_id: &'a str,
    success: bool,
    executed_nodes: &'a [NodeId],
    skipped_nodes: &'a [NodeId],
    node_costs: HashMap<&'a NodeId, NodeCostDto>,
    total_cost: f64,
    total_latency: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    replay_llm_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    llm_tokens: Option<TokenUsage>,
    side_effects: Vec<serde_json::Value>,
    new_trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_trace_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_node_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplayLlmResultPayload<'a> {
    trace_id: &'a str,
    request_id: &'a str,
    text: &'a str,
    timestamp: DateTime<Utc>,
}

/// Map an [`OutboundEvent`] to the `(event name, JSON payload)` pair the
/// subscription protocol specifies.
pub fn to_envelope(event: &OutboundEvent) -> axon_hub::Envelope {
    match event {
        OutboundEvent::ReplayLlmDelta { request_id, delta } => axon_hub::Envelope::new(
            "replay_llm_delta",
            ReplayLlmDeltaPayload {
                request_id,
                delta,
            },
        ),
        OutboundEvent::ReplayLlmResponse {
            request_id,
            ok,
            text,
            error,
            timestamp,
        } => axon_hub::Envelope::new(
            "replay_llm_response",
            ReplayLlmResponsePayload {
                request_id,
                ok: *ok,
                text: text.as_deref(),
                error: error.as_deref(),
                timestamp: *timestamp,
            },
        ),
        OutboundEvent::ReplayResult {
            request_id,
            success,
            executed_nodes,
            skipped_nodes,
            node_costs,
            total_cost,
            total_latency_ms,
            replay_llm_cost,
            llm_tokens,
            start_trace_id,
            start_node_id,
            error,
        } => {
            let node_costs_dto: HashMap<&NodeId, NodeCostDto> = node_costs
                .iter()
                .map(|(id, nc)| (id, NodeCostDto::from(nc)))
                .collect();
            axon_hub::Envelope::new(
                "replay_result",
                ReplayResultPayload {
                    request_id,
                    success: *success,
                    executed_nodes,
                    skipped_nodes,
                    node_costs: node_costs_dto,
                    total_cost: *total_cost,
                    total_latency: *total_latency_ms,
                    replay_llm_cost: *replay_llm_cost,
                    llm_tokens: *llm_tokens,
                    side_effects: Vec::new(),
                    new_trace_id: None,
                    start_trace_id: start_trace_id.as_ref().map(|t| t.as_str()),
                    start_node_id: start_node_id.as_ref().map(|n| n.as_str()),
                    error: error.as_deref(),
                },
            )
        }
        OutboundEvent::ReplayLlmResult {
            trace_id,
            request_id,
            text,
            timestamp,
        } => axon_hub::Envelope::new(
            "replay_llm_result",
            ReplayLlmResultPayload {
                trace_id: trace_id.as_str(),
                request_id,
                text,
                timestamp: *timestamp,
            },
        ),
    }
}
