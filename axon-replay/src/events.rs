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

//! Outbound subscription-protocol events and the sink a
//! `ReplayCoordinator` delivers them through.
//!
//! Transport (WebSocket framing, room membership) is `axon-hub`'s and
//! `axon-server`'s concern; this crate only needs somewhere to deliver
//! events to, which is why [`ReplaySink`] is a trait rather than a
//! concrete connection type.

use std::collections::HashMap;

use async_trait::async_trait;
use axon_core::{NodeId, TokenUsage, TraceId};
use chrono::{DateTime, Utc};

use crate::attribution::NodeCost;

#[derive(Debug, Clone)]
pub enum OutboundEvent {
    ReplayLlmDelta {
        request_id: String,
        delta: String,
    },
    ReplayLlmResponse {
        request_id: String,
        ok: bool,
        text: Option<String>,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
    ReplayResult {
        request_id: String,
        success: bool,
        executed_nodes: Vec<NodeId>,
        skipped_nodes: Vec<NodeId>,
        node_costs: HashMap<NodeId, NodeCost>,
        total_cost: f64,
        total_latency_ms: u64,
        replay_llm_cost: Option<f64>,
        llm_tokens: Option<TokenUsage>,
        start_trace_id: Option<TraceId>,
        start_node_id: Option<NodeId>,
        error: Option<String>,
    },
    /// Broadcast on `trace:<id>`.
    ReplayLlmResult {
        trace_id: TraceId,
        request_id: String,
        text: String,
        timestamp: DateTime<Utc>,
    },
}

/// Where a [`crate::coordinator::ReplayCoordinator`] delivers events.
/// `send` targets the requester's own connection; `broadcast` targets every
/// current member of a room.
#[async_trait]
pub trait ReplaySink: Send + Sync {
    async fn send(&self, event: OutboundEvent);
    async fn broadcast(&self, room: &str, event: OutboundEvent);
}

pub fn trace_room(trace_id: &TraceId) -> String {
    format!("trace:{}", trace_id.as_str())
}
