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

//! The trace/node/edge data model.
//!
//! A tagged-record-with-opaque-metadata-bag shape: known fields are typed,
//! everything else lives in an opaque `metadata` map rather than being
//! accessed dynamically at call sites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{NodeId, RawRef, RunId, TraceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Running,
    Complete,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: TraceId,
    pub project_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: TraceStatus,
    pub total_cost: f64,
    pub total_nodes: u64,
}

/// Coarse-and-fine node type variants that coexist in recorded traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Llm,
    Tool,
    Chain,
    Agent,
    LlmStart,
    LlmEnd,
    ToolStart,
    ToolEnd,
    ChainStart,
    ChainEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Complete,
    Error,
}

/// Token counts. `total` is reconciled to `input + output` whenever
/// `total > 0`.
///
/// Upstream writers use two synonym pairs for the same fields
/// (`input`/`output` and `prompt`/`completion`). Both deserialize into this
/// struct; `input`/`output` wins when both are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default, alias = "prompt")]
    pub input: u64,
    #[serde(default, alias = "completion")]
    pub output: u64,
    #[serde(default)]
    pub total: u64,
}

impl TokenUsage {
    pub fn new(input: u64, output: u64) -> Self {
        let mut tu = Self {
            input,
            output,
            total: 0,
        };
        tu.normalize();
        tu
    }

    /// Enforce `total == input + output` whenever `total > 0`.
    pub fn normalize(&mut self) {
        if self.total > 0 || self.input > 0 || self.output > 0 {
            self.total = self.input + self.output;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.input == 0 && self.output == 0 && self.total == 0
    }
}

/// The heterogeneous payload bag carried by a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<String>,
    #[serde(default)]
    pub tool_output: Option<String>,
    #[serde(default)]
    pub chain_name: Option<String>,
    /// Anything not enumerated above — never accessed dynamically outside
    /// this module.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl NodeData {
    /// Joined prompt text, used for token estimation.
    pub fn prompts_joined(&self) -> String {
        self.prompts.join("\n")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub node_id: NodeId,
    pub run_id: RunId,
    pub node_type: NodeType,
    pub status: NodeStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub latency_ms: Option<u64>,
    pub model: Option<String>,
    pub cost: f64,
    pub tokens: TokenUsage,
    pub data: NodeData,
    pub parent_run_id: Option<RunId>,
}

impl Node {
    /// A node whose type or `toolName` marks it as cost-free: tool-like
    /// nodes and `calculator` never accrue cost.
    pub fn is_cost_free_kind(&self) -> bool {
        let tool_like = matches!(
            self.node_type,
            NodeType::Tool | NodeType::ToolStart | NodeType::ToolEnd
        );
        let is_calculator = self
            .data
            .tool_name
            .as_deref()
            .map(|n| n.eq_ignore_ascii_case("calculator"))
            .unwrap_or(false);
        tool_like || is_calculator
    }

    /// Normalize required invariants after construction or deserialization:
    /// token reconciliation and the cost-free-kind rule.
    pub fn normalize(&mut self) {
        self.tokens.normalize();
        if self.is_cost_free_kind() {
            self.cost = 0.0;
            self.tokens = TokenUsage::default();
        }
        if self.cost < 0.0 {
            self.cost = 0.0;
        }
    }

    /// Invariant: exactly one of `(startTime, endTime)` or
    /// `(startTime, latencyMs)` is the recorded timing shape. Real ingested
    /// data is not always this clean, so this is advisory — callers that
    /// care (e.g. ingestion-side validation, out of scope here) can use it;
    /// `effective_latency_ms` above tolerates either shape unconditionally.
    pub fn validate_timing(&self) -> Result<(), crate::error::CoreError> {
        match (self.end_time, self.latency_ms) {
            (None, None) => Err(crate::error::CoreError::MissingTiming(
                self.node_id.to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// `node.latency || max(0, endTime - startTime)`.
    pub fn effective_latency_ms(&self) -> u64 {
        if let Some(l) = self.latency_ms {
            return l;
        }
        match self.end_time {
            Some(end) => {
                let delta = (end - self.start_time).num_milliseconds();
                delta.max(0) as u64
            }
            None => 0,
        }
    }
}

/// An edge as recorded by ingestion, with whichever identifier kind the
/// agent emitted on each side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: RawRef,
    pub to: RawRef,
}

/// The post-resolution, deduplicated edge form traversal operates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalEdge {
    pub from: NodeId,
    pub to: NodeId,
}

/// External tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    pub url: String,
    #[serde(default)]
    pub result_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_usage_normalizes_total() {
        let tu = TokenUsage::new(10, 20);
        assert_eq!(tu.total, 30);
    }

    #[test]
    fn token_usage_prompt_completion_aliases() {
        let json = r#"{"prompt": 5, "completion": 7}"#;
        let tu: TokenUsage = serde_json::from_str(json).unwrap();
        assert_eq!(tu.input, 5);
        assert_eq!(tu.output, 7);
    }

    fn sample_node(node_type: NodeType, tool_name: Option<&str>) -> Node {
        Node {
            node_id: NodeId::new("n1"),
            run_id: RunId::new("r1"),
            node_type,
            status: NodeStatus::Complete,
            start_time: Utc::now(),
            end_time: None,
            latency_ms: None,
            model: None,
            cost: 1.23,
            tokens: TokenUsage::new(10, 10),
            data: NodeData {
                tool_name: tool_name.map(|s| s.to_string()),
                ..Default::default()
            },
            parent_run_id: None,
        }
    }

    #[test]
    fn tool_nodes_are_cost_free_after_normalize() {
        let mut n = sample_node(NodeType::Tool, None);
        n.normalize();
        assert_eq!(n.cost, 0.0);
        assert!(n.tokens.is_zero());
    }

    #[test]
    fn calculator_tool_name_is_cost_free_even_on_llm_type() {
        let mut n = sample_node(NodeType::Llm, Some("Calculator"));
        n.normalize();
        assert_eq!(n.cost, 0.0);
    }

    #[test]
    fn negative_cost_clamped_to_zero() {
        let mut n = sample_node(NodeType::Llm, None);
        n.cost = -5.0;
        n.normalize();
        assert_eq!(n.cost, 0.0);
    }
}
