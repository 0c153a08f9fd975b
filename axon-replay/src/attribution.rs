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

//! `CostAttributor`.

use std::collections::HashMap;
use std::sync::OnceLock;

use axon_core::{pricing, Node, NodeId, NodeType, TokenUsage};
use axon_graph::CanonicalGraph;
use regex::Regex;

/// Per-node override bag. Fields win field-wise over
/// the computed values when present; `model`/`prompt` feed the computation
/// itself rather than replacing its output directly.
#[derive(Debug, Clone, Default)]
pub struct NodeOverride {
    pub cost: Option<f64>,
    pub tokens: Option<TokenOverride>,
    pub prompt: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TokenOverride {
    pub input: Option<u64>,
    pub output: Option<u64>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct NodeCost {
    pub cost: f64,
    pub tokens: TokenUsage,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AttributionSummary {
    pub node_costs: HashMap<NodeId, NodeCost>,
    pub total_cost: f64,
    pub total_latency_ms: u64,
}

fn llm_model_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)gpt|claude|mistral|llama|gemini").unwrap())
}

/// A node is "LLM-accruing" iff `type == llm` OR its `model` matches the
/// recognized-family regex; `calculator` never accrues regardless of type.
pub fn is_llm_accruing(node: &Node) -> bool {
    let is_calculator = node
        .data
        .tool_name
        .as_deref()
        .map(|n| n.eq_ignore_ascii_case("calculator"))
        .unwrap_or(false);
    if is_calculator {
        return false;
    }
    node.node_type == NodeType::Llm
        || node
            .model
            .as_deref()
            .map(|m| llm_model_regex().is_match(m))
            .unwrap_or(false)
}

fn ceil_div4(len: usize) -> u64 {
    ((len as u64) + 3) / 4
}

/// Estimate `(input, output)` tokens when the node carries none:
/// `⌈len(prompt)/4⌉` and `⌈len(response)/4⌉`, with `toolInput`/
/// `toolOutput` lengths folded into the corresponding side when present.
/// `prompt_override` substitutes for the node's own joined prompts when an
/// override supplies one.
fn estimate_tokens(node: &Node, prompt_override: Option<&str>) -> (u64, u64) {
    let prompt_text = prompt_override
        .map(|s| s.to_string())
        .unwrap_or_else(|| node.data.prompts_joined());
    let mut input_len = prompt_text.len();
    if let Some(tool_input) = &node.data.tool_input {
        input_len += tool_input.len();
    }

    let mut output_len = node.data.response.as_deref().unwrap_or("").len();
    if let Some(tool_output) = &node.data.tool_output {
        output_len += tool_output.len();
    }

    (ceil_div4(input_len), ceil_div4(output_len))
}

pub struct CostAttributor;

impl CostAttributor {
    /// Attribute cost and tokens for every node in `executed`.
    /// Nodes outside `executed` are not represented in the summary.
    pub fn attribute(
        graph: &CanonicalGraph,
        executed: &[NodeId],
        overrides: &HashMap<NodeId, NodeOverride>,
    ) -> AttributionSummary {
        let mut node_costs = HashMap::with_capacity(executed.len());
        let mut total_cost = 0.0;
        let mut total_latency_ms: u64 = 0;

        for id in executed {
            let Some(node) = graph.node(id) else {
                continue;
            };
            let latency_ms = node.effective_latency_ms();
            total_latency_ms += latency_ms;

            let (cost, tokens) = if is_llm_accruing(node) {
                Self::attribute_llm(node, overrides.get(id))
            } else {
                (0.0, TokenUsage::default())
            };

            total_cost = pricing::round6(total_cost + cost);
            node_costs.insert(
                id.clone(),
                NodeCost {
                    cost,
                    tokens,
                    latency_ms,
                },
            );
        }

        AttributionSummary {
            node_costs,
            total_cost,
            total_latency_ms,
        }
    }

    fn attribute_llm(node: &Node, node_override: Option<&NodeOverride>) -> (f64, TokenUsage) {
        let model = node_override
            .and_then(|o| o.model.clone())
            .or_else(|| node.model.clone());

        let (base_input, base_output) = if node.tokens.input + node.tokens.output > 0 {
            (node.tokens.input, node.tokens.output)
        } else {
            estimate_tokens(node, node_override.and_then(|o| o.prompt.as_deref()))
        };

        let price = pricing::pricing(model.as_deref());
        let computed_cost = price.cost(base_input, base_output);

        let token_override = node_override.and_then(|o| o.tokens.as_ref());
        let final_input = token_override.and_then(|t| t.input).unwrap_or(base_input);
        let final_output = token_override.and_then(|t| t.output).unwrap_or(base_output);
        let final_total = token_override
            .and_then(|t| t.total)
            .unwrap_or(final_input + final_output);

        let cost = node_override.and_then(|o| o.cost).unwrap_or(computed_cost);

        (
            cost,
            TokenUsage {
                input: final_input,
                output: final_output,
                total: final_total,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_core::{Edge, NodeData, NodeStatus, RunId};
    use axon_graph::GraphBuilder;
    use chrono::{TimeZone, Utc};

    fn llm_node(id: &str, model: &str, input: u64, output: u64, t: i64) -> Node {
        Node {
            node_id: NodeId::new(id),
            run_id: RunId::new(format!("r-{id}")),
            node_type: NodeType::Llm,
            status: NodeStatus::Complete,
            start_time: Utc.timestamp_opt(t, 0).unwrap(),
            end_time: None,
            latency_ms: Some(5),
            model: Some(model.to_string()),
            cost: 0.0,
            tokens: TokenUsage::new(input, output),
            data: NodeData::default(),
            parent_run_id: if id == "n1" {
                None
            } else {
                Some(RunId::new(format!(
                    "r-n{}",
                    id.trim_start_matches('n').parse::<u32>().unwrap() - 1
                )))
            },
        }
    }

    #[test]
    fn linear_trace_cost_accumulates_per_node() {
        let nodes = vec![
            llm_node("n1", "gpt-4o-mini", 10, 20, 0),
            llm_node("n2", "gpt-4o-mini", 30, 40, 1),
            llm_node("n3", "gpt-4o-mini", 50, 60, 2),
        ];
        let graph = GraphBuilder::build(nodes, &[]);
        let executed = vec![NodeId::new("n2"), NodeId::new("n3")];
        let summary = CostAttributor::attribute(&graph, &executed, &HashMap::new());

        assert_eq!(summary.node_costs[&NodeId::new("n2")].cost, 0.00075);
        assert_eq!(summary.node_costs[&NodeId::new("n3")].cost, 0.00115);
        assert_eq!(summary.total_cost, 0.00190);
    }

    #[test]
    fn calculator_tool_name_never_accrues_even_as_llm_type() {
        let mut node = llm_node("n1", "gpt-4o", 100, 100, 0);
        node.data.tool_name = Some("Calculator".to_string());
        let graph = GraphBuilder::build(vec![node], &[]);
        let executed = vec![NodeId::new("n1")];
        let summary = CostAttributor::attribute(&graph, &executed, &HashMap::new());
        assert_eq!(summary.node_costs[&NodeId::new("n1")].cost, 0.0);
        assert!(summary.node_costs[&NodeId::new("n1")].tokens.is_zero());
    }

    #[test]
    fn non_llm_node_is_always_free_even_with_override() {
        let mut node = llm_node("n1", "gpt-4o", 0, 0, 0);
        node.node_type = NodeType::Tool;
        let graph = GraphBuilder::build(vec![node], &[]);
        let executed = vec![NodeId::new("n1")];
        let mut overrides = HashMap::new();
        overrides.insert(
            NodeId::new("n1"),
            NodeOverride {
                cost: Some(99.0),
                ..Default::default()
            },
        );
        let summary = CostAttributor::attribute(&graph, &executed, &overrides);
        assert_eq!(summary.node_costs[&NodeId::new("n1")].cost, 0.0);
    }

    #[test]
    fn override_wins_field_by_field() {
        let node = llm_node("n1", "gpt-4o", 100, 100, 0);
        let graph = GraphBuilder::build(vec![node], &[]);
        let executed = vec![NodeId::new("n1")];
        let mut overrides = HashMap::new();
        overrides.insert(
            NodeId::new("n1"),
            NodeOverride {
                cost: Some(1.5),
                tokens: Some(TokenOverride {
                    input: Some(7),
                    output: None,
                    total: None,
                }),
                ..Default::default()
            },
        );
        let summary = CostAttributor::attribute(&graph, &executed, &overrides);
        let nc = &summary.node_costs[&NodeId::new("n1")];
        assert_eq!(nc.cost, 1.5);
        assert_eq!(nc.tokens.input, 7);
        assert_eq!(nc.tokens.output, 100);
        assert_eq!(nc.tokens.total, 107);
    }

    #[test]
    fn zero_tokens_falls_back_to_estimation() {
        let mut node = llm_node("n1", "gpt-4o", 0, 0, 0);
        node.data.prompts = vec!["abcdefgh".to_string()]; // 8 chars -> 2 tokens
        node.data.response = Some("abcd".to_string()); // 4 chars -> 1 token
        let graph = GraphBuilder::build(vec![node], &[]);
        let executed = vec![NodeId::new("n1")];
        let summary = CostAttributor::attribute(&graph, &executed, &HashMap::new());
        let nc = &summary.node_costs[&NodeId::new("n1")];
        assert_eq!(nc.tokens.input, 2);
        assert_eq!(nc.tokens.output, 1);
    }

    #[test]
    fn non_llm_type_and_non_recognized_model_is_not_accruing() {
        let mut node = llm_node("n1", "some-local-model", 10, 10, 0);
        node.node_type = NodeType::Chain;
        assert!(!is_llm_accruing(&node));
    }
}
