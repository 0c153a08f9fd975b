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

//! `GraphBuilder`.
//!
//! Resolves the dual `NodeId`/`RunId` identifier spaces into a single
//! canonical, deduplicated adjacency structure. Decoding of stored
//! `data`/`tokens` text is the store layer's job (`axon-storage`) — by the
//! time a [`axon_core::Node`] reaches this crate it is already a typed
//! value, never a dynamically-shaped bag.

use std::collections::{HashMap, HashSet};

use axon_core::{CanonicalEdge, Edge, Node, NodeId, RunId};

/// The canonical, post-resolution trace graph.
#[derive(Debug, Clone)]
pub struct CanonicalGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<CanonicalEdge>,
    pub forward: HashMap<NodeId, Vec<NodeId>>,
    pub reverse: HashMap<NodeId, Vec<NodeId>>,
}

impl CanonicalGraph {
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.node_id == id)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.node_id.clone()).collect()
    }
}

pub struct GraphBuilder;

impl GraphBuilder {
    /// Build a [`CanonicalGraph`] from raw nodes and edges.
    pub fn build(nodes: Vec<Node>, edges: &[Edge]) -> CanonicalGraph {
        let mut nodes_by_id: HashMap<NodeId, usize> = HashMap::new();
        let mut run_id_to_node_id: HashMap<RunId, NodeId> = HashMap::new();

        for (idx, node) in nodes.iter().enumerate() {
            nodes_by_id.insert(node.node_id.clone(), idx);
            run_id_to_node_id.insert(node.run_id.clone(), node.node_id.clone());
        }

        let resolve = |raw: &str| -> Option<NodeId> {
            if let Some(idx) = nodes_by_id.get(&NodeId::new(raw)) {
                return Some(nodes[*idx].node_id.clone());
            }
            run_id_to_node_id.get(&RunId::new(raw)).cloned()
        };

        let mut canonical: Vec<CanonicalEdge> = Vec::new();
        let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();

        for edge in edges {
            let (Some(from), Some(to)) = (resolve(edge.from.as_str()), resolve(edge.to.as_str()))
            else {
                tracing::debug!(
                    from = edge.from.as_str(),
                    to = edge.to.as_str(),
                    "dropping edge with unresolvable endpoint"
                );
                continue;
            };
            if seen.insert((from.clone(), to.clone())) {
                canonical.push(CanonicalEdge { from, to });
            }
        }

        for node in &nodes {
            let Some(parent_run_id) = &node.parent_run_id else {
                continue;
            };
            if parent_run_id.as_str().is_empty() {
                continue;
            }
            let Some(parent_node_id) = run_id_to_node_id.get(parent_run_id).cloned() else {
                continue;
            };
            let pair = (parent_node_id.clone(), node.node_id.clone());
            if seen.insert(pair.clone()) {
                canonical.push(CanonicalEdge {
                    from: pair.0,
                    to: pair.1,
                });
            }
        }

        if canonical.is_empty() && nodes.len() > 1 {
            canonical = synthesize_time_linear_chain(&nodes);
        }

        let (forward, reverse) = adjacency_maps(&canonical);

        CanonicalGraph {
            nodes,
            edges: canonical,
            forward,
            reverse,
        }
    }
}

fn synthesize_time_linear_chain(nodes: &[Node]) -> Vec<CanonicalEdge> {
    let mut ordered: Vec<&Node> = nodes.iter().collect();
    ordered.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.node_id.cmp(&b.node_id))
    });
    ordered
        .windows(2)
        .map(|w| CanonicalEdge {
            from: w[0].node_id.clone(),
            to: w[1].node_id.clone(),
        })
        .collect()
}

fn adjacency_maps(
    edges: &[CanonicalEdge],
) -> (
    HashMap<NodeId, Vec<NodeId>>,
    HashMap<NodeId, Vec<NodeId>>,
) {
    let mut forward: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut reverse: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

    for edge in edges {
        let fwd = forward.entry(edge.from.clone()).or_default();
        if !fwd.contains(&edge.to) {
            fwd.push(edge.to.clone());
        }
        let rev = reverse.entry(edge.to.clone()).or_default();
        if !rev.contains(&edge.from) {
            rev.push(edge.from.clone());
        }
    }

    (forward, reverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_core::{NodeData, NodeStatus, NodeType, RawRef, TokenUsage};
    use chrono::{TimeZone, Utc};

    fn node(id: &str, run: &str, parent_run: Option<&str>, t: i64) -> Node {
        Node {
            node_id: NodeId::new(id),
            run_id: RunId::new(run),
            node_type: NodeType::Llm,
            status: NodeStatus::Complete,
            start_time: Utc.timestamp_opt(t, 0).unwrap(),
            end_time: None,
            latency_ms: Some(10),
            model: Some("gpt-4o-mini".into()),
            cost: 0.0,
            tokens: TokenUsage::default(),
            data: NodeData::default(),
            parent_run_id: parent_run.map(RunId::new),
        }
    }

    #[test]
    fn parent_run_id_becomes_canonical_edge() {
        let nodes = vec![node("n1", "r1", None, 0), node("n2", "r2", Some("r1"), 1)];
        let graph = GraphBuilder::build(nodes, &[]);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].from, NodeId::new("n1"));
        assert_eq!(graph.edges[0].to, NodeId::new("n2"));
    }

    #[test]
    fn edges_resolve_mixed_node_and_run_ids() {
        let nodes = vec![node("n1", "r1", None, 0), node("n2", "r2", None, 1)];
        let edges = vec![Edge {
            from: RawRef::new("n1"),
            to: RawRef::new("r2"),
        }];
        let graph = GraphBuilder::build(nodes, &edges);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].to, NodeId::new("n2"));
    }

    #[test]
    fn unresolvable_edge_is_dropped() {
        let nodes = vec![node("n1", "r1", None, 0)];
        let edges = vec![Edge {
            from: RawRef::new("n1"),
            to: RawRef::new("ghost"),
        }];
        let graph = GraphBuilder::build(nodes, &edges);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn degenerate_graph_synthesizes_time_linear_chain() {
        let nodes = vec![
            node("n1", "r1", None, 4),
            node("n2", "r2", None, 2),
            node("n3", "r3", None, 6),
            node("n4", "r4", None, 0),
            node("n5", "r5", None, 8),
        ];
        let graph = GraphBuilder::build(nodes, &[]);
        assert_eq!(graph.edges.len(), 4);
        // n4(0) -> n2(2) -> n1(4) -> n3(6) -> n5(8)
        assert_eq!(graph.edges[0].from, NodeId::new("n4"));
        assert_eq!(graph.edges[0].to, NodeId::new("n2"));
        assert_eq!(graph.edges.last().unwrap().to, NodeId::new("n5"));
    }

    #[test]
    fn duplicate_edges_are_deduplicated() {
        let nodes = vec![node("n1", "r1", None, 0), node("n2", "r2", None, 1)];
        let edges = vec![
            Edge {
                from: RawRef::new("n1"),
                to: RawRef::new("n2"),
            },
            Edge {
                from: RawRef::new("n1"),
                to: RawRef::new("n2"),
            },
        ];
        let graph = GraphBuilder::build(nodes, &edges);
        assert_eq!(graph.edges.len(), 1);
    }
}
