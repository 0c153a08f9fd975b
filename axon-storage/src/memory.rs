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

//! In-memory store implementations.
//!
//! `parking_lot`-guarded shared maps, externally synchronized: callers
//! never need to coordinate writes against reads beyond each store's own
//! lock, and the core above this crate only ever reads through the
//! `*Store` traits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axon_core::{Edge, Node, NodeId, Trace, TraceId};
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::StorageError;
use crate::traits::{AnnotationStore, EdgeStore, NodeStore, TraceStore};

#[derive(Default)]
pub struct InMemoryTraceStore {
    traces: RwLock<HashMap<TraceId, Trace>>,
}

impl InMemoryTraceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TraceStore for InMemoryTraceStore {
    async fn get_trace(&self, trace_id: &TraceId) -> Result<Option<Trace>, StorageError> {
        Ok(self.traces.read().get(trace_id).cloned())
    }

    async fn put_trace(&self, trace: Trace) -> Result<(), StorageError> {
        self.traces.write().insert(trace.trace_id.clone(), trace);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryNodeStore {
    // nodes grouped by the trace they belong to, preserving insertion order
    // so `list_nodes` returns a stable, deterministic sequence.
    by_trace: RwLock<HashMap<TraceId, Vec<NodeId>>>,
    by_id: RwLock<HashMap<NodeId, Node>>,
}

impl InMemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NodeStore for InMemoryNodeStore {
    async fn list_nodes(&self, trace_id: &TraceId) -> Result<Vec<Node>, StorageError> {
        let by_trace = self.by_trace.read();
        let by_id = self.by_id.read();
        let ids = by_trace.get(trace_id).cloned().unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|id| by_id.get(&id).cloned())
            .collect())
    }

    async fn get_node(&self, node_id: &NodeId) -> Result<Option<Node>, StorageError> {
        Ok(self.by_id.read().get(node_id).cloned())
    }

    async fn put_node(&self, trace_id: TraceId, node: Node) -> Result<(), StorageError> {
        let id = node.node_id.clone();
        self.by_id.write().insert(id.clone(), node);
        let mut by_trace = self.by_trace.write();
        let ids = by_trace.entry(trace_id).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryEdgeStore {
    by_trace: RwLock<HashMap<TraceId, Vec<Edge>>>,
}

impl InMemoryEdgeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EdgeStore for InMemoryEdgeStore {
    async fn list_edges(&self, trace_id: &TraceId) -> Result<Vec<Edge>, StorageError> {
        Ok(self.by_trace.read().get(trace_id).cloned().unwrap_or_default())
    }

    async fn put_edge(&self, trace_id: TraceId, edge: Edge) -> Result<(), StorageError> {
        self.by_trace.write().entry(trace_id).or_default().push(edge);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAnnotationStore {
    by_trace: RwLock<HashMap<TraceId, Vec<(NodeId, Value)>>>,
}

impl InMemoryAnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnnotationStore for InMemoryAnnotationStore {
    async fn put_annotation(
        &self,
        trace_id: &TraceId,
        node_id: &NodeId,
        value: Value,
    ) -> Result<(), StorageError> {
        self.by_trace
            .write()
            .entry(trace_id.clone())
            .or_default()
            .push((node_id.clone(), value));
        Ok(())
    }

    async fn list_annotations(
        &self,
        trace_id: &TraceId,
    ) -> Result<Vec<(NodeId, Value)>, StorageError> {
        Ok(self.by_trace.read().get(trace_id).cloned().unwrap_or_default())
    }
}

/// The four stores bundled together, the shape `ReplayCoordinator` depends
/// on.
pub struct Stores {
    pub traces: Arc<dyn TraceStore>,
    pub nodes: Arc<dyn NodeStore>,
    pub edges: Arc<dyn EdgeStore>,
    pub annotations: Arc<dyn AnnotationStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            traces: Arc::new(InMemoryTraceStore::new()),
            nodes: Arc::new(InMemoryNodeStore::new()),
            edges: Arc::new(InMemoryEdgeStore::new()),
            annotations: Arc::new(InMemoryAnnotationStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_core::{NodeData, NodeStatus, NodeType, RunId, TokenUsage};
    use chrono::Utc;

    fn sample_node(id: &str) -> Node {
        Node {
            node_id: NodeId::new(id),
            run_id: RunId::new(format!("r-{id}")),
            node_type: NodeType::Llm,
            status: NodeStatus::Complete,
            start_time: Utc::now(),
            end_time: None,
            latency_ms: Some(1),
            model: Some("gpt-4o-mini".into()),
            cost: 0.0,
            tokens: TokenUsage::default(),
            data: NodeData::default(),
            parent_run_id: None,
        }
    }

    #[tokio::test]
    async fn node_store_lists_in_insertion_order() {
        let store = InMemoryNodeStore::new();
        let trace_id = TraceId::new("t1");
        store
            .put_node(trace_id.clone(), sample_node("n1"))
            .await
            .unwrap();
        store
            .put_node(trace_id.clone(), sample_node("n2"))
            .await
            .unwrap();

        let nodes = store.list_nodes(&trace_id).await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].node_id, NodeId::new("n1"));
        assert_eq!(nodes[1].node_id, NodeId::new("n2"));
    }

    #[tokio::test]
    async fn trace_store_round_trips() {
        let store = InMemoryTraceStore::new();
        let trace_id = TraceId::new("t1");
        let trace = Trace {
            trace_id: trace_id.clone(),
            project_name: "demo".into(),
            start_time: Utc::now(),
            end_time: None,
            status: axon_core::TraceStatus::Running,
            total_cost: 0.0,
            total_nodes: 0,
        };
        store.put_trace(trace).await.unwrap();
        let fetched = store.get_trace(&trace_id).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn annotation_store_accumulates_per_trace() {
        let store = InMemoryAnnotationStore::new();
        let trace_id = TraceId::new("t1");
        store
            .put_annotation(&trace_id, &NodeId::new("n1"), serde_json::json!({"cost": 1.0}))
            .await
            .unwrap();
        let annotations = store.list_annotations(&trace_id).await.unwrap();
        assert_eq!(annotations.len(), 1);
    }
}
