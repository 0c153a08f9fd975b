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

//! Storage boundary traits: externally synchronized, read-mostly from the
//! core's perspective. Kept to trait form so a persistent backend can be
//! swapped in later without touching call sites.

use async_trait::async_trait;
use axon_core::{Edge, Node, NodeId, Trace, TraceId};
use serde_json::Value;

use crate::error::StorageError;

#[async_trait]
pub trait TraceStore: Send + Sync {
    async fn get_trace(&self, trace_id: &TraceId) -> Result<Option<Trace>, StorageError>;
    async fn put_trace(&self, trace: Trace) -> Result<(), StorageError>;
}

#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn list_nodes(&self, trace_id: &TraceId) -> Result<Vec<Node>, StorageError>;
    async fn get_node(&self, node_id: &NodeId) -> Result<Option<Node>, StorageError>;
    async fn put_node(&self, trace_id: TraceId, node: Node) -> Result<(), StorageError>;
}

#[async_trait]
pub trait EdgeStore: Send + Sync {
    async fn list_edges(&self, trace_id: &TraceId) -> Result<Vec<Edge>, StorageError>;
    async fn put_edge(&self, trace_id: TraceId, edge: Edge) -> Result<(), StorageError>;
}

/// Per-node annotations recorded alongside a replay (e.g. the override
/// bag a caller supplied, for audit/replay-again). A supplemental
/// convenience over the core data model, not part of it.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    async fn put_annotation(
        &self,
        trace_id: &TraceId,
        node_id: &NodeId,
        value: Value,
    ) -> Result<(), StorageError>;

    async fn list_annotations(
        &self,
        trace_id: &TraceId,
    ) -> Result<Vec<(NodeId, Value)>, StorageError>;
}
