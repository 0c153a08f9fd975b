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

//! Axon Core
//!
//! The trace/node/edge data model shared by every other Axon crate: stable
//! identifiers, the node/edge shapes ingestion writes and replay reads, and
//! the fixed model-pricing table. Nothing in this crate talks to a network
//! or a store — it is the vocabulary the rest of the workspace shares.

pub mod error;
pub mod ids;
pub mod pricing;
pub mod trace;

pub use error::CoreError;
pub use ids::{NodeId, RawRef, RunId, TraceId};
pub use pricing::{pricing, Price};
pub use trace::{
    CanonicalEdge, Edge, Node, NodeData, NodeStatus, NodeType, ToolConfig, TokenUsage, Trace,
    TraceStatus,
};
