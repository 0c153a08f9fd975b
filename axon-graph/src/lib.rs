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

//! Axon Graph
//!
//! Resolves raw trace nodes and edges into a canonical graph
//! and selects the executed/skipped subgraph for a replay run.

pub mod builder;
pub mod selector;

pub use builder::{CanonicalGraph, GraphBuilder};
pub use selector::{earliest_node, SelectionMode, SelectionResult, SubgraphSelector};
