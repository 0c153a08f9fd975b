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

//! Axon Storage
//!
//! The store boundary: `TraceStore`/`NodeStore`/
//! `EdgeStore` traits the replay core reads through, plus an
//! `AnnotationStore` for replay-time overrides. In-memory implementations
//! are provided for tests, the CLI, and any deployment that doesn't need
//! persistence across restarts.

pub mod decode;
pub mod error;
pub mod memory;
pub mod traits;

pub use error::StorageError;
pub use memory::{
    InMemoryAnnotationStore, InMemoryEdgeStore, InMemoryNodeStore, InMemoryTraceStore, Stores,
};
pub use traits::{AnnotationStore, EdgeStore, NodeStore, TraceStore};
