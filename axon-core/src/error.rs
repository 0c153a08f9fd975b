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

//! Shared error types for the data model layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("node {0} has neither endTime nor latencyMs")]
    MissingTiming(String),

    #[error("node {0} has both endTime and latencyMs set ambiguously")]
    AmbiguousTiming(String),

    #[error("trace {0} not found")]
    TraceNotFound(String),

    #[error("node {0} not found")]
    NodeNotFound(String),
}
