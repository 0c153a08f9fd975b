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

//! `ReplayError`: the 5 observable error kinds.

use thiserror::Error;

/// Errors observable by a replay caller. Tool and geocoder
/// failures never surface as this type — they are recovered locally into
/// `"(unavailable)"`/`"not executed"` text by `axon-tools`.
#[derive(Debug, Error, Clone)]
pub enum ReplayError {
    /// Malformed payload: missing `traceId` when required, bad `messages`
    /// shape.
    #[error("invalid replay request: {0}")]
    Validation(String),

    /// Trace or start node does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Recovered transient failure surfaced for logging only; callers never
    /// see this as a terminal event — it is resolved before it reaches the
    /// coordinator.
    #[error("transient: {0}")]
    Transient(String),

    /// The model call failed or timed out.
    #[error("model error: {0}")]
    Model(String),

    /// Attribution math or graph-building invariants violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ReplayError {
    /// The event-surface category used when building terminal
    /// `replay_result`/`replay_llm_response` payloads. Not transmitted
    /// itself — only `Display` text is.
    pub fn kind(&self) -> &'static str {
        match self {
            ReplayError::Validation(_) => "validation",
            ReplayError::NotFound(_) => "not_found",
            ReplayError::Transient(_) => "transient",
            ReplayError::Model(_) => "model",
            ReplayError::Internal(_) => "internal",
        }
    }
}
