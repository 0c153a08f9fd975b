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

//! Axon Replay
//!
//! The replay state machine: orchestrates an LLM call, grounds
//! the transcript, runs attribution over the executed set, and emits the
//! events the subscription protocol promises.

pub mod attribution;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod llm;
pub mod request;

pub use attribution::{AttributionSummary, CostAttributor, NodeCost, NodeOverride, TokenOverride};
pub use coordinator::{CoordinatorConfig, ReplayCoordinator};
pub use error::ReplayError;
pub use events::{trace_room, OutboundEvent, ReplaySink};
pub use llm::{ChatMessage, ChatResponse, EchoProvider, LlmProvider};
pub use request::{
    normalize_llm_request, validate_replay_request, NormalizedLlmRequest,
    ReplayLlmRequestPayload, ReplayRequestPayload,
};
