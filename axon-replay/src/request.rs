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

//! Inbound subscription-protocol payloads and their
//! normalization.

use axon_core::{NodeId, TraceId};

use crate::error::ReplayError;
use crate::llm::ChatMessage;

/// `replay_request`: attribution-only replay, no new LLM call.
#[derive(Debug, Clone, Default)]
pub struct ReplayRequestPayload {
    pub request_id: Option<String>,
    pub node_id: Option<String>,
    pub trace_id: Option<String>,
}

/// `replay_llm_request`. `start_node_id`/`node_id`/
/// `selected_node_id`/`start` are accepted synonyms for the same field;
/// the first one present wins, in that order.
#[derive(Debug, Clone, Default)]
pub struct ReplayLlmRequestPayload {
    pub request_id: Option<String>,
    pub trace_id: Option<String>,
    pub model: Option<String>,
    pub messages: Option<Vec<ChatMessage>>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub stream: Option<bool>,
    pub start_node_id: Option<String>,
    pub node_id: Option<String>,
    pub selected_node_id: Option<String>,
    pub start: Option<String>,
}

impl ReplayLlmRequestPayload {
    fn resolved_start(&self) -> Option<String> {
        self.start_node_id
            .clone()
            .or_else(|| self.node_id.clone())
            .or_else(|| self.selected_node_id.clone())
            .or_else(|| self.start.clone())
    }
}

/// The request after normalization/defaulting has been applied.
#[derive(Debug, Clone)]
pub struct NormalizedLlmRequest {
    pub request_id: String,
    pub trace_id: Option<TraceId>,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub stream: bool,
    pub start_node_id: Option<NodeId>,
}

pub const DEFAULT_TEMPERATURE: f64 = 0.0;
pub const DEFAULT_MAX_TOKENS: u32 = 150;

fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Normalize a `replay_llm_request` payload: `model`
/// defaults to the configured mini model, `temperature` to `0.0`,
/// `maxTokens` to `150`, `messages` to a single "No prompt provided." user
/// message. `requestId` is client-supplied if a non-empty string,
/// otherwise server-generated.
pub fn normalize_llm_request(
    payload: ReplayLlmRequestPayload,
    default_model: &str,
) -> NormalizedLlmRequest {
    let request_id = payload
        .request_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(generate_request_id);

    let start_node_id = payload.resolved_start().map(NodeId::new);

    NormalizedLlmRequest {
        request_id,
        trace_id: payload.trace_id.clone().map(TraceId::new),
        model: payload.model.clone().unwrap_or_else(|| default_model.to_string()),
        messages: payload.messages.clone().unwrap_or_else(|| {
            vec![ChatMessage {
                role: "user".to_string(),
                content: "No prompt provided.".to_string(),
            }]
        }),
        temperature: payload.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        max_tokens: payload.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        stream: payload.stream.unwrap_or(false),
        start_node_id,
    }
}

/// Validate a `replay_request` payload: both `traceId` and `nodeId` are
/// required.
pub fn validate_replay_request(
    payload: &ReplayRequestPayload,
) -> Result<(NodeId, TraceId), ReplayError> {
    let trace_id = payload
        .trace_id
        .as_ref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ReplayError::Validation("traceId is required".to_string()))?;
    let node_id = payload
        .node_id
        .as_ref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ReplayError::Validation("nodeId is required".to_string()))?;
    Ok((NodeId::new(node_id.as_str()), TraceId::new(trace_id.as_str())))
}
