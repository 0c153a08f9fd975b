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

//! The subscription protocol's WebSocket transport.
//!
//! Split the socket, heartbeat with ping/pong on a timer, and
//! `tokio::select!` over the inbound stream and this connection's outbox.
//! The socket is bidirectional — inbound text frames carry the
//! protocol's four client events (`watch_trace`, `unwatch_trace`,
//! `replay_request`, `replay_llm_request`).

use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::interval;
use tracing::{debug, info, warn};

use axon_core::TraceId;
use axon_replay::{ReplayLlmRequestPayload, ReplayRequestPayload};

use crate::dto::{TraceDataPayload, TraceStats};
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Inbound frames, tagged by `event`. Unknown events and malformed
/// payloads are logged and ignored rather than closing the connection —
/// a single bad frame shouldn't drop every other subscription a client
/// holds.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
enum ClientEvent {
    WatchTrace(TraceIdPayload),
    UnwatchTrace(TraceIdPayload),
    ReplayRequest(ReplayRequestWire),
    ReplayLlmRequest(ReplayLlmRequestWire),
}

/// `watch_trace : string | {traceId}` / `unwatch_trace : string`: the
/// payload is either a bare trace id string or an object carrying
/// `traceId`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TraceIdPayload {
    Id(String),
    Wrapped {
        #[serde(rename = "traceId")]
        trace_id: String,
    },
}

impl TraceIdPayload {
    fn into_trace_id(self) -> String {
        match self {
            TraceIdPayload::Id(id) => id,
            TraceIdPayload::Wrapped { trace_id } => trace_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayRequestWire {
    request_id: Option<String>,
    node_id: Option<String>,
    trace_id: Option<String>,
}

impl From<ReplayRequestWire> for ReplayRequestPayload {
    fn from(w: ReplayRequestWire) -> Self {
        Self {
            request_id: w.request_id,
            node_id: w.node_id,
            trace_id: w.trace_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ChatMessageWire {
    role: String,
    content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayLlmRequestWire {
    request_id: Option<String>,
    trace_id: Option<String>,
    model: Option<String>,
    messages: Option<Vec<ChatMessageWire>>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    stream: Option<bool>,
    start_node_id: Option<String>,
    node_id: Option<String>,
    selected_node_id: Option<String>,
    start: Option<String>,
}

impl From<ReplayLlmRequestWire> for ReplayLlmRequestPayload {
    fn from(w: ReplayLlmRequestWire) -> Self {
        Self {
            request_id: w.request_id,
            trace_id: w.trace_id,
            model: w.model,
            messages: w.messages.map(|ms| {
                ms.into_iter()
                    .map(|m| axon_replay::ChatMessage {
                        role: m.role,
                        content: m.content,
                    })
                    .collect()
            }),
            temperature: w.temperature,
            max_tokens: w.max_tokens,
            stream: w.stream,
            start_node_id: w.start_node_id,
            node_id: w.node_id,
            selected_node_id: w.selected_node_id,
            start: w.start,
        }
    }
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (conn, mut outbox) = state.hub.register();
    let (mut sender, mut receiver) = socket.split();
    let coordinator = state.coordinator_for(conn);

    let mut ping_interval = interval(PING_INTERVAL);
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if last_pong.elapsed() > PONG_TIMEOUT {
                    warn!(conn = conn.0, "websocket client unresponsive, closing");
                    break;
                }
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            envelope = outbox.recv() => {
                match envelope {
                    Some(envelope) => {
                        let frame = serde_json::json!({
                            "event": envelope.event,
                            "payload": envelope.payload,
                        });
                        if sender.send(Message::Text(frame.to_string())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = sender.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                    }
                    Some(Ok(Message::Text(text))) => {
                        handle_inbound(&text, &state, conn, &coordinator, &mut sender).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!(conn = conn.0, "ignoring binary frame");
                    }
                    Some(Err(err)) => {
                        warn!(conn = conn.0, error = %err, "websocket receive error");
                        break;
                    }
                }
            }
        }
    }

    state.hub.unregister(conn);
}

async fn handle_inbound(
    text: &str,
    state: &AppState,
    conn: axon_hub::ConnId,
    coordinator: &axon_replay::ReplayCoordinator,
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            debug!(conn = conn.0, error = %err, "ignoring malformed client frame");
            return;
        }
    };

    match event {
        ClientEvent::WatchTrace(payload) => {
            let trace_id = payload.into_trace_id();
            let room = format!("trace:{trace_id}");
            state.hub.watch(conn, &room);
            if let Some(snapshot) = load_trace_snapshot(state, &TraceId::new(trace_id)).await {
                let envelope = axon_hub::Envelope::new("trace_data", snapshot);
                let frame = serde_json::json!({"event": envelope.event, "payload": envelope.payload});
                let _ = sender.send(Message::Text(frame.to_string())).await;
            }
        }
        ClientEvent::UnwatchTrace(payload) => {
            let trace_id = payload.into_trace_id();
            state.hub.unwatch(conn, &format!("trace:{trace_id}"));
        }
        ClientEvent::ReplayRequest(payload) => {
            coordinator.handle_replay_request(payload.into()).await;
        }
        ClientEvent::ReplayLlmRequest(payload) => {
            coordinator.handle_replay_llm_request(payload.into()).await;
        }
    }
}

/// `trace_data` snapshot pushed whenever a connection watches a trace.
/// `None` when the trace doesn't exist — the caller simply skips the
/// push rather than erroring the connection over it.
async fn load_trace_snapshot(state: &AppState, trace_id: &TraceId) -> Option<TraceDataPayload> {
    let trace = state.stores.traces.get_trace(trace_id).await.ok()??;
    let nodes = state.stores.nodes.list_nodes(trace_id).await.ok()?;
    let edges = state.stores.edges.list_edges(trace_id).await.ok()?;
    let stats = TraceStats::from_nodes(&nodes);

    Some(TraceDataPayload {
        trace: Some(trace),
        nodes,
        edges,
        anomalies: Vec::new(),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_trace_accepts_bare_string_payload() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"watch_trace","payload":"t1"}"#).unwrap();
        match event {
            ClientEvent::WatchTrace(p) => assert_eq!(p.into_trace_id(), "t1"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn watch_trace_accepts_wrapped_camel_case_payload() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"watch_trace","payload":{"traceId":"t1"}}"#).unwrap();
        match event {
            ClientEvent::WatchTrace(p) => assert_eq!(p.into_trace_id(), "t1"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn replay_request_deserializes_camel_case_keys() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"event":"replay_request","payload":{"requestId":"r1","nodeId":"n1","traceId":"t1"}}"#,
        )
        .unwrap();
        match event {
            ClientEvent::ReplayRequest(w) => {
                assert_eq!(w.request_id.as_deref(), Some("r1"));
                assert_eq!(w.node_id.as_deref(), Some("n1"));
                assert_eq!(w.trace_id.as_deref(), Some("t1"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn replay_llm_request_deserializes_camel_case_keys() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"event":"replay_llm_request","payload":{"traceId":"t1","startNodeId":"n2","maxTokens":64,"messages":[{"role":"user","content":"hi"}]}}"#,
        )
        .unwrap();
        match event {
            ClientEvent::ReplayLlmRequest(w) => {
                assert_eq!(w.trace_id.as_deref(), Some("t1"));
                assert_eq!(w.start_node_id.as_deref(), Some("n2"));
                assert_eq!(w.max_tokens, Some(64));
                assert_eq!(w.messages.as_ref().unwrap().len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
