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

//! `HubSink`: the [`ReplaySink`] implementation that actually moves bytes,
//! translating [`OutboundEvent`]s into wire [`axon_hub::Envelope`]s and
//! handing them to the [`SubscriptionHub`].
//!
//! This is the one place that knows both protocols: `axon-replay`'s
//! domain events and `axon-hub`'s transport-agnostic send/broadcast.
//! `replay_llm_delta` is the one event class that is allowed to drop
//! under load — every other event is delivered with blocking semantics,
//! so it routes through [`SubscriptionHub::try_send`] instead of
//! [`SubscriptionHub::send`].

use std::sync::Arc;

use async_trait::async_trait;
use axon_hub::{ConnId, SubscriptionHub};
use axon_replay::{trace_room, OutboundEvent, ReplaySink};

use crate::dto::to_envelope;

pub struct HubSink {
    hub: Arc<SubscriptionHub>,
    /// The connection this sink's `send` targets — `None` for sinks used
    /// outside a live WebSocket connection (e.g. the CLI's offline
    /// `axon replay`), where `send` is a no-op.
    conn: Option<ConnId>,
}

impl HubSink {
    pub fn new(hub: Arc<SubscriptionHub>) -> Self {
        Self { hub, conn: None }
    }

    pub fn for_connection(hub: Arc<SubscriptionHub>, conn: ConnId) -> Self {
        Self { hub, conn: Some(conn) }
    }
}

#[async_trait]
impl ReplaySink for HubSink {
    async fn send(&self, event: OutboundEvent) {
        let Some(conn) = self.conn else { return };
        let envelope = to_envelope(&event);
        match event {
            OutboundEvent::ReplayLlmDelta { .. } => {
                self.hub.try_send(conn, envelope);
            }
            _ => self.hub.send(conn, envelope).await,
        }
    }

    async fn broadcast(&self, room: &str, event: OutboundEvent) {
        self.hub.broadcast(room, to_envelope(&event)).await;
    }
}

/// Build the room name a `replay_llm_request`'s trace subscribes to, for
/// callers outside `axon-replay`.
pub fn room_for_trace(trace_id: &axon_core::TraceId) -> String {
    trace_room(trace_id)
}
