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

//! `SubscriptionHub`.
//!
//! `rooms: map<room, set<conn>>` lives behind a single [`parking_lot::Mutex`]
//! — membership is the only mutation, and every critical section here is a
//! single hash-set insert/remove/lookup, O(1) amortized. Per-connection
//! outboxes are looked up through a [`DashMap`] since sending doesn't need
//! the rooms mutex at all.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::envelope::Envelope;

/// Bound on a connection's outbox. Deltas are dropped past this point
///; final events are delivered with blocking
/// semantics regardless of how full the channel is.
const OUTBOX_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

struct Connection {
    sender: mpsc::Sender<Envelope>,
}

pub struct SubscriptionHub {
    next_conn_id: AtomicU64,
    connections: DashMap<ConnId, Connection>,
    /// `room -> members`.
    rooms: Mutex<HashMap<String, HashSet<ConnId>>>,
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self {
            next_conn_id: AtomicU64::new(1),
            connections: DashMap::new(),
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new connection and return its inbox. The caller (the
    /// transport layer) owns draining this receiver and writing frames.
    pub fn register(&self) -> (ConnId, mpsc::Receiver<Envelope>) {
        let id = ConnId(self.next_conn_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        self.connections.insert(id, Connection { sender: tx });
        (id, rx)
    }

    /// Drop a connection and remove it from every room it had joined
    ///.
    pub fn unregister(&self, conn: ConnId) {
        self.connections.remove(&conn);
        let mut rooms = self.rooms.lock();
        rooms.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    /// `watch_trace`: join `room`. No history is
    /// buffered — the caller is expected to follow this with a `send` of
    /// a fresh `trace_data` snapshot, since future subscribers only ever
    /// see it by requesting one.
    pub fn watch(&self, conn: ConnId, room: &str) {
        self.rooms
            .lock()
            .entry(room.to_string())
            .or_default()
            .insert(conn);
    }

    /// `unwatch_trace`: leave `room`.
    pub fn unwatch(&self, conn: ConnId, room: &str) {
        let mut rooms = self.rooms.lock();
        if let Some(members) = rooms.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }

    pub fn room_size(&self, room: &str) -> usize {
        self.rooms.lock().get(room).map(HashSet::len).unwrap_or(0)
    }

    /// Per-connection delivery with blocking semantics — final events are
    /// always delivered this way, never dropped.
    pub async fn send(&self, conn: ConnId, envelope: Envelope) {
        let sender = self.connections.get(&conn).map(|c| c.sender.clone());
        if let Some(sender) = sender {
            if sender.send(envelope).await.is_err() {
                tracing::debug!(conn = conn.0, "send to disconnected connection dropped");
            }
        }
    }

    /// Non-blocking delivery used for `replay_llm_delta`: if the
    /// subscriber's inbox is full, the delta is dropped rather than
    /// blocking the sender. Returns whether it was actually enqueued.
    pub fn try_send(&self, conn: ConnId, envelope: Envelope) -> bool {
        let Some(entry) = self.connections.get(&conn) else {
            return false;
        };
        match entry.sender.try_send(envelope) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(conn = conn.0, "dropping delta: outbox full");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Deliver to every current member of `room`, in arrival order per
    /// connection. Relative order is preserved per sender; cross-sender
    /// order is not guaranteed. Membership is snapshotted under the rooms
    /// mutex and released before any send, so a slow receiver never blocks
    /// room membership changes.
    pub async fn broadcast(&self, room: &str, envelope: Envelope) {
        let members: Vec<ConnId> = {
            let rooms = self.rooms.lock();
            rooms
                .get(room)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default()
        };

        for conn in members {
            self.send(conn, envelope.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn watch_then_broadcast_delivers_to_member() {
        let hub = SubscriptionHub::new();
        let (conn, mut rx) = hub.register();
        hub.watch(conn, "trace:t1");

        hub.broadcast("trace:t1", Envelope::new("replay_llm_result", serde_json::json!({"x": 1})))
            .await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event, "replay_llm_result");
    }

    #[tokio::test]
    async fn unwatch_stops_delivery() {
        let hub = SubscriptionHub::new();
        let (conn, mut rx) = hub.register();
        hub.watch(conn, "trace:t1");
        hub.unwatch(conn, "trace:t1");

        hub.broadcast("trace:t1", Envelope::new("replay_llm_result", serde_json::json!({})))
            .await;

        // Give the (empty) broadcast a chance to have delivered anything;
        // there should be nothing queued.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_only_reaches_current_room_members() {
        let hub = SubscriptionHub::new();
        let (conn_a, mut rx_a) = hub.register();
        let (conn_b, mut rx_b) = hub.register();
        hub.watch(conn_a, "trace:t1");
        hub.watch(conn_b, "trace:t2");

        hub.broadcast("trace:t1", Envelope::new("replay_llm_result", serde_json::json!({})))
            .await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_removes_from_all_rooms() {
        let hub = SubscriptionHub::new();
        let (conn, _rx) = hub.register();
        hub.watch(conn, "trace:t1");
        assert_eq!(hub.room_size("trace:t1"), 1);

        hub.unregister(conn);
        assert_eq!(hub.room_size("trace:t1"), 0);
    }

    #[tokio::test]
    async fn try_send_drops_when_outbox_is_full() {
        let hub = SubscriptionHub::new();
        let (conn, mut rx) = hub.register();

        let mut delivered = 0;
        for i in 0..(OUTBOX_CAPACITY + 10) {
            if hub.try_send(conn, Envelope::new("replay_llm_delta", serde_json::json!({"i": i}))) {
                delivered += 1;
            }
        }
        assert_eq!(delivered, OUTBOX_CAPACITY);

        let mut drained = 0;
        while rx.try_recv().is_ok() {
            drained += 1;
        }
        assert_eq!(drained, OUTBOX_CAPACITY);
    }

    #[tokio::test]
    async fn send_to_unknown_connection_is_a_silent_noop() {
        let hub = SubscriptionHub::new();
        hub.send(ConnId(9999), Envelope::new("replay_result", serde_json::json!({}))).await;
    }
}
