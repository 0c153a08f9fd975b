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

//! Axon Hub
//!
//! Room-based pub/sub: `trace:<id>` rooms receive replay
//! progress deltas and final results. Transport-agnostic — a connection is
//! just an inbox (an `mpsc::Receiver<Envelope>`) that some upstream layer
//! (`axon-server`'s WebSocket handler) drains and serializes onward.

pub mod envelope;
pub mod hub;

pub use envelope::Envelope;
pub use hub::{ConnId, SubscriptionHub};
