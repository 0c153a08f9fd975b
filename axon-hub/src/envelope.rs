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

//! The wire-agnostic message shape a [`crate::hub::SubscriptionHub`]
//! moves around: an event name plus a JSON payload. This crate only needs
//! to carry it, not interpret it — the exact event names and payload keys
//! are `axon-server`'s concern.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Envelope {
    pub event: &'static str,
    pub payload: Value,
}

impl Envelope {
    pub fn new(event: &'static str, payload: impl Serialize) -> Self {
        let payload = serde_json::to_value(payload).unwrap_or(Value::Null);
        Self { event, payload }
    }
}
