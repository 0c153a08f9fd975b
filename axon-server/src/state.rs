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

//! Shared server state: the store bundle, the tool registry/grounder
//! pair, the configured LLM provider, and the `SubscriptionHub` every
//! WebSocket connection is registered against — a cheaply-`Clone`-able
//! bundle of `Arc`s handed to every handler through axum's `State`
//! extractor.
//!
//! A [`ReplayCoordinator`] is built fresh per WebSocket connection rather
//! than shared process-wide: a hub send targets one specific connection,
//! so the coordinator's sink has to be bound to that connection.
//! Everything the coordinator otherwise needs (stores, grounder, LLM
//! provider, config) is an `Arc` clone, so building one per connection is
//! cheap.

use std::sync::Arc;

use axon_hub::{ConnId, SubscriptionHub};
use axon_replay::{CoordinatorConfig, EchoProvider, LlmProvider, ReplayCoordinator};
use axon_storage::Stores;
use axon_tools::{ToolProviders, ToolRegistry, TranscriptGrounder};

use crate::config::AxonConfig;
use crate::sink::HubSink;

#[derive(Clone)]
pub struct AppState {
    pub stores: Arc<Stores>,
    pub hub: Arc<SubscriptionHub>,
    grounder: Arc<TranscriptGrounder>,
    llm: Arc<dyn LlmProvider>,
    coordinator_config: CoordinatorConfig,
}

impl AppState {
    /// Wire up the process-wide dependency graph from a loaded config.
    /// `llm` is separate from `config` since which provider backs
    /// `LlmProvider` (live API vs. `EchoProvider` for offline/demo use) is
    /// a deployment choice, not part of `AxonConfig` itself.
    pub fn new(config: &AxonConfig, llm: Arc<dyn LlmProvider>) -> Self {
        let stores = Arc::new(Stores::in_memory());
        let hub = Arc::new(SubscriptionHub::new());
        let registry = Arc::new(ToolRegistry::new(ToolProviders::from_env()));
        let grounder = Arc::new(TranscriptGrounder::new(registry));

        let coordinator_config = CoordinatorConfig {
            default_model: config.replay.default_model.clone(),
            model_call_timeout: config.replay.model_call_timeout(),
            replay_mode: config.replay.selection_mode(),
        };

        Self {
            stores,
            hub,
            grounder,
            llm,
            coordinator_config,
        }
    }

    /// Convenience constructor for the CLI/tests: wires an [`EchoProvider`]
    /// instead of a live model client.
    pub fn with_echo_provider(config: &AxonConfig) -> Self {
        Self::new(config, Arc::new(EchoProvider))
    }

    /// A coordinator whose terminal/partial events are delivered to `conn`
    /// and whose broadcasts go out via the shared hub.
    pub fn coordinator_for(&self, conn: ConnId) -> ReplayCoordinator {
        let sink = Arc::new(HubSink::for_connection(self.hub.clone(), conn));
        ReplayCoordinator::new(
            self.stores.clone(),
            self.grounder.clone(),
            self.llm.clone(),
            sink,
            self.coordinator_config.clone(),
        )
    }
}
