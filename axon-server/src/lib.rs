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

//! Axon Server
//!
//! Wires the replay engine (`axon-replay`), the graph/tools crates it
//! depends on, and `axon-hub`'s `SubscriptionHub` behind a single
//! WebSocket plus a liveness endpoint.

pub mod config;
pub mod dto;
pub mod routes;
pub mod sink;
pub mod state;
pub mod ws;

use std::sync::Arc;

use anyhow::Result;
use axon_replay::LlmProvider;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use config::AxonConfig;
pub use state::AppState;

/// Initialize `tracing-subscriber`: `RUST_LOG` if set, else a sane
/// per-crate default.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "axon_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Run the HTTP/WebSocket server until it errors or is interrupted.
/// `llm` is the live model client; tests and `axon replay` construct
/// `AppState` directly instead of going through this function.
pub async fn run_server(config: AxonConfig, llm: Arc<dyn LlmProvider>) -> Result<()> {
    tracing::info!(addr = %config.server.listen_addr, "starting axon-server");

    let state = AppState::new(&config, llm);

    let cors = if config.server.enable_cors {
        tracing::warn!("CORS: allowing all origins (default for local/desktop use)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
