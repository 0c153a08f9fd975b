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

//! `axon`: the command-line entry point. `serve` boots the WebSocket
//! server; `replay` exercises the replay engine directly against a trace
//! dump, without a running server or WebSocket client.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use axon_core::{Edge, Node, Trace};
use axon_replay::{
    CoordinatorConfig, EchoProvider, OutboundEvent, ReplayCoordinator, ReplayLlmRequestPayload,
    ReplayRequestPayload, ReplaySink,
};
use axon_server::AxonConfig;
use axon_storage::Stores;
use axon_tools::{ToolProviders, ToolRegistry, TranscriptGrounder};

#[derive(Parser, Debug)]
#[command(name = "axon", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP/WebSocket server.
    Serve {
        /// Path to a TOML config file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// HTTP/WS listen address (overrides config file).
        #[arg(long, env = "AXON_LISTEN_ADDR")]
        listen_addr: Option<String>,

        /// Data directory path (overrides config file).
        #[arg(long, env = "AXON_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Exercise the replay engine against a trace dump, with no server or
    /// WebSocket client in the loop.
    Replay {
        /// Path to a JSON trace dump: `{"trace": ..., "nodes": [...], "edges": [...]}`.
        #[arg(short, long)]
        trace_file: PathBuf,

        /// Node to start the subgraph selection from. Defaults to the
        /// trace's earliest node.
        #[arg(long)]
        node_id: Option<String>,

        /// Issue a fresh `replay_llm_request` instead of a plain
        /// `replay_request` re-attribution.
        #[arg(long)]
        llm: bool,

        /// Model override for `--llm`.
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Debug, serde::Deserialize)]
struct TraceDump {
    trace: Trace,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

/// Prints every outbound event to stdout instead of a WebSocket peer —
/// the CLI has no connection to target, so this is the sink's entire job.
struct StdoutSink;

#[async_trait::async_trait]
impl ReplaySink for StdoutSink {
    async fn send(&self, event: OutboundEvent) {
        print_event(&event);
    }

    async fn broadcast(&self, _room: &str, event: OutboundEvent) {
        print_event(&event);
    }
}

fn print_event(event: &OutboundEvent) {
    match event {
        OutboundEvent::ReplayLlmDelta { request_id, delta } => {
            print!("{delta}");
            let _ = request_id;
            use std::io::Write;
            let _ = std::io::stdout().flush();
        }
        OutboundEvent::ReplayLlmResponse {
            ok, text, error, ..
        } => {
            println!();
            if *ok {
                println!("[replay_llm_response] {}", text.as_deref().unwrap_or(""));
            } else {
                println!(
                    "[replay_llm_response] error: {}",
                    error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        OutboundEvent::ReplayLlmResult { trace_id, text, .. } => {
            println!("[replay_llm_result trace={trace_id}] {text}");
        }
        OutboundEvent::ReplayResult {
            success,
            executed_nodes,
            total_cost,
            total_latency_ms,
            error,
            ..
        } => {
            if *success {
                println!(
                    "[replay_result] ok executed={} total_cost={:.6} total_latency_ms={}",
                    executed_nodes.len(),
                    total_cost,
                    total_latency_ms
                );
            } else {
                println!(
                    "[replay_result] error: {}",
                    error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            listen_addr,
            data_dir,
        } => serve(config, listen_addr, data_dir).await,
        Commands::Replay {
            trace_file,
            node_id,
            llm,
            model,
        } => replay(trace_file, node_id, llm, model).await,
    }
}

async fn serve(
    config_path: Option<PathBuf>,
    listen_addr: Option<String>,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    axon_server::init_tracing();

    let mut config = AxonConfig::load(config_path.as_deref())?;
    if let Some(addr) = listen_addr {
        config.server.listen_addr = addr;
    }
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir;
    }

    // TODO(axon): wire a live LlmProvider once one is
    // configured; EchoProvider keeps `axon serve` runnable out of the box.
    axon_server::run_server(config, Arc::new(EchoProvider)).await
}

async fn replay(
    trace_file: PathBuf,
    node_id: Option<String>,
    llm: bool,
    model: Option<String>,
) -> Result<()> {
    axon_server::init_tracing();

    let text = std::fs::read_to_string(&trace_file)
        .with_context(|| format!("reading trace dump {trace_file:?}"))?;
    let dump: TraceDump =
        serde_json::from_str(&text).with_context(|| format!("parsing trace dump {trace_file:?}"))?;

    let trace_id = dump.trace.trace_id.clone();
    let node_id = match node_id {
        Some(id) => axon_core::NodeId::new(id),
        None => {
            let graph = axon_graph::GraphBuilder::build(dump.nodes.clone(), &dump.edges);
            axon_graph::earliest_node(&graph).context("trace dump has no nodes to start from")?
        }
    };

    let stores = Arc::new(Stores::in_memory());
    stores.traces.put_trace(dump.trace).await?;
    for node in dump.nodes {
        stores.nodes.put_node(trace_id.clone(), node).await?;
    }
    for edge in dump.edges {
        stores.edges.put_edge(trace_id.clone(), edge).await?;
    }

    let registry = Arc::new(ToolRegistry::new(ToolProviders::from_env()));
    let grounder = Arc::new(TranscriptGrounder::new(registry));
    let config = CoordinatorConfig {
        default_model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
        ..CoordinatorConfig::default()
    };
    let coordinator = ReplayCoordinator::new(
        stores,
        grounder,
        Arc::new(EchoProvider),
        Arc::new(StdoutSink),
        config,
    );

    if llm {
        coordinator
            .handle_replay_llm_request(ReplayLlmRequestPayload {
                request_id: None,
                trace_id: Some(trace_id.as_str().to_string()),
                node_id: Some(node_id.as_str().to_string()),
                ..Default::default()
            })
            .await;
    } else {
        coordinator
            .handle_replay_request(ReplayRequestPayload {
                request_id: None,
                node_id: Some(node_id.as_str().to_string()),
                trace_id: Some(trace_id.as_str().to_string()),
            })
            .await;
    }

    Ok(())
}
