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

//! `AxonConfig`: a layered, `serde`-deserializable config tree — TOML on
//! disk, overridable by environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use axon_graph::SelectionMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AxonConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP/WS listen address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Permissive-by-default CORS for local/desktop use, logged loudly.
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Overridable by `AXON_DATA_DIR`. The in-memory stores don't persist
    /// here yet, but the field is threaded through so a durable store
    /// implementation has somewhere to look.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplayConfig {
    /// The configured "mini model".
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Coarse timeout for a single model call (default 120 s).
    #[serde(default = "default_model_timeout_secs")]
    pub model_call_timeout_secs: u64,

    /// `REPLAY_MODE`: `""` | `"component"` | `"full"`.
    #[serde(default)]
    pub mode: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            model_call_timeout_secs: default_model_timeout_secs(),
            mode: String::new(),
        }
    }
}

impl ReplayConfig {
    pub fn selection_mode(&self) -> SelectionMode {
        SelectionMode::from_env_value(Some(&self.mode))
    }

    pub fn model_call_timeout(&self) -> Duration {
        Duration::from_secs(self.model_call_timeout_secs)
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:4317".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./axon-data")
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_model_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

impl AxonConfig {
    /// Load from a TOML file if present, then apply env overrides
    /// (`TOOL_PROVIDERS`, `REPLAY_MODE`, `AXON_LISTEN_ADDR`,
    /// `AXON_DATA_DIR`).
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path)?;
                toml::from_str(&text)?
            }
            _ => AxonConfig::default(),
        };

        if let Ok(addr) = std::env::var("AXON_LISTEN_ADDR") {
            config.server.listen_addr = addr;
        }
        if let Ok(dir) = std::env::var("AXON_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Ok(mode) = std::env::var("REPLAY_MODE") {
            config.replay.mode = mode;
        }

        Ok(config)
    }
}

impl Default for AxonConfig {
    fn default() -> Self {
        Self {
            server: HttpServerConfig::default(),
            storage: StorageConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AxonConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:4317");
        assert_eq!(config.replay.selection_mode(), SelectionMode::Staged);
    }

    #[test]
    fn replay_mode_parses_case_insensitively() {
        let mut config = AxonConfig::default();
        config.replay.mode = "FULL".to_string();
        assert_eq!(config.replay.selection_mode(), SelectionMode::Full);
    }
}
