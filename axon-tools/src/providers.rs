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

//! Tool provider configuration.

use axon_core::ToolConfig;
use std::collections::HashMap;

pub const RESERVED_GEOCODE: &str = "geocode";
pub const RESERVED_WEATHER: &str = "weather_api";
pub const RESERVED_WEATHER_FALLBACK: &str = "weather_api_fallback";

/// Process-wide, immutable-after-init tool provider table. Loaded once
/// from the `TOOL_PROVIDERS` environment variable at startup.
#[derive(Debug, Clone, Default)]
pub struct ToolProviders {
    providers: HashMap<String, ToolConfig>,
}

impl ToolProviders {
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    pub fn from_map(providers: HashMap<String, ToolConfig>) -> Self {
        Self { providers }
    }

    /// Parse `TOOL_PROVIDERS` as a JSON object of tool name to config.
    /// Unset or invalid JSON disables external tooling (returns an empty
    /// table); `calculator` remains available regardless, since it is a
    /// built-in, not a provider.
    pub fn from_env() -> Self {
        match std::env::var("TOOL_PROVIDERS") {
            Ok(raw) => match serde_json::from_str::<HashMap<String, ToolConfig>>(&raw) {
                Ok(map) => Self::from_map(map),
                Err(err) => {
                    tracing::warn!(error = %err, "TOOL_PROVIDERS is set but not valid JSON; external tooling disabled");
                    Self::empty()
                }
            },
            Err(_) => Self::empty(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolConfig> {
        self.providers.get(name)
    }
}
