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

//! `ToolRegistry::run_external_tool`.
//!
//! A named, looked-up tool configuration resolved to an executable HTTP
//! call: placeholder substitution, a per-call timeout, and an optional
//! JSON-path extraction of the response. A flat table, not a versioned
//! registry — there is exactly one configuration per tool name.

use axon_core::ToolConfig;
use serde_json::Value;
use std::time::Duration;

use crate::fetch::{self, fetch_json, get_by_path, normalize_query, DEFAULT_TOOL_TIMEOUT};
use crate::geocode::Geocoder;
use crate::providers::{ToolProviders, RESERVED_WEATHER};
use crate::weather::normalize_weather;

pub struct ToolRegistry {
    client: reqwest::Client,
    providers: ToolProviders,
    geocoder: Geocoder,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new(providers: ToolProviders) -> Self {
        let client = reqwest::Client::new();
        let geocode_cfg = providers.get(crate::providers::RESERVED_GEOCODE).cloned();
        let geocoder = Geocoder::new(client.clone(), geocode_cfg);
        Self {
            client,
            providers,
            geocoder,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn providers(&self) -> &ToolProviders {
        &self.providers
    }

    /// All failures — missing config, unresolved placeholders, transient
    /// HTTP/parse errors — are non-fatal and surface as `None`.
    pub async fn run_external_tool(&self, name: &str, raw_input: &str) -> Option<String> {
        let cfg = self.providers.get(name)?;
        if cfg.url.trim().is_empty() {
            return None;
        }

        let q = normalize_query(raw_input);
        let url = self.resolve_url(&cfg.url, &q).await?;

        let body = match fetch_json(&self.client, &url, self.timeout).await {
            Ok(body) => body,
            Err(err) => {
                tracing::debug!(tool = name, error = %err, "external tool fetch failed");
                return None;
            }
        };

        let value = match &cfg.result_path {
            Some(path) => get_by_path(&body, path)?.clone(),
            None => body,
        };

        if name == RESERVED_WEATHER {
            return normalize_weather(&value, &cfg.url);
        }

        Some(stringify(&value))
    }

    /// Placeholder substitution.
    async fn resolve_url(&self, template: &str, q: &str) -> Option<String> {
        let had_q = template.contains("{q}");
        let needs_lat_lon = template.contains("{lat}") || template.contains("{lon}");

        let mut url = template.replace("{q}", &urlencoding::encode(q));

        if needs_lat_lon {
            match self.geocoder.geocode(q).await {
                Some(ll) => {
                    url = url
                        .replace("{lat}", &ll.lat.to_string())
                        .replace("{lon}", &ll.lon.to_string());
                }
                None => {
                    if had_q {
                        url = url.replace("{lat}", "").replace("{lon}", "");
                    } else {
                        return None;
                    }
                }
            }
        }

        if url.contains("{q}") || url.contains("{lat}") || url.contains("{lon}") {
            return None;
        }

        Some(url)
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn registry_with(name: &str, url: &str, result_path: Option<&str>) -> ToolRegistry {
        let mut map = HashMap::new();
        map.insert(
            name.to_string(),
            ToolConfig {
                url: url.to_string(),
                result_path: result_path.map(|s| s.to_string()),
            },
        );
        ToolRegistry::new(ToolProviders::from_map(map))
    }

    #[tokio::test]
    async fn unknown_tool_name_returns_none() {
        let registry = ToolRegistry::new(ToolProviders::empty());
        assert_eq!(registry.run_external_tool("nonexistent", "x").await, None);
    }

    #[tokio::test]
    async fn missing_url_in_config_returns_none() {
        let registry = registry_with("blank", "", None);
        assert_eq!(registry.run_external_tool("blank", "x").await, None);
    }

    #[test]
    fn stringify_handles_scalars_and_objects() {
        assert_eq!(stringify(&Value::String("ok".into())), "ok");
        assert_eq!(stringify(&Value::from(42)), "42");
        assert_eq!(
            stringify(&serde_json::json!({"a": 1})),
            "{\"a\":1}"
        );
    }
}
