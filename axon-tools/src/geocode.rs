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

//! Free-form place → (lat, lon) resolution.

use axon_core::ToolConfig;
use serde_json::Value;
use std::time::Duration;

use crate::fetch::{self, fetch_json, get_by_path, normalize_query, DEFAULT_TOOL_TIMEOUT};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Ordered-provider geocoder: each provider is tried once, first success
/// wins, and an individual provider's failure never aborts the chain.
pub struct Geocoder {
    client: reqwest::Client,
    /// The optional env-configured `geocode` tool provider.
    geocode_provider: Option<ToolConfig>,
    timeout: Duration,
}

impl Geocoder {
    pub fn new(client: reqwest::Client, geocode_provider: Option<ToolConfig>) -> Self {
        Self {
            client,
            geocode_provider,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub async fn geocode(&self, q: &str) -> Option<LatLon> {
        let q = normalize_query(q);
        if q.trim().is_empty() {
            return None;
        }

        if let Some(cfg) = &self.geocode_provider {
            match self.try_configured_provider(cfg, &q).await {
                Ok(Some(ll)) => return Some(ll),
                Ok(None) => {}
                Err(err) => tracing::debug!(provider = "geocode", error = %err, "geocode provider failed"),
            }
        }

        match self.try_open_meteo(&q).await {
            Ok(Some(ll)) => return Some(ll),
            Ok(None) => {}
            Err(err) => tracing::debug!(provider = "open-meteo", error = %err, "open-meteo geocoding failed"),
        }

        match self.try_nominatim(&q).await {
            Ok(Some(ll)) => return Some(ll),
            Ok(None) => {}
            Err(err) => tracing::debug!(provider = "nominatim", error = %err, "nominatim geocoding failed"),
        }

        None
    }

    /// Inspect the configured provider's response, trying each known
    /// response shape in turn: Open-Meteo-style `results[0]`, GeoJSON-style
    /// `features[0].geometry.coordinates`, then bare `lat`/`lon` fields.
    async fn try_configured_provider(
        &self,
        cfg: &ToolConfig,
        q: &str,
    ) -> Result<Option<LatLon>, fetch::FetchError> {
        let url = cfg.url.replace("{q}", &urlencoding::encode(q));
        let body = fetch_json(&self.client, &url, self.timeout).await?;

        if let (Some(lat), Some(lon)) = (
            get_by_path(&body, "results.0.latitude").and_then(Value::as_f64),
            get_by_path(&body, "results.0.longitude").and_then(Value::as_f64),
        ) {
            return Ok(Some(LatLon { lat, lon }));
        }

        if let Some(coords) = get_by_path(&body, "features.0.geometry.coordinates") {
            if let Some(arr) = coords.as_array() {
                if let (Some(lon), Some(lat)) = (
                    arr.first().and_then(Value::as_f64),
                    arr.get(1).and_then(Value::as_f64),
                ) {
                    return Ok(Some(LatLon { lat, lon }));
                }
            }
        }

        let lat = first_present(&body, &["lat", "latitude"]);
        let lon = first_present(&body, &["lon", "lng", "longitude"]);
        if let (Some(lat), Some(lon)) = (lat, lon) {
            return Ok(Some(LatLon { lat, lon }));
        }

        Ok(None)
    }

    async fn try_open_meteo(&self, q: &str) -> Result<Option<LatLon>, fetch::FetchError> {
        let url = format!(
            "https://geocoding-api.open-meteo.com/v1/search?name={}&count=1",
            urlencoding::encode(q)
        );
        let body = fetch_json(&self.client, &url, self.timeout).await?;
        let lat = get_by_path(&body, "results.0.latitude").and_then(Value::as_f64);
        let lon = get_by_path(&body, "results.0.longitude").and_then(Value::as_f64);
        Ok(match (lat, lon) {
            (Some(lat), Some(lon)) => Some(LatLon { lat, lon }),
            _ => None,
        })
    }

    async fn try_nominatim(&self, q: &str) -> Result<Option<LatLon>, fetch::FetchError> {
        let url = format!(
            "https://nominatim.openstreetmap.org/search?q={}&format=json&limit=1&addressdetails=0",
            urlencoding::encode(q)
        );
        let body = fetch_json(&self.client, &url, self.timeout).await?;
        let first = body.as_array().and_then(|a| a.first());
        let Some(first) = first else {
            return Ok(None);
        };
        let lat = first
            .get("lat")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok());
        let lon = first
            .get("lon")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok());
        Ok(match (lat, lon) {
            (Some(lat), Some(lon)) => Some(LatLon { lat, lon }),
            _ => None,
        })
    }
}

fn first_present(body: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|k| get_by_path(body, k).and_then(Value::as_f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_query_returns_none_immediately() {
        let geocoder = Geocoder::new(reqwest::Client::new(), None);
        assert_eq!(geocoder.geocode("   ").await, None);
    }
}
