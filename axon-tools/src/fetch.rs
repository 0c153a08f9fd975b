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

//! Shared HTTP fetch/placeholder-substitution helpers used by both
//! [`crate::registry::ToolRegistry`] and [`crate::geocode::Geocoder`].

use serde_json::Value;
use std::time::Duration;

pub const USER_AGENT: &str = "axon-trace-replayer/1.0";
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Normalize raw tool input into a query string: trim,
/// collapse interior whitespace, strip anything that isn't a letter,
/// digit, whitespace, `,`, `.`, or `-`.
pub fn normalize_query(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, ',' | '.' | '-'))
        .collect();

    filtered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// `getByPath(obj, path)`: dot-separated segments, numeric
/// segments index arrays, any missing link yields `None`.
pub fn get_by_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(arr) => {
                let idx: usize = segment.parse().ok()?;
                arr.get(idx)?
            }
            _ => return None,
        };
    }
    Some(current)
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("non-success status: {0}")]
    Status(reqwest::StatusCode),
    #[error("response was not valid JSON: {0}")]
    InvalidJson(String),
}

/// Issue the GET with the standard user-agent/accept headers and parse
/// the body as JSON.
pub async fn fetch_json(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Value, FetchError> {
    let resp = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .header("Accept", "application/json")
        .timeout(timeout)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(FetchError::Status(resp.status()));
    }

    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| FetchError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_collapses_whitespace_and_strips_symbols() {
        assert_eq!(normalize_query("  New   York!! "), "New York");
        assert_eq!(normalize_query("São Paulo, BR."), "São Paulo, BR.");
    }

    #[test]
    fn get_by_path_walks_arrays_and_objects() {
        let v = json!({"results": [{"latitude": 48.85, "longitude": 2.35}]});
        assert_eq!(
            get_by_path(&v, "results.0.latitude"),
            Some(&json!(48.85))
        );
        assert_eq!(get_by_path(&v, "results.9.latitude"), None);
        assert_eq!(get_by_path(&v, "results.0.missing"), None);
    }
}
