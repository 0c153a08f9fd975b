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

//! Weather value normalization.

use serde_json::Value;
use url::Url;

fn round_display(v: f64) -> String {
    format!("{}°F", v.round() as i64)
}

fn numeric_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Unknown-source numeric-or-preformatted-string normalization: a
/// `"30°F"`-suffixed string passes through, a bare number rounds to
/// whole degrees Fahrenheit, anything else gets the suffix appended.
/// Also used directly by the transcript grounder for the
/// `weather_api_fallback` path, which is always treated as wttr-style
/// regardless of provider shape.
pub fn wttr_style(value: &Value) -> Option<String> {
    if let Value::String(s) = value {
        let trimmed = s.trim();
        if trimmed.ends_with("°F") {
            return Some(trimmed.to_string());
        }
    }
    if let Some(v) = numeric_of(value) {
        return Some(round_display(v));
    }
    if let Value::String(s) = value {
        return Some(format!("{}°F", s.trim()));
    }
    None
}

/// Full branch selection used when `name == "weather_api"`: Open-Meteo
/// responses convert Celsius to Fahrenheit unless the request already
/// asked for Fahrenheit; anything else falls through to wttr-style.
/// `provider_url` is the provider's configured URL template
/// (pre-substitution is fine — only the host and presence of
/// `temperature_unit=fahrenheit` in the query string matter).
pub fn normalize_weather(value: &Value, provider_url: &str) -> Option<String> {
    let is_open_meteo = Url::parse(provider_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .map(|h| h.contains("open-meteo.com"))
        .unwrap_or_else(|| provider_url.to_lowercase().contains("open-meteo.com"));

    if is_open_meteo {
        let is_fahrenheit = provider_url.to_lowercase().contains("temperature_unit=fahrenheit");
        let v = numeric_of(value)?;
        if is_fahrenheit {
            return Some(round_display(v));
        }
        let f = v * 9.0 / 5.0 + 32.0;
        return Some(round_display(f));
    }

    wttr_style(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn open_meteo_celsius_converts_to_fahrenheit() {
        let url = "https://api.open-meteo.com/v1/forecast?current=temperature_2m&latitude={lat}&longitude={lon}";
        assert_eq!(
            normalize_weather(&json!(22.4), url).as_deref(),
            Some("72°F")
        );
    }

    #[test]
    fn open_meteo_fahrenheit_param_skips_conversion() {
        let url = "https://api.open-meteo.com/v1/forecast?temperature_unit=fahrenheit&latitude={lat}&longitude={lon}";
        assert_eq!(
            normalize_weather(&json!(72.0), url).as_deref(),
            Some("72°F")
        );
    }

    #[test]
    fn wttr_style_numeric_string() {
        assert_eq!(wttr_style(&json!("25")).as_deref(), Some("25°F"));
    }

    #[test]
    fn wttr_style_already_suffixed() {
        assert_eq!(wttr_style(&json!("30°F")).as_deref(), Some("30°F"));
    }
}
