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

//! `TranscriptGrounder`.
//!
//! Two left-to-right, one-pass-each scans over model text: Action/
//! Observation blocks, then unresolved weather phrases. Neither pass
//! re-enters the scanner.

use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

use crate::calculator;
use crate::providers::{RESERVED_WEATHER, RESERVED_WEATHER_FALLBACK};
use crate::registry::ToolRegistry;
use crate::weather::wttr_style;

pub struct TranscriptGrounder {
    registry: Arc<ToolRegistry>,
}

fn action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)Action:[ \t]*([A-Za-z0-9_\-]+)[ \t]*\n+Action Input:[ \t]*([^\n]*)(?:\n+Observation:[ \t]*[^\n]*)?",
        )
        .unwrap()
    })
}

fn weather_phrase_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)((?:current )?weather in ([\p{L}][\p{L} ]*?) is )(?:\.\.\.|unknown|not available|tbd)",
        )
        .unwrap()
    })
}

impl TranscriptGrounder {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Run both passes over `text` and return the grounded transcript.
    /// Idempotent once no unresolved Action blocks or weather phrases
    /// remain — grounding an already-grounded transcript is a no-op.
    pub async fn ground(&self, text: &str) -> String {
        let after_actions = self.apply_action_pass(text).await;
        self.apply_weather_phrase_pass(&after_actions).await
    }

    async fn apply_action_pass(&self, text: &str) -> String {
        let re = action_regex();
        let mut out = String::new();
        let mut last_end = 0;

        for caps in re.captures_iter(text) {
            let whole = caps.get(0).unwrap();
            out.push_str(&text[last_end..whole.start()]);

            let name = caps.get(1).unwrap().as_str();
            let input = caps.get(2).unwrap().as_str().trim();
            let observation = self.run_tool_for_action(name, input).await;

            out.push_str(&format!(
                "Action: {}\nAction Input: {}\nObservation: {}\n",
                name, input, observation
            ));
            last_end = whole.end();
        }
        out.push_str(&text[last_end..]);
        out
    }

    async fn run_tool_for_action(&self, name: &str, input: &str) -> String {
        if name.eq_ignore_ascii_case("calculator") {
            return calculator::evaluate(input);
        }

        let result = if name == RESERVED_WEATHER {
            self.weather_with_fallback(input).await
        } else {
            self.registry.run_external_tool(name, input).await
        };

        match result {
            Some(v) => v,
            None => format!(
                "(tool \"{}\" not executed during replay — result unavailable)",
                name
            ),
        }
    }

    /// `weather_api`, falling back to `weather_api_fallback` with
    /// wttr-style normalization.
    async fn weather_with_fallback(&self, q: &str) -> Option<String> {
        if let Some(v) = self.registry.run_external_tool(RESERVED_WEATHER, q).await {
            return Some(v);
        }
        let fallback_raw = self
            .registry
            .run_external_tool(RESERVED_WEATHER_FALLBACK, q)
            .await?;
        wttr_style(&Value::String(fallback_raw))
    }

    async fn apply_weather_phrase_pass(&self, text: &str) -> String {
        let re = weather_phrase_regex();
        let mut out = String::new();
        let mut last_end = 0;

        for caps in re.captures_iter(text) {
            let whole = caps.get(0).unwrap();
            out.push_str(&text[last_end..whole.start()]);

            let prefix = caps.get(1).unwrap().as_str();
            let city = caps.get(2).unwrap().as_str().trim();

            let value = self.weather_with_fallback(city).await;
            match value {
                Some(v) => out.push_str(&format!("{}{}", prefix, v)),
                None => out.push_str(&format!("{}(unavailable)", prefix)),
            }
            last_end = whole.end();
        }
        out.push_str(&text[last_end..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ToolProviders;

    fn grounder() -> TranscriptGrounder {
        TranscriptGrounder::new(Arc::new(ToolRegistry::new(ToolProviders::empty())))
    }

    #[tokio::test]
    async fn calculator_action_is_grounded_inline() {
        let g = grounder();
        let text = "Action: calculator\nAction Input: 2+2\n";
        let grounded = g.ground(text).await;
        assert!(grounded.contains("Observation: The result of 2+2 is 4."));
    }

    #[tokio::test]
    async fn unknown_tool_yields_not_executed_marker() {
        let g = grounder();
        let text = "Action: search\nAction Input: rust async book\n";
        let grounded = g.ground(text).await;
        assert!(grounded.contains("not executed during replay"));
    }

    #[tokio::test]
    async fn weather_phrase_without_provider_becomes_unavailable() {
        let g = grounder();
        let text = "The current weather in Paris is ...";
        let grounded = g.ground(text).await;
        assert_eq!(grounded, "The current weather in Paris is (unavailable)");
    }

    #[tokio::test]
    async fn ground_is_idempotent_on_already_grounded_text() {
        let g = grounder();
        let text = "Action: calculator\nAction Input: 2+2\n";
        let once = g.ground(text).await;
        let twice = g.ground(&once).await;
        assert_eq!(once, twice);
    }
}
