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

//! The model pricing table.
//!
//! Deliberately a fixed table, not a dynamic registry: the fallback rate
//! intentionally equals the `gpt-4o` rate so unknown models still receive
//! non-zero attribution.

use serde::{Deserialize, Serialize};

/// USD cost per 1,000 tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

const CHEAP: Price = Price {
    input_per_1k: 0.0005,
    output_per_1k: 0.0015,
};

const STANDARD: Price = Price {
    input_per_1k: 0.005,
    output_per_1k: 0.015,
};

/// Resolve pricing for a model string. Matching is
/// case-insensitive substring matching in the order the table lists.
pub fn pricing(model: Option<&str>) -> Price {
    let Some(model) = model else {
        return STANDARD;
    };
    let lower = model.to_lowercase();

    if lower.contains("3.5") {
        return CHEAP;
    }
    if lower.contains("4o-mini") {
        return STANDARD;
    }
    if lower.contains("4o") {
        return STANDARD;
    }
    if lower.contains("4-turbo") || lower == "gpt-4" || lower.contains("gpt-4") {
        return STANDARD;
    }
    STANDARD
}

impl Price {
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let raw = (input_tokens as f64 / 1000.0) * self.input_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_per_1k;
        round6(raw)
    }
}

/// Round to 6 decimal places for display.
pub fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpt_35_is_cheap() {
        let p = pricing(Some("gpt-3.5-turbo"));
        assert_eq!(p.input_per_1k, 0.0005);
    }

    #[test]
    fn gpt_4o_mini_is_standard() {
        let p = pricing(Some("gpt-4o-mini"));
        assert_eq!(p.input_per_1k, 0.005);
    }

    #[test]
    fn unknown_model_defaults_to_standard() {
        let p = pricing(Some("some-unheard-of-model"));
        assert_eq!(p, STANDARD);
    }

    #[test]
    fn missing_model_defaults_to_standard() {
        assert_eq!(pricing(None), STANDARD);
    }

    #[test]
    fn gpt_4o_mini_cost_accumulates_across_calls() {
        let p = pricing(Some("gpt-4o-mini"));
        assert_eq!(p.cost(30, 40), 0.00075);
        assert_eq!(p.cost(50, 60), 0.00115);
    }
}
