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

//! Decoding a node's `data`/`tokens` bag from however it was persisted.
//!
//! Upstream writers are not consistent about this: some persist `data`/
//! `tokens` as native JSON objects, others as a JSON-encoded string column.
//! This is the one place that ambiguity is resolved, so that everything
//! above the store boundary (`axon-graph`, `axon-replay`) operates on an
//! already-typed [`axon_core::Node`].

use axon_core::{Node, NodeData, TokenUsage};
use serde_json::Value;

use crate::error::StorageError;

/// Accept `field` as either a JSON object/array (already decoded) or a
/// string containing JSON text, and deserialize it into `T`.
fn decode_field<T: serde::de::DeserializeOwned + Default>(
    field: Option<&Value>,
) -> Result<T, StorageError> {
    match field {
        None | Some(Value::Null) => Ok(T::default()),
        Some(Value::String(s)) if s.is_empty() => Ok(T::default()),
        Some(Value::String(s)) => {
            serde_json::from_str(s).map_err(|e| StorageError::Decode(e.to_string()))
        }
        Some(other) => {
            serde_json::from_value(other.clone()).map_err(|e| StorageError::Decode(e.to_string()))
        }
    }
}

/// Re-decode a node's `data`/`tokens` fields in place, tolerating either
/// persisted shape. Everything else on `Node` is already typed by the time
/// it reaches this function (deserialized via `serde` from the store's
/// native row format).
pub fn redecode_node_bags(node: &mut Node, raw_data: Option<&Value>, raw_tokens: Option<&Value>) -> Result<(), StorageError> {
    if let Some(raw_data) = raw_data {
        node.data = decode_field::<NodeData>(Some(raw_data))?;
    }
    if let Some(raw_tokens) = raw_tokens {
        node.tokens = decode_field::<TokenUsage>(Some(raw_tokens))?;
        node.tokens.normalize();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_data_bag_from_json_encoded_string() {
        let raw = Value::String(r#"{"prompts":["hi"],"response":"there"}"#.to_string());
        let data: NodeData = decode_field(Some(&raw)).unwrap();
        assert_eq!(data.prompts, vec!["hi".to_string()]);
        assert_eq!(data.response.as_deref(), Some("there"));
    }

    #[test]
    fn decodes_tokens_bag_from_native_object() {
        let raw = serde_json::json!({"input": 5, "output": 7});
        let tokens: TokenUsage = decode_field(Some(&raw)).unwrap();
        assert_eq!(tokens.input, 5);
        assert_eq!(tokens.output, 7);
    }

    #[test]
    fn missing_field_defaults() {
        let data: NodeData = decode_field(None).unwrap();
        assert!(data.prompts.is_empty());
    }
}
