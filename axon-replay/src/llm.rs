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

//! The replay model call.
//!
//! One configured "mini model", blocking or streamed, with token usage the
//! caller can trust when the provider reports it.

use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// A streamed chat response delivers its deltas over an `mpsc` channel
/// (matching `LLMProvider::stream_chat`'s `Receiver<String>` idiom) and
/// settles into a final response once the channel closes.
pub struct StreamHandle {
    pub deltas: mpsc::Receiver<String>,
    pub final_usage: Option<(Option<u64>, Option<u64>)>,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> anyhow::Result<ChatResponse>;

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> anyhow::Result<mpsc::Receiver<String>>;
}

/// A provider that echoes the joined input back, for tests and for running
/// the coordinator without a live model configured.
pub struct EchoProvider;

#[async_trait]
impl LlmProvider for EchoProvider {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        _model: &str,
        _temperature: f64,
        _max_tokens: u32,
    ) -> anyhow::Result<ChatResponse> {
        let text = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(ChatResponse {
            text,
            input_tokens: None,
            output_tokens: None,
        })
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        _model: &str,
        _temperature: f64,
        _max_tokens: u32,
    ) -> anyhow::Result<mpsc::Receiver<String>> {
        let (tx, rx) = mpsc::channel(16);
        let text = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        tokio::spawn(async move {
            for word in text.split_whitespace() {
                let _ = tx.send(format!("{word} ")).await;
            }
        });
        Ok(rx)
    }
}
