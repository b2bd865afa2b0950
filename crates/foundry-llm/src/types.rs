//! LLM types for requests and streaming responses

use serde::{Deserialize, Serialize};

/// LLM request
#[derive(Clone, Debug, Serialize)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<LlmMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Ask the provider for a JSON object response.
    #[serde(skip)]
    pub json_mode: bool,
}

impl Default for LlmRequest {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            messages: Vec::new(),
            max_tokens: Some(4096),
            temperature: None,
            json_mode: false,
        }
    }
}

impl LlmRequest {
    /// Concatenated text of every message, for logging and test doubles.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Message in an LLM conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

/// Streaming delta from LLM
#[derive(Clone, Debug, PartialEq)]
pub enum StreamDelta {
    Text(String),
    Done { stop_reason: Option<String>, usage: Option<Usage> },
}

/// Token usage
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, alias = "prompt_tokens")]
    pub input_tokens: u32,
    #[serde(default, alias = "completion_tokens")]
    pub output_tokens: u32,
}
