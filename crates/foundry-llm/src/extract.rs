//! Structured extraction and free-form generation on top of a provider
//!
//! Every agent call funnels through [`Extractor`]: it builds the request from
//! the configured model, applies the call timeout, and for structured calls
//! parses the reply into a typed value.

use crate::provider::{LlmError, LlmProvider, LlmResult};
use crate::types::{LlmMessage, LlmRequest};
use foundry_core::config::LlmConfig;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Extractor {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl Extractor {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &LlmConfig, timeout: Duration) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: u32::try_from(config.max_tokens).unwrap_or(u32::MAX),
            timeout,
        }
    }

    /// Same provider and model at a different sampling temperature.
    pub fn with_temperature(&self, temperature: f32) -> Self {
        Self { temperature, ..self.clone() }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    fn request(&self, system: &str, user: &str, json_mode: bool) -> LlmRequest {
        LlmRequest {
            model: self.model.clone(),
            messages: vec![LlmMessage::system(system), LlmMessage::user(user)],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            json_mode,
        }
    }

    async fn run(&self, request: LlmRequest) -> LlmResult<String> {
        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Free-form text generation.
    pub async fn generate(&self, system: &str, user: &str) -> LlmResult<String> {
        let text = self.run(self.request(system, user, false)).await?;
        if text.trim().is_empty() {
            return Err(LlmError::InvalidResponse("empty completion".into()));
        }
        Ok(text)
    }

    /// Ask for a JSON object shaped like `schema` and parse it into `T`.
    pub async fn extract<T: DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
        schema: &str,
    ) -> LlmResult<T> {
        let system = format!(
            "{system}\n\nRespond with a single JSON object and nothing else. \
             It must match this shape:\n{schema}"
        );
        let text = self.run(self.request(&system, user, true)).await?;
        parse_json_reply(&text)
    }
}

/// Parse a model reply that should contain one JSON object, tolerating code
/// fences and chatter around it.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> LlmResult<T> {
    let body = strip_code_fences(text);
    match serde_json::from_str(body) {
        Ok(v) => Ok(v),
        Err(first) => {
            let Some(candidate) = find_json_object(body) else {
                warn!("No JSON object in reply: {}", first);
                return Err(LlmError::InvalidResponse(first.to_string()));
            };
            debug!("Retrying parse on embedded JSON object");
            serde_json::from_str(candidate).map_err(|e| LlmError::InvalidResponse(e.to_string()))
        }
    }
}

/// Strip one surrounding Markdown code fence (with optional language tag).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Slice from the first `{` to the last `}`.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
