//! LLM Provider trait

use crate::types::{LlmRequest, StreamDelta};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Stream type for LLM responses
pub type LlmStream = Pin<Box<dyn Stream<Item = LlmResult<StreamDelta>> + Send>>;

/// LLM Provider trait
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Stream a completion response. If `cancel` is provided and triggered,
    /// the underlying HTTP connection is dropped and the stream yields `LlmError::Cancelled`.
    async fn complete_stream(
        &self,
        request: LlmRequest,
        cancel: Option<CancellationToken>,
    ) -> LlmResult<LlmStream>;

    /// Run a completion to the end and return the concatenated text.
    async fn complete(&self, request: LlmRequest) -> LlmResult<String> {
        let mut stream = self.complete_stream(request, None).await?;
        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            match delta? {
                StreamDelta::Text(t) => text.push_str(&t),
                StreamDelta::Done { .. } => break,
            }
        }
        Ok(text)
    }
}
