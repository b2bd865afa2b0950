//! OpenAI-compatible chat completions provider (Groq) with SSE streaming

use crate::provider::{LlmError, LlmProvider, LlmResult, LlmStream};
use crate::types::{LlmMessage, LlmRequest, StreamDelta, Usage};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

pub struct OpenAiCompatProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: GROQ_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound the whole request, body stream included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder().timeout(timeout).build().unwrap_or_default();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn complete_stream(
        &self,
        request: LlmRequest,
        cancel: Option<CancellationToken>,
    ) -> LlmResult<LlmStream> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::NotConfigured("GROQ_API_KEY".into()));
        }

        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
            response_format: request
                .json_mode
                .then(|| ResponseFormat { kind: "json_object" }),
        };

        debug!("Chat request: model={} messages={}", body.model, body.messages.len());

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Chat completions error {}: {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthFailed(error_text),
                429 => LlmError::RateLimited { retry_after_ms: 60000 },
                _ => LlmError::RequestFailed(format!("{}: {}", status, error_text)),
            });
        }

        let stream = parse_sse_stream(response.bytes_stream(), cancel.unwrap_or_default());
        Ok(Box::pin(stream))
    }
}

/// Turn a chat-completions SSE byte stream into deltas. Ends with exactly one
/// `Done` unless the stream errors or is cancelled first.
pub(crate) fn parse_sse_stream<S, B, E>(
    bytes_stream: S,
    cancel: CancellationToken,
) -> impl futures::Stream<Item = LlmResult<StreamDelta>> + Send
where
    S: futures::Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    async_stream::stream! {
        // Raw bytes: a multi-byte character may straddle two chunks.
        let mut buffer: Vec<u8> = Vec::new();
        let mut stop_reason: Option<String> = None;
        let mut usage: Option<Usage> = None;

        tokio::pin!(bytes_stream);

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => None,
                next = bytes_stream.next() => Some(next),
            };

            let chunk = match next {
                None => {
                    yield Err(LlmError::Cancelled);
                    return;
                }
                Some(None) => break,
                Some(Some(Ok(c))) => c,
                Some(Some(Err(e))) => {
                    yield Err(LlmError::StreamError(e.to_string()));
                    return;
                }
            };

            buffer.extend(chunk.as_ref().iter().copied().filter(|&b| b != b'\r'));

            while let Some(event_end) = buffer.windows(2).position(|w| w == b"\n\n") {
                let event: Vec<u8> = buffer.drain(..event_end + 2).collect();
                let event_str = match std::str::from_utf8(&event[..event_end]) {
                    Ok(s) => s,
                    Err(e) => {
                        debug!("Skipping non-UTF-8 SSE event: {}", e);
                        continue;
                    }
                };

                let data = event_str
                    .lines()
                    .filter_map(|line| line.strip_prefix("data:"))
                    .map(str::trim_start)
                    .collect::<Vec<_>>()
                    .join("\n");

                if data.is_empty() { continue; }

                if data == "[DONE]" {
                    yield Ok(StreamDelta::Done { stop_reason: stop_reason.take(), usage: usage.take() });
                    return;
                }

                match serde_json::from_str::<ChatChunk>(&data) {
                    Ok(chunk) => {
                        if let Some(err) = chunk.error {
                            yield Err(LlmError::StreamError(err.message));
                            return;
                        }
                        if chunk.usage.is_some() {
                            usage = chunk.usage;
                        }
                        for choice in chunk.choices {
                            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                                yield Ok(StreamDelta::Text(text));
                            }
                            if choice.finish_reason.is_some() {
                                stop_reason = choice.finish_reason;
                            }
                        }
                    }
                    Err(e) => debug!("Skipping unparseable SSE data: {}", e),
                }
            }
        }

        // Some servers close without the [DONE] sentinel.
        yield Ok(StreamDelta::Done { stop_reason, usage });
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [LlmMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&str]) -> impl futures::Stream<Item = Result<Vec<u8>, std::io::Error>> + Send + 'static {
        let owned: Vec<Result<Vec<u8>, std::io::Error>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        futures::stream::iter(owned)
    }

    async fn collect(parts: &[&str]) -> Vec<LlmResult<StreamDelta>> {
        parse_sse_stream(chunks(parts), CancellationToken::new()).collect().await
    }

    #[tokio::test]
    async fn parses_text_deltas_and_done() {
        let out = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        ])
        .await;
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap(), &StreamDelta::Text("Hel".into()));
        assert_eq!(out[1].as_ref().unwrap(), &StreamDelta::Text("lo".into()));
        match out[2].as_ref().unwrap() {
            StreamDelta::Done { stop_reason, .. } => assert_eq!(stop_reason.as_deref(), Some("stop")),
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn events_split_across_chunks() {
        let out = collect(&[
            "data: {\"choices\":[{\"delta\":",
            "{\"content\":\"ok\"}}]}\r\n\r\n",
            "data: [DONE]\n\n",
        ])
        .await;
        assert_eq!(out[0].as_ref().unwrap(), &StreamDelta::Text("ok".into()));
        assert!(matches!(out[1], Ok(StreamDelta::Done { .. })));
    }

    #[tokio::test]
    async fn multibyte_character_split_across_chunks() {
        let event = "data: {\"choices\":[{\"delta\":{\"content\":\"Ministère ₹\"}}]}\n\n".as_bytes();
        // Cut between the two bytes of 'è'.
        let cut = event.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let parts: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(event[..cut].to_vec()),
            Ok(event[cut..].to_vec()),
            Ok(b"data: [DONE]\n\n".to_vec()),
        ];
        let out: Vec<_> = parse_sse_stream(futures::stream::iter(parts), CancellationToken::new())
            .collect()
            .await;
        assert_eq!(out[0].as_ref().unwrap(), &StreamDelta::Text("Ministère ₹".into()));
        assert!(matches!(out[1], Ok(StreamDelta::Done { .. })));
    }

    #[tokio::test]
    async fn missing_done_sentinel_still_terminates() {
        let out = collect(&["data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\n"]).await;
        assert_eq!(out.len(), 2);
        assert!(matches!(out[1], Ok(StreamDelta::Done { .. })));
    }

    #[tokio::test]
    async fn error_payload_surfaces_as_stream_error() {
        let out = collect(&["data: {\"error\":{\"message\":\"over capacity\"}}\n\n"]).await;
        assert!(matches!(&out[0], Err(LlmError::StreamError(m)) if m == "over capacity"));
    }

    #[tokio::test]
    async fn blank_key_is_not_configured() {
        let provider = OpenAiCompatProvider::new("  ").with_base_url("http://127.0.0.1:9");
        let result = provider.complete_stream(LlmRequest::default(), None).await;
        assert!(matches!(result, Err(LlmError::NotConfigured(ref k)) if k == "GROQ_API_KEY"));
    }

    #[tokio::test]
    async fn cancelled_token_stops_stream() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out: Vec<_> = parse_sse_stream(futures::stream::pending::<Result<Vec<u8>, std::io::Error>>(), cancel)
            .collect()
            .await;
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(LlmError::Cancelled)));
    }
}
