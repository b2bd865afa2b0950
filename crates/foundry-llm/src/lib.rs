//! Foundry LLM - Chat completion provider with streaming, plus structured extraction

pub mod extract;
pub mod openai_compat;
pub mod provider;
pub mod types;

pub use extract::{find_json_object, parse_json_reply, strip_code_fences, Extractor};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{LlmError, LlmProvider, LlmResult, LlmStream};
pub use tokio_util::sync::CancellationToken;
pub use types::*;
