//! Adapter traits for every external service a campaign touches
//!
//! Nodes only see these traits. Each concrete adapter lives in its own file
//! under adapters/; tests swap in hand-written doubles.

use foundry_core::{DeliveryResult, Deployment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type AdapterResult<T> = Result<T, AdapterError>;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("{0} not found in environment variables")]
    NotConfigured(&'static str),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("page content too short ({0} chars)")]
    InsufficientContent(usize),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdapterError {
    /// Upstream HTTP status, when the failure carried one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// Render hits as a plain-text block for prompt context.
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("Title: {}\nURL: {}\nContent: {}", h.title, h.url, h.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait::async_trait]
pub trait SearchAdapter: Send + Sync {
    async fn search(&self, query: &str) -> AdapterResult<Vec<SearchHit>>;
}

// ---------------------------------------------------------------------------
// Scrape
// ---------------------------------------------------------------------------

/// Below this many characters the primary loader's output is not trusted.
pub const MIN_TRUSTED_CHARS: usize = 100;

#[async_trait::async_trait]
pub trait ScrapeAdapter: Send + Sync {
    /// Readable text of a page via the primary loader.
    async fn page_text(&self, url: &str) -> AdapterResult<String>;

    /// Raw HTTP fetch with a browser user agent, keeping only the main
    /// content region of the markup.
    async fn fallback_text(&self, url: &str) -> AdapterResult<String>;

    /// Full scrape of an authority's site. Never fails: both tiers failing
    /// yields an empty string.
    async fn scrape_site(&self, url: &str) -> String {
        match self.page_text(url).await {
            Ok(text) if text.chars().count() > MIN_TRUSTED_CHARS => {
                tracing::info!(url, chars = text.len(), "Scraped site");
                return text;
            }
            Ok(text) => tracing::debug!(url, chars = text.len(), "Primary loader output too short"),
            Err(e) => tracing::warn!(url, "Primary loader failed: {}", e),
        }
        match self.fallback_text(url).await {
            Ok(text) => {
                tracing::info!(url, chars = text.len(), "Scraped site (fallback)");
                text
            }
            Err(e) => {
                tracing::warn!(url, "Fallback scrape failed: {}", e);
                String::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait ImageAdapter: Send + Sync {
    /// URL of the best landscape photo for `query`, or `None` if nothing matched.
    async fn find_image(&self, query: &str) -> AdapterResult<Option<String>>;
}

// ---------------------------------------------------------------------------
// Notify
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> &str;

    /// Deliver one social post, with its image when one was generated.
    async fn deliver(
        &self,
        post_number: usize,
        text: &str,
        image_url: Option<&str>,
    ) -> AdapterResult<DeliveryResult>;
}

// ---------------------------------------------------------------------------
// Deploy
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait DeployAdapter: Send + Sync {
    async fn deploy(&self, project_name: &str, html: &str) -> AdapterResult<Deployment>;
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait ArtifactWriter: Send + Sync {
    /// Render a Markdown document and store it as `{slug}_brd.html`.
    async fn write_brd(&self, slug: &str, markdown: &str) -> AdapterResult<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Pages {
        primary: AdapterResult<String>,
        fallback: AdapterResult<String>,
        fallback_calls: Mutex<usize>,
    }

    fn ok(s: &str) -> AdapterResult<String> {
        Ok(s.to_string())
    }

    fn fail() -> AdapterResult<String> {
        Err(AdapterError::InvalidResponse("down".into()))
    }

    #[async_trait::async_trait]
    impl ScrapeAdapter for Pages {
        async fn page_text(&self, _url: &str) -> AdapterResult<String> {
            match &self.primary {
                Ok(s) => Ok(s.clone()),
                Err(_) => fail(),
            }
        }

        async fn fallback_text(&self, _url: &str) -> AdapterResult<String> {
            *self.fallback_calls.lock().unwrap() += 1;
            match &self.fallback {
                Ok(s) => Ok(s.clone()),
                Err(_) => fail(),
            }
        }
    }

    #[tokio::test]
    async fn long_primary_text_skips_fallback() {
        let long = "x".repeat(101);
        let pages = Pages { primary: ok(&long), fallback: ok("fb"), fallback_calls: Mutex::new(0) };
        assert_eq!(pages.scrape_site("https://a.gov").await, long);
        assert_eq!(*pages.fallback_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn exactly_threshold_is_not_trusted() {
        let pages = Pages { primary: ok(&"x".repeat(100)), fallback: ok("fallback text"), fallback_calls: Mutex::new(0) };
        assert_eq!(pages.scrape_site("https://a.gov").await, "fallback text");
    }

    #[tokio::test]
    async fn both_tiers_failing_yields_empty() {
        let pages = Pages { primary: fail(), fallback: fail(), fallback_calls: Mutex::new(0) };
        assert_eq!(pages.scrape_site("https://a.gov").await, "");
    }

    #[test]
    fn hits_render_in_order() {
        let hits = vec![
            SearchHit { title: "A".into(), url: "https://a".into(), content: "one".into() },
            SearchHit { title: "B".into(), url: "https://b".into(), content: "two".into() },
        ];
        let text = format_hits(&hits);
        assert!(text.find("one").unwrap() < text.find("two").unwrap());
        assert!(text.starts_with("Title: A"));
    }

    #[test]
    fn rejected_exposes_status() {
        let e = AdapterError::Rejected { status: 403, message: "forbidden".into() };
        assert_eq!(e.status_code(), Some(403));
        assert_eq!(e.to_string(), "forbidden");
        assert_eq!(AdapterError::NotConfigured("VERCEL_TOKEN").to_string(), "VERCEL_TOKEN not found in environment variables");
    }
}
