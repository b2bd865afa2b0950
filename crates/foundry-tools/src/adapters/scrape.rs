//! Web page loading: a primary text loader and a raw-HTTP fallback

use crate::adapter::{AdapterError, AdapterResult, ScrapeAdapter};
use html2text::from_read;
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const TEXT_WIDTH: usize = 120;

pub struct WebScraper {
    primary: Client,
    fallback: Client,
}

impl WebScraper {
    pub fn new(timeout: Duration, fallback_timeout: Duration) -> Self {
        Self {
            primary: Client::builder().timeout(timeout).build().unwrap_or_default(),
            fallback: Client::builder()
                .timeout(fallback_timeout)
                .user_agent(BROWSER_USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn fetch(client: &Client, url: &str) -> AdapterResult<String> {
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Rejected {
                status: status.as_u16(),
                message: format!("HTTP {}", status),
            });
        }
        let body = response.text().await?;
        Ok(body.strip_prefix('\u{FEFF}').map(str::to_string).unwrap_or(body))
    }
}

#[async_trait::async_trait]
impl ScrapeAdapter for WebScraper {
    async fn page_text(&self, url: &str) -> AdapterResult<String> {
        let body = Self::fetch(&self.primary, url).await?;
        Ok(if looks_like_html(&body) { html_to_text(&body) } else { body })
    }

    async fn fallback_text(&self, url: &str) -> AdapterResult<String> {
        let body = Self::fetch(&self.fallback, url).await?;
        let region = main_content(&body).unwrap_or(&body);
        let text = html_to_text(region);
        if text.trim().is_empty() {
            return Err(AdapterError::InsufficientContent(0));
        }
        Ok(text)
    }
}

/// Readable text from markup; falls back to tag stripping when the
/// converter fails or produces nothing.
pub fn html_to_text(html: &str) -> String {
    match from_read(html.as_bytes(), TEXT_WIDTH) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => strip_html_tags(html),
    }
}

fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    let head: String = s.chars().take(15).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!") || head.starts_with("<html")
        || (s.len() > 20 && s.contains('<') && (s.contains("</") || s.contains("<meta") || s.contains("<head")))
}

fn region_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ["main", "article", "body"].map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>(.*)</{tag}\s*>")).unwrap()
        })
    })
}

/// Inner markup of the first of `<main>`, `<article>`, `<body>` present.
pub fn main_content(html: &str) -> Option<&str> {
    region_patterns().iter().find_map(|re| {
        re.captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|s| !s.trim().is_empty())
    })
}
