//! Tavily web search

use crate::adapter::{AdapterError, AdapterResult, SearchAdapter, SearchHit};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: u32 = 5;

pub struct TavilySearch {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl TavilySearch {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
            api_key,
            base_url: TAVILY_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[async_trait::async_trait]
impl SearchAdapter for TavilySearch {
    async fn search(&self, query: &str) -> AdapterResult<Vec<SearchHit>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AdapterError::NotConfigured("TAVILY_API_KEY"))?;

        debug!("Search: {}", query);

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(api_key)
            .json(&SearchRequest { query, max_results: MAX_RESULTS })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Search error {}: {}", status, message);
            return Err(AdapterError::Rejected { status: status.as_u16(), message });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;
        debug!("Search returned {} hits", body.results.len());
        Ok(body.results)
    }
}
