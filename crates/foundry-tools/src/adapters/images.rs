//! Unsplash stock photo search

use crate::adapter::{AdapterError, AdapterResult, ImageAdapter};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const UNSPLASH_API_URL: &str = "https://api.unsplash.com/search/photos";

/// Shown when an image search comes back empty.
pub fn no_result_placeholder(query: &str) -> String {
    format!(
        "https://placehold.co/800x400/CCCCCC/FFFFFF?text=No+Image+For+{}",
        query.replace(' ', "+")
    )
}

/// Shown when the image service fails outright.
pub const ERROR_PLACEHOLDER: &str = "https://placehold.co/800x400/FF0000/FFFFFF?text=Error";

pub struct UnsplashImages {
    client: Client,
    access_key: Option<String>,
    base_url: String,
}

impl UnsplashImages {
    pub fn new(access_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
            access_key,
            base_url: UNSPLASH_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Deserialize)]
struct SearchPhotos {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[async_trait::async_trait]
impl ImageAdapter for UnsplashImages {
    async fn find_image(&self, query: &str) -> AdapterResult<Option<String>> {
        let key = self
            .access_key
            .as_deref()
            .ok_or(AdapterError::NotConfigured("UNSPLASH_ACCESS_KEY"))?;

        debug!("Image search: {}", query);

        let response = self
            .client
            .get(&self.base_url)
            .header("Authorization", format!("Client-ID {}", key))
            .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")])
            .send()
            .await?
            .error_for_status()?;

        let body: SearchPhotos = response
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;

        let url = body.results.into_iter().next().map(|p| p.urls.regular);
        if url.is_none() {
            warn!("No image results for '{}'", query);
        }
        Ok(url)
    }
}
