//! Foundry Tools - adapters for the external services a campaign uses
//!
//! Each adapter is a self-contained file in src/adapters/ implementing one
//! trait from [`adapter`]. [`create_default_adapters`] wires the real ones
//! from configuration and environment credentials.

pub mod adapter;
pub mod adapters;

pub use adapter::{
    format_hits, AdapterError, AdapterResult, ArtifactWriter, DeployAdapter, ImageAdapter,
    Notifier, ScrapeAdapter, SearchAdapter, SearchHit,
};
pub use adapters::render::{is_safe_artifact_name, slugify};

use adapters::{
    deploy::VercelDeployer, images::UnsplashImages, notify::{SlackWebhook, TelegramBot},
    render::HtmlArtifactWriter, scrape::WebScraper, search::TavilySearch,
};
use foundry_core::{Credentials, FoundryConfig};
use std::sync::Arc;

/// Every adapter a pipeline run needs, shared read-only across sessions.
#[derive(Clone)]
pub struct Adapters {
    pub search: Arc<dyn SearchAdapter>,
    pub scraper: Arc<dyn ScrapeAdapter>,
    pub images: Arc<dyn ImageAdapter>,
    /// Delivery channels; a channel without credentials is simply absent.
    pub notifiers: Vec<Arc<dyn Notifier>>,
    pub deployer: Arc<dyn DeployAdapter>,
    pub artifacts: Arc<dyn ArtifactWriter>,
}

/// Build the production adapters.
pub fn create_default_adapters(config: &FoundryConfig, creds: &Credentials) -> Adapters {
    let t = &config.timeouts;

    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(url) = &creds.slack_webhook_url {
        notifiers.push(Arc::new(SlackWebhook::new(url.clone(), t.webhook())));
    }
    if let (Some(token), Some(chat)) = (&creds.telegram_bot_token, &creds.telegram_chat_id) {
        notifiers.push(Arc::new(TelegramBot::new(token.clone(), chat.clone(), t.webhook())));
    }

    Adapters {
        search: Arc::new(TavilySearch::new(creds.tavily_api_key.clone(), t.search())),
        scraper: Arc::new(WebScraper::new(t.scrape(), t.scrape_fallback())),
        images: Arc::new(UnsplashImages::new(creds.unsplash_access_key.clone(), t.images())),
        notifiers,
        deployer: Arc::new(VercelDeployer::new(creds.vercel_token.clone(), t.deploy())),
        artifacts: Arc::new(HtmlArtifactWriter::new(config.output.dir.clone())),
    }
}
