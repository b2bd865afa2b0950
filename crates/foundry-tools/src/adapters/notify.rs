//! Social post delivery to Slack (incoming webhook) and Telegram (bot API)

use crate::adapter::{AdapterResult, Notifier};
use foundry_core::DeliveryResult;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Slack message body: a section plus an image block when an image exists.
pub fn slack_payload(post_number: usize, text: &str, image_url: Option<&str>) -> Value {
    match image_url {
        Some(url) => json!({
            "blocks": [
                { "type": "section", "text": { "type": "mrkdwn", "text": text } },
                { "type": "image", "image_url": url, "alt_text": format!("image_post_{}", post_number) }
            ]
        }),
        None => json!({ "text": text }),
    }
}

pub struct SlackWebhook {
    client: Client,
    webhook_url: String,
}

impl SlackWebhook {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SlackWebhook {
    fn channel(&self) -> &str {
        "slack"
    }

    async fn deliver(
        &self,
        post_number: usize,
        text: &str,
        image_url: Option<&str>,
    ) -> AdapterResult<DeliveryResult> {
        info!("Sending post {} to Slack", post_number);
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&slack_payload(post_number, text, image_url))
            .send()
            .await?;
        Ok(DeliveryResult {
            post_number,
            status: Some(resp.status().as_u16()),
            ..Default::default()
        })
    }
}

pub struct TelegramBot {
    client: Client,
    bot_token: String,
    chat_id: String,
    base_url: String,
}

impl TelegramBot {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            base_url: TELEGRAM_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramBot {
    fn channel(&self) -> &str {
        "telegram"
    }

    async fn deliver(
        &self,
        post_number: usize,
        text: &str,
        image_url: Option<&str>,
    ) -> AdapterResult<DeliveryResult> {
        info!("Sending post {} to Telegram", post_number);
        let request = match image_url {
            Some(photo) => self
                .client
                .post(format!("{}/bot{}/sendPhoto", self.base_url, self.bot_token))
                .form(&[("chat_id", self.chat_id.as_str()), ("caption", text), ("photo", photo)]),
            None => self
                .client
                .post(format!("{}/bot{}/sendMessage", self.base_url, self.bot_token))
                .form(&[("chat_id", self.chat_id.as_str()), ("text", text)]),
        };
        let response: Value = request.send().await?.json().await?;
        Ok(DeliveryResult {
            post_number,
            response: Some(response),
            ..Default::default()
        })
    }
}
