//! Static site deployment to Vercel

use crate::adapter::{AdapterError, AdapterResult, DeployAdapter};
use foundry_core::Deployment;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info};

const VERCEL_DEPLOYMENTS_URL: &str = "https://api.vercel.com/v13/deployments";

pub struct VercelDeployer {
    client: Client,
    token: Option<String>,
    base_url: String,
}

impl VercelDeployer {
    pub fn new(token: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
            token,
            base_url: VERCEL_DEPLOYMENTS_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Vercel reports hostnames without a scheme.
pub fn normalize_deployment_url(url: &str) -> String {
    if url.is_empty() || url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// One-file deployment body serving `html` as index.html.
pub fn deployment_payload(project_name: &str, html: &str) -> Value {
    json!({
        "name": project_name,
        "files": [ { "file": "index.html", "data": html } ],
        "projectSettings": { "framework": null }
    })
}

#[async_trait::async_trait]
impl DeployAdapter for VercelDeployer {
    async fn deploy(&self, project_name: &str, html: &str) -> AdapterResult<Deployment> {
        let token = self
            .token
            .as_deref()
            .ok_or(AdapterError::NotConfigured("VERCEL_TOKEN"))?;

        info!("Deploying {} ({} bytes)", project_name, html.len());

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(token)
            .json(&deployment_payload(project_name, html))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !matches!(status.as_u16(), 200 | 201) {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("Deployment failed")
                .to_string();
            error!("Vercel error {}: {}", status, message);
            return Err(AdapterError::Rejected { status: status.as_u16(), message });
        }

        Ok(Deployment {
            url: normalize_deployment_url(body["url"].as_str().unwrap_or_default()),
            id: body["id"].as_str().map(String::from),
            name: body["name"].as_str().map(String::from),
        })
    }
}
