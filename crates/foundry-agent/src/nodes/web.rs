//! Landing page for the campaign preview

use crate::landing::{display_company, generate_landing_page, LandingInputs};
use crate::node::{Node, NodeContext, NodeOutcome};
use chrono::Datelike;
use foundry_core::{CampaignDiff, CampaignRecord};
use tracing::{info, warn};

pub const PREVIEW_FILE: &str = "campaign_preview.html";

pub struct WebNode;

#[async_trait::async_trait]
impl Node for WebNode {
    fn name(&self) -> &'static str {
        "web_agent"
    }

    async fn run(&self, record: &CampaignRecord, ctx: &NodeContext) -> NodeOutcome {
        let inputs = LandingInputs {
            topic: record.topic_or_default().to_string(),
            company_name: display_company(record.company_name.as_deref(), record.topic.as_deref()),
            audience_persona: record.audience_persona.clone(),
            core_messaging: record.core_messaging.clone(),
            generated_assets: record.generated_assets.clone(),
        };
        let year = chrono::Local::now().year();

        match generate_landing_page(&ctx.llm, &inputs, year).await {
            Ok(html) => {
                info!(bytes = html.len(), "Landing page generated");
                NodeOutcome::Complete(CampaignDiff {
                    landing_page_code: Some(html),
                    landing_page_url: Some(PREVIEW_FILE.to_string()),
                    ..Default::default()
                })
            }
            Err(e) => {
                warn!("Landing page generation failed: {}", e);
                NodeOutcome::degraded(CampaignDiff::new(), format!("landing page generation failed: {e}"))
            }
        }
    }
}
