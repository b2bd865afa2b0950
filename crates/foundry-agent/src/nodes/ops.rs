//! Distribution of the social posts to every configured channel

use crate::nodes::design::post_image_key;
use crate::node::{Node, NodeContext, NodeOutcome};
use foundry_core::{AutomationStatus, CampaignDiff, CampaignRecord, DeliveryResult};
use tracing::{info, warn};

pub struct OpsNode;

#[async_trait::async_trait]
impl Node for OpsNode {
    fn name(&self) -> &'static str {
        "ops_agent"
    }

    async fn run(&self, record: &CampaignRecord, ctx: &NodeContext) -> NodeOutcome {
        let mut status = AutomationStatus {
            status: "completed".into(),
            ..Default::default()
        };
        let mut failures = 0;

        for (i, post) in record.social_posts.iter().enumerate() {
            let post_number = i + 1;
            let text = post.content.trim();
            let image = record.generated_assets.get(&post_image_key(i)).map(String::as_str);

            for notifier in &ctx.adapters.notifiers {
                let result = match notifier.deliver(post_number, text, image).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(channel = notifier.channel(), post_number, "Delivery failed: {}", e);
                        failures += 1;
                        DeliveryResult {
                            post_number,
                            error: Some(e.to_string()),
                            ..Default::default()
                        }
                    }
                };
                match notifier.channel() {
                    "slack" => status.slack_results.push(result),
                    "telegram" => status.telegram_results.push(result),
                    other => warn!(channel = other, "Unknown delivery channel, result dropped"),
                }
            }
        }
        info!(
            posts = record.social_posts.len(),
            channels = ctx.adapters.notifiers.len(),
            failures,
            "Distribution finished"
        );

        NodeOutcome::Complete(CampaignDiff {
            automation_status: Some(status),
            ..Default::default()
        })
    }
}
