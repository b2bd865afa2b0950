//! Strategic approach drafted from the validated research

use crate::node::{Node, NodeContext, NodeOutcome};
use foundry_core::{CampaignDiff, CampaignRecord};
use tracing::warn;

const STRATEGY_SYSTEM: &str = "You are a Chief Strategist. Write a high-level strategic plan as a \
                               single Markdown document with clear headings and bullet points. \
                               Respond ONLY with the Markdown, starting with '# Strategic Approach'.";

pub struct StrategyNode;

#[async_trait::async_trait]
impl Node for StrategyNode {
    fn name(&self) -> &'static str {
        "strategy_agent"
    }

    async fn run(&self, record: &CampaignRecord, ctx: &NodeContext) -> NodeOutcome {
        let user = format!(
            "Generate a strategic approach for the following goal. Break it into 3-5 key phases. \
             For each phase, describe how to approach it.\n\n\
             - **Project Topic:** {}\n- **Primary Goal:** {}",
            record.topic_or_default(),
            record.goal.as_deref().unwrap_or(""),
        );
        match ctx.llm.generate(STRATEGY_SYSTEM, &user).await {
            Ok(markdown) => NodeOutcome::Complete(CampaignDiff {
                strategy_markdown: Some(markdown.trim().to_string()),
                ..Default::default()
            }),
            Err(e) => {
                warn!("Strategy generation failed: {}", e);
                NodeOutcome::degraded(CampaignDiff::new(), format!("strategy generation failed: {e}"))
            }
        }
    }
}
