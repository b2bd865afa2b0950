//! Business requirements document, rendered to the output directory

use crate::node::{Node, NodeContext, NodeOutcome};
use foundry_core::{CampaignDiff, CampaignRecord};
use foundry_tools::slugify;
use tracing::{info, warn};

const NO_STRATEGY: &str = "# Strategic Approach\n\nNo strategy available.";

const BRD_SYSTEM: &str = "You are a Senior Product Manager. Write a complete, well-structured \
                          Business Requirements Document based on the strategy. Use clean Markdown \
                          with # and ## headings, bullet points and numbered lists. Respond ONLY with \
                          the Markdown, starting with '# Business Requirements Document'.";

const BRD_STRUCTURE: &str = "# Business Requirements Document\n\n\
## Executive Summary\n(Brief overview of the project/product)\n\n\
## 1. Project Overview\n### 1.1 Objectives\n### 1.2 Scope\n\n\
## 2. Business Requirements\n### 2.1 Functional Requirements\n### 2.2 Non-Functional Requirements\n\n\
## 3. Success Metrics & KPIs\n## 4. Timeline & Milestones\n## 5. Risk Assessment";

pub struct BrdNode;

#[async_trait::async_trait]
impl Node for BrdNode {
    fn name(&self) -> &'static str {
        "brd_agent"
    }

    async fn run(&self, record: &CampaignRecord, ctx: &NodeContext) -> NodeOutcome {
        let strategy = record
            .strategy_markdown
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(NO_STRATEGY);
        let user = format!(
            "Based on the following strategic approach, generate a comprehensive Business \
             Requirements Document in Markdown:\n\n--- STRATEGIC APPROACH ---\n{strategy}\n\n\
             --- BRD STRUCTURE (to follow) ---\n{BRD_STRUCTURE}\n\n\
             Generate the full BRD with substantial content for each section."
        );

        let markdown = match ctx.llm.generate(BRD_SYSTEM, &user).await {
            Ok(markdown) => markdown,
            Err(e) => {
                warn!("BRD generation failed: {}", e);
                return NodeOutcome::degraded(CampaignDiff::new(), format!("BRD generation failed: {e}"));
            }
        };

        let slug = slugify(record.topic.as_deref());
        match ctx.adapters.artifacts.write_brd(&slug, &markdown).await {
            Ok(path) => {
                info!(path = %path.display(), "BRD written");
                NodeOutcome::Complete(CampaignDiff {
                    brd_url: Some(path.display().to_string()),
                    ..Default::default()
                })
            }
            Err(e) => {
                warn!("BRD render failed: {}", e);
                NodeOutcome::degraded(CampaignDiff::new(), format!("BRD render failed: {e}"))
            }
        }
    }
}
