//! Brand kit and stock imagery

use crate::node::{Node, NodeContext, NodeOutcome};
use foundry_core::{BrandKit, CampaignDiff, CampaignRecord};
use foundry_tools::adapters::images::{no_result_placeholder, ERROR_PLACEHOLDER};
use foundry_tools::ImageAdapter;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const BANNER_KEY: &str = "webinar_banner_url";

pub fn post_image_key(index: usize) -> String {
    format!("post_{}_image_url", index + 1)
}

pub fn brand_kit(topic: &str) -> BrandKit {
    BrandKit {
        logo_prompt: format!("A minimalist, tech-inspired logo for {topic}"),
        color_palette: ["#0A0A0A", "#FFFFFF", "#4F46E5", "#FBBF24", "#10B981"]
            .into_iter()
            .map(String::from)
            .collect(),
        font_pair: "Inter".into(),
    }
}

/// Image URL for `query`, or a placeholder. The flag reports a service error.
async fn image_or_placeholder(images: &dyn ImageAdapter, query: &str) -> (String, bool) {
    match images.find_image(query).await {
        Ok(Some(url)) => (url, false),
        Ok(None) => (no_result_placeholder(query), false),
        Err(e) => {
            warn!(query, "Image search failed: {}", e);
            (ERROR_PLACEHOLDER.to_string(), true)
        }
    }
}

pub struct DesignNode;

#[async_trait::async_trait]
impl Node for DesignNode {
    fn name(&self) -> &'static str {
        "design_agent"
    }

    async fn run(&self, record: &CampaignRecord, ctx: &NodeContext) -> NodeOutcome {
        let images = ctx.adapters.images.as_ref();
        let banner_query = [record.webinar_image_prompt.as_deref(), record.topic.as_deref()]
            .into_iter()
            .flatten()
            .find(|q| !q.trim().is_empty())
            .unwrap_or("abstract");

        let mut assets = BTreeMap::new();
        let mut failures = 0;

        let (banner, failed) = image_or_placeholder(images, banner_query).await;
        assets.insert(BANNER_KEY.to_string(), banner);
        failures += usize::from(failed);

        for (i, post) in record.social_posts.iter().enumerate() {
            let (url, failed) = image_or_placeholder(images, &post.image_prompt).await;
            assets.insert(post_image_key(i), url);
            failures += usize::from(failed);
        }
        info!(assets = assets.len(), failures, "Design assets ready");

        let diff = CampaignDiff {
            brand_kit: Some(brand_kit(record.topic_or_default())),
            generated_assets: Some(assets),
            ..Default::default()
        };
        if failures > 0 {
            NodeOutcome::degraded(diff, format!("{failures} image lookups failed"))
        } else {
            NodeOutcome::Complete(diff)
        }
    }
}
