//! Webinar copy, social posts and the banner image query

use crate::node::{Node, NodeContext, NodeOutcome};
use foundry_core::{CampaignDiff, CampaignRecord, SocialPost, WebinarDetails};
use serde::Deserialize;
use tracing::{info, warn};

pub const SOCIAL_POST_COUNT: usize = 2;

const CONTENT_SCHEMA: &str = r#"{
  "webinar_details": { "title": "catchy, professional webinar title", "abstract": "2-3 sentence abstract" },
  "social_posts": [
    { "platform": "Instagram", "content": "post text", "image_prompt": "simple stock photo search keyword" },
    { "platform": "X/Twitter", "content": "post text", "image_prompt": "simple stock photo search keyword" }
  ],
  "webinar_image_prompt": "stock photo search query for the webinar banner"
}"#;

#[derive(Debug, Deserialize)]
struct ContentOutput {
    webinar_details: WebinarDetails,
    #[serde(default)]
    social_posts: Vec<SocialPost>,
    #[serde(default)]
    webinar_image_prompt: String,
}

pub struct ContentNode;

#[async_trait::async_trait]
impl Node for ContentNode {
    fn name(&self) -> &'static str {
        "content_agent"
    }

    async fn run(&self, record: &CampaignRecord, ctx: &NodeContext) -> NodeOutcome {
        let to_json = |v: Option<String>| v.unwrap_or_else(|| "{}".into());
        let persona = to_json(record.audience_persona.as_ref().and_then(|p| serde_json::to_string(p).ok()));
        let messaging = to_json(record.core_messaging.as_ref().and_then(|m| serde_json::to_string(m).ok()));

        let system = "You are a marketing copywriter. For each image_prompt, write a simple, \
                      effective stock photo search keyword.";
        let user = format!(
            "--- CAMPAIGN CONTEXT ---\nGoal: {}\nTopic: {}\nTarget Audience: {}\n\
             Audience Persona: {persona}\nCore Messaging: {messaging}\n\n\
             --- TASK ---\n\
             1. Webinar details: a catchy title and a 2-3 sentence abstract.\n\
             2. Social posts: exactly {SOCIAL_POST_COUNT} posts, one for Instagram and one for X/Twitter.\n\
             3. Webinar image prompt: a simple stock photo search query for the banner.",
            record.goal.as_deref().unwrap_or(""),
            record.topic_or_default(),
            record.target_audience.as_deref().unwrap_or(""),
        );

        let output: ContentOutput = match ctx.llm.extract(system, &user, CONTENT_SCHEMA).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Content generation failed: {}", e);
                return NodeOutcome::degraded(CampaignDiff::new(), format!("content generation failed: {e}"));
            }
        };

        let mut posts = output.social_posts;
        let generated = posts.len();
        posts.truncate(SOCIAL_POST_COUNT);
        info!(posts = posts.len(), title = %output.webinar_details.title, "Content generated");

        let diff = CampaignDiff {
            webinar_details: Some(output.webinar_details),
            social_posts: Some(posts),
            webinar_image_prompt: Some(output.webinar_image_prompt),
            ..Default::default()
        };
        if generated < SOCIAL_POST_COUNT {
            NodeOutcome::degraded(diff, format!("expected {SOCIAL_POST_COUNT} social posts, got {generated}"))
        } else {
            NodeOutcome::Complete(diff)
        }
    }
}
