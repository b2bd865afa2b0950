//! Jurisdiction discovery, authority scrape and procedure extraction

use crate::jurisdiction::JurisdictionResolver;
use crate::node::{truncate_chars, Node, NodeContext, NodeOutcome};
use foundry_core::{CampaignDiff, CampaignRecord, JurisdictionInfo};
use foundry_tools::format_hits;
use serde::Deserialize;
use tracing::{info, warn};

const WEBSITE_CONTEXT_CHARS: usize = 4000;
const NO_WEBSITE: &str = "Could not load website. Using default documents.";

const PROCEDURE_SCHEMA: &str = r#"{
  "registration_steps": ["ordered, actionable step for registering a startup, as found on the department's website"]
}"#;

#[derive(Debug, Default, Deserialize)]
struct ProcedureOutput {
    #[serde(default)]
    registration_steps: Vec<String>,
}

pub struct JurisdictionNode;

impl JurisdictionNode {
    async fn extract_procedure(
        &self,
        ctx: &NodeContext,
        authority: &JurisdictionInfo,
        record: &CampaignRecord,
        website: &str,
    ) -> foundry_llm::LlmResult<Vec<String>> {
        let location = record.location_or_default();
        let query = format!(
            "how to register startup company at {} {} step by step procedure requirements {}",
            authority.department_name,
            location,
            record.campaign_date_iso()
        );
        let search = match ctx.adapters.search.search(&query).await {
            Ok(hits) => format_hits(&hits),
            Err(e) => {
                warn!("Procedure search failed: {}", e);
                String::new()
            }
        };

        let website = if website.is_empty() {
            NO_WEBSITE
        } else {
            truncate_chars(website, WEBSITE_CONTEXT_CHARS)
        };

        let system = "You read government websites and extract registration procedures. Given \
                      content scraped from a department's website, extract the exact step-by-step \
                      procedure to register a startup or company there. Each step is one clear, \
                      actionable instruction.";
        let user = format!(
            "Department: {} ({})\nCountry: {location}\nStartup Topic: {}\n\n\
             --- WEBSITE CONTENT ---\n{website}\n\n\
             --- ADDITIONAL SEARCH RESULTS ---\n{search}\n\n\
             Extract the step-by-step registration procedure for this type of startup. Include \
             name reservation, document preparation, filing, fees and timelines.",
            authority.department_name,
            authority.department_url,
            record.topic_or_default(),
        );

        let output: ProcedureOutput = ctx.llm.extract(system, &user, PROCEDURE_SCHEMA).await?;
        Ok(output.registration_steps)
    }
}

#[async_trait::async_trait]
impl Node for JurisdictionNode {
    fn name(&self) -> &'static str {
        "jurisdiction_agent"
    }

    async fn run(&self, record: &CampaignRecord, ctx: &NodeContext) -> NodeOutcome {
        let location = record.location_or_default().trim();
        if location.is_empty() {
            info!("No location, skipping jurisdiction discovery");
            return NodeOutcome::Complete(CampaignDiff {
                jurisdiction_info: Some(JurisdictionInfo::not_applicable()),
                registration_procedure: Some(Vec::new()),
                ..Default::default()
            });
        }

        let resolver = JurisdictionResolver::from_context(ctx);
        let company = record.company_name.as_deref().unwrap_or("");
        let Some(resolved) = resolver.resolve(location, record.topic_or_default(), company).await else {
            return NodeOutcome::degraded(
                CampaignDiff {
                    jurisdiction_info: Some(JurisdictionInfo::unknown()),
                    registration_procedure: Some(Vec::new()),
                    ..Default::default()
                },
                format!("no registration authority found for {location}"),
            );
        };

        let authority = resolved.info;
        let raw = ctx.adapters.scraper.scrape_site(&authority.department_url).await;

        let mut diff = CampaignDiff {
            jurisdiction_info: Some(authority.clone()),
            raw_govt_content: Some(raw.clone()),
            ..Default::default()
        };

        match self.extract_procedure(ctx, &authority, record, &raw).await {
            Ok(steps) => {
                info!(steps = steps.len(), department = %authority.department_name, "Extracted procedure");
                diff.registration_procedure = Some(steps);
                NodeOutcome::Complete(diff)
            }
            Err(e) => {
                warn!("Procedure extraction failed: {}", e);
                diff.registration_procedure = Some(Vec::new());
                NodeOutcome::degraded(diff, format!("procedure extraction failed: {e}"))
            }
        }
    }
}
