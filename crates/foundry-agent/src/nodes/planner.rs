//! Brief → structured plan

use crate::node::{today, Node, NodeContext, NodeOutcome};
use foundry_core::protocol::parse_campaign_date;
use foundry_core::{CampaignDiff, CampaignRecord};
use foundry_llm::{Extractor, LlmResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const PLANNER_SCHEMA: &str = r#"{
  "goal": "primary objective, e.g. 'Launch a webinar'",
  "topic": "main subject or product feature",
  "target_audience": "specific user persona, e.g. 'VPs of Engineering'",
  "company_name": "company or brand name if present in the brief, else null",
  "source_docs_url": "URL of source content if provided, else null",
  "campaign_date": "target date as YYYY-MM-DD if inferable, else null",
  "location": "country or region if present in the brief, else null"
}"#;

/// The plan inferred from a free-text brief.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerOutput {
    pub goal: Option<String>,
    pub topic: Option<String>,
    pub target_audience: Option<String>,
    pub company_name: Option<String>,
    pub source_docs_url: Option<String>,
    /// Normalized to YYYY-MM-DD; anything unparseable is dropped.
    pub campaign_date: Option<String>,
    pub location: Option<String>,
}

/// Run the planner prompt alone. Also backs the plan-preview endpoint.
pub async fn infer_plan(llm: &Extractor, brief: &str) -> LlmResult<PlannerOutput> {
    let system = format!(
        "You are an expert parsing assistant inside an automated workflow. Your only job is \
         to parse an unstructured campaign brief into a structured object. Today's date is {}.",
        today()
    );
    let user = format!("Parse the following campaign brief:\n\n{brief}");
    let mut plan: PlannerOutput = llm.extract(&system, &user, PLANNER_SCHEMA).await?;
    plan.campaign_date = plan
        .campaign_date
        .as_deref()
        .and_then(parse_campaign_date)
        .map(|d| d.to_string());
    Ok(plan)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

/// Client-supplied fields win over generated ones.
fn merge_plan(record: &CampaignRecord, plan: PlannerOutput) -> CampaignDiff {
    let pick = |client: &Option<String>, generated: &Option<String>| {
        non_empty(client).or_else(|| non_empty(generated))
    };
    CampaignDiff {
        goal: pick(&record.goal, &plan.goal),
        topic: pick(&record.topic, &plan.topic),
        target_audience: pick(&record.target_audience, &plan.target_audience),
        company_name: pick(&record.company_name, &plan.company_name),
        source_docs_url: pick(&record.source_docs_url, &plan.source_docs_url),
        campaign_date: record
            .campaign_date
            .or_else(|| plan.campaign_date.as_deref().and_then(parse_campaign_date)),
        location: pick(&record.location, &plan.location),
        ..Default::default()
    }
}

fn passthrough(record: &CampaignRecord) -> CampaignDiff {
    CampaignDiff {
        goal: record.goal.clone(),
        topic: record.topic.clone(),
        target_audience: record.target_audience.clone(),
        company_name: record.company_name.clone(),
        source_docs_url: record.source_docs_url.clone(),
        campaign_date: record.campaign_date,
        location: record.location.clone(),
        ..Default::default()
    }
}

pub struct PlannerNode;

#[async_trait::async_trait]
impl Node for PlannerNode {
    fn name(&self) -> &'static str {
        "planner_agent"
    }

    async fn run(&self, record: &CampaignRecord, ctx: &NodeContext) -> NodeOutcome {
        if record.has_plan() {
            info!("Using client-supplied plan, skipping inference");
            return NodeOutcome::Complete(passthrough(record));
        }

        match infer_plan(&ctx.llm, &record.initial_prompt).await {
            Ok(plan) => NodeOutcome::Complete(merge_plan(record, plan)),
            Err(e) => {
                warn!("Planner failed: {}", e);
                NodeOutcome::degraded(CampaignDiff::new(), format!("planner failed: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn client_fields_win_over_generated() {
        let mut record = CampaignRecord::new("brief");
        record.location = Some("India".into());
        record.company_name = Some("".into());
        let plan = PlannerOutput {
            goal: Some("Launch a webinar".into()),
            location: Some("Singapore".into()),
            company_name: Some("Acme".into()),
            campaign_date: Some("2026-03-01".into()),
            ..Default::default()
        };
        let diff = merge_plan(&record, plan);
        assert_eq!(diff.location.as_deref(), Some("India"));
        assert_eq!(diff.company_name.as_deref(), Some("Acme"));
        assert_eq!(diff.goal.as_deref(), Some("Launch a webinar"));
        assert_eq!(diff.campaign_date, NaiveDate::from_ymd_opt(2026, 3, 1));
        assert_eq!(diff.topic, None);
    }

    #[test]
    fn passthrough_copies_plan_fields_only() {
        let mut record = CampaignRecord::new("brief");
        record.goal = Some("g".into());
        record.topic = Some("t".into());
        record.target_audience = Some("a".into());
        let diff = passthrough(&record);
        assert_eq!(diff.changed_fields(), vec!["goal", "target_audience", "topic"]);
    }
}
