//! Audience research, messaging and the required-document list
//!
//! On a retry pass the previous audit's mismatches are appended to the prompt
//! as a correction note.

use crate::node::{today, truncate_chars, Node, NodeContext, NodeOutcome};
use foundry_core::{
    dedup_documents, AudiencePersona, CampaignDiff, CampaignRecord, CoreMessaging, RequiredDocument,
};
use foundry_tools::adapter::MIN_TRUSTED_CHARS;
use foundry_tools::format_hits;
use serde::Deserialize;
use tracing::{info, warn};

const GOVT_CONTEXT_CHARS: usize = 6000;
const SEARCH_CONTEXT_CHARS: usize = 4000;

const RESEARCH_SCHEMA: &str = r#"{
  "audience_persona": { "pain_point": "...", "motivation": "...", "preferred_channel": "..." },
  "core_messaging": { "value_proposition": "...", "tone_of_voice": "...", "call_to_action": "..." },
  "required_documents": [
    {
      "document_name": "official name of the document or permit",
      "issuing_authority": "body that issues it",
      "purpose": "why it is needed",
      "deadline_note": "when to obtain it relative to the campaign date"
    }
  ]
}"#;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResearchOutput {
    audience_persona: Option<AudiencePersona>,
    core_messaging: Option<CoreMessaging>,
    required_documents: Vec<RequiredDocument>,
}

/// Generic registration documents, plus India-specific ones.
pub fn default_documents(location: &str) -> Vec<RequiredDocument> {
    let mut docs = vec![
        RequiredDocument::new(
            "Business Registration Certificate",
            "Company Registration Office",
            "Legal business entity registration",
            "Before business launch",
        ),
        RequiredDocument::new(
            "Company Incorporation Certificate",
            "State Business Registry",
            "Proof of legal incorporation",
            "Required for all startups",
        ),
        RequiredDocument::new(
            "Tax Registration (GST/VAT)",
            "Tax Authority",
            "Indirect tax compliance",
            "30 days after launch (or as per local law)",
        ),
        RequiredDocument::new(
            "Director/Owner Identification & Address Proof",
            "Government Authority",
            "KYC compliance",
            "Before registration",
        ),
        RequiredDocument::new(
            "Memorandum & Articles of Association",
            "Company",
            "Define company governance rules",
            "Required during incorporation",
        ),
    ];
    if matches!(location.trim().to_lowercase().as_str(), "india" | "in") {
        docs.push(RequiredDocument::new(
            "DIN (Director Identification Number)",
            "Ministry of Corporate Affairs",
            "Director identification for Indian companies",
            "Before incorporating company",
        ));
        docs.push(RequiredDocument::new(
            "ROC Registration (Registrar of Companies)",
            "ROC",
            "Official company registration",
            "Initial registration mandatory",
        ));
    }
    docs
}

pub fn default_persona(topic: &str, location: &str) -> AudiencePersona {
    AudiencePersona {
        pain_point: format!(
            "Complex regulatory requirements for {topic} startups in {location}; Need clear guidance on compliance"
        ),
        motivation: "Streamline business setup and ensure legal compliance".into(),
        preferred_channel: "Email guides, webinars, live support".into(),
    }
}

pub fn default_messaging(topic: &str, location: &str) -> CoreMessaging {
    CoreMessaging {
        value_proposition: format!(
            "Simplify {topic} startup registration with expert-guided compliance in {location}"
        ),
        tone_of_voice: "Professional, supportive, transparent".into(),
        call_to_action: "Start your journey with confidence".into(),
    }
}

/// Corrective input built from the previous audit, empty on the first pass.
pub fn correction_note(record: &CampaignRecord) -> String {
    if record.validation_mismatches.is_empty() {
        return String::new();
    }
    let items: Vec<String> = record.validation_mismatches.iter().map(|m| format!("  - {m}")).collect();
    format!(
        "\n\nCORRECTION REQUIRED (from validation audit round {}):\n{}\n\n\
         Fix ALL of the above issues in this revised output. Do not repeat the errors listed.",
        record.validation_rounds,
        items.join("\n")
    )
}

/// Documents only make sense for a known location; without one the list is
/// left empty so the audit reports it.
fn documents_or_defaults(docs: Vec<RequiredDocument>, location: &str) -> (Vec<RequiredDocument>, bool) {
    if !docs.is_empty() {
        return (dedup_documents(docs), false);
    }
    if location.trim().is_empty() {
        (Vec::new(), false)
    } else {
        (default_documents(location), true)
    }
}

pub struct ResearchNode;

impl ResearchNode {
    async fn search_or_empty(&self, ctx: &NodeContext, query: &str) -> String {
        match ctx.adapters.search.search(query).await {
            Ok(hits) => format_hits(&hits),
            Err(e) => {
                warn!(query, "Research search failed: {}", e);
                String::new()
            }
        }
    }

    fn product_context(&self, record: &CampaignRecord, search_results: &str) -> String {
        let raw = record.raw_govt_content.as_deref().unwrap_or("");
        let mut context = if raw.chars().count() > MIN_TRUSTED_CHARS {
            format!(
                "=== OFFICIAL GOVERNMENT WEBSITE CONTENT (use as primary source for documents) ===\n{}",
                truncate_chars(raw, GOVT_CONTEXT_CHARS)
            )
        } else {
            format!(
                "=== WEB RESEARCH ON REGISTRATION REQUIREMENTS (fallback) ===\n{}\n\n\
                 Use the above research to identify required documents and provide realistic defaults.",
                truncate_chars(search_results, SEARCH_CONTEXT_CHARS)
            )
        };
        context.push_str(&correction_note(record));
        context
    }
}

#[async_trait::async_trait]
impl Node for ResearchNode {
    fn name(&self) -> &'static str {
        "research_agent"
    }

    async fn run(&self, record: &CampaignRecord, ctx: &NodeContext) -> NodeOutcome {
        let topic = record.topic_or_default();
        let location = record.location_or_default();
        let audience = record.target_audience.as_deref().unwrap_or("");
        let date = record.campaign_date_iso();

        let search_results = self
            .search_or_empty(ctx, &format!("common pain points for {audience} related to {topic}"))
            .await;
        let regulatory_news = if location.is_empty() {
            String::new()
        } else {
            self.search_or_empty(
                ctx,
                &format!("latest regulatory changes startup business registration {location} {date} news"),
            )
            .await
        };

        let authority = record.jurisdiction_info.clone().unwrap_or_default();
        let procedure = if record.procedure().is_empty() {
            "No procedure available.".to_string()
        } else {
            record
                .procedure()
                .iter()
                .enumerate()
                .map(|(i, s)| format!("{}. {}", i + 1, s))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let system = format!(
            "You are a marketing strategist with expertise in international compliance. Synthesize \
             product information and audience research into a marketing strategy, and list the exact \
             documents required by the registration procedure for the target country. Today's date \
             is {}. Factor in recent regulatory changes and deadlines relative to the campaign date. \
             If no location is provided, return an empty list for required_documents.",
            today()
        );
        let user = format!(
            "--- PRODUCT CONTEXT ---\n{}\n\n\
             --- AUDIENCE RESEARCH ---\nTopic: {topic}, Audience: {audience}\nResearch Results:\n{search_results}\n\n\
             --- JURISDICTION & PROCEDURE ---\nGovernment Department: {} ({})\nRegistration Procedure:\n{procedure}\n\n\
             --- CAMPAIGN LOCATION & DATE ---\nLocation/Country: {location}\nCampaign Launch Date: {date}\n\
             Recent Regulatory News:\n{}\n\n\
             --- SYNTHESIS ---\n\
             1. Generate the audience_persona and core_messaging.\n\
             2. Generate required_documents: every legal, regulatory and compliance document needed to \
             launch this startup in {location} by {date}, based on the procedure above, each with its \
             exact issuing authority.",
            self.product_context(record, &search_results),
            authority.department_name,
            authority.department_url,
            if regulatory_news.is_empty() { "No recent news." } else { regulatory_news.as_str() },
        );

        match ctx.llm.extract::<ResearchOutput>(&system, &user, RESEARCH_SCHEMA).await {
            Ok(output) => {
                let (documents, defaulted) = documents_or_defaults(output.required_documents, location);
                info!(documents = documents.len(), defaulted, "Research complete");
                let diff = CampaignDiff {
                    audience_persona: Some(
                        output.audience_persona.unwrap_or_else(|| default_persona(topic, location)),
                    ),
                    core_messaging: Some(
                        output.core_messaging.unwrap_or_else(|| default_messaging(topic, location)),
                    ),
                    required_documents: Some(documents),
                    ..Default::default()
                };
                if defaulted {
                    NodeOutcome::degraded(diff, "no documents generated, using defaults")
                } else {
                    NodeOutcome::Complete(diff)
                }
            }
            Err(e) => {
                warn!("Research extraction failed, using defaults: {}", e);
                let (documents, _) = documents_or_defaults(Vec::new(), location);
                NodeOutcome::degraded(
                    CampaignDiff {
                        audience_persona: Some(default_persona(topic, location)),
                        core_messaging: Some(default_messaging(topic, location)),
                        required_documents: Some(documents),
                        ..Default::default()
                    },
                    format!("research extraction failed: {e}"),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn india_gets_two_extra_documents() {
        assert_eq!(default_documents("Germany").len(), 5);
        let india = default_documents(" India ");
        assert_eq!(india.len(), 7);
        assert!(india.iter().any(|d| d.document_name.starts_with("DIN")));
        assert_eq!(default_documents("IN").len(), 7);
    }

    #[test]
    fn correction_note_lists_mismatches() {
        let mut record = CampaignRecord::new("x");
        assert_eq!(correction_note(&record), "");

        record.validation_rounds = 1;
        record.validation_mismatches = vec!["Wrong authority".into(), "Missing doc: PAN".into()];
        let note = correction_note(&record);
        assert!(note.contains("validation audit round 1"));
        assert!(note.contains("  - Wrong authority\n  - Missing doc: PAN"));
    }

    #[test]
    fn empty_documents_default_only_with_location() {
        let (docs, defaulted) = documents_or_defaults(Vec::new(), "");
        assert!(docs.is_empty());
        assert!(!defaulted);

        let (docs, defaulted) = documents_or_defaults(Vec::new(), "Kenya");
        assert_eq!(docs.len(), 5);
        assert!(defaulted);
    }

    #[test]
    fn generated_documents_are_deduplicated() {
        let docs = vec![
            RequiredDocument::new("PAN Card", "Income Tax Dept", "", ""),
            RequiredDocument::new("pan card", "Other", "", ""),
        ];
        let (docs, defaulted) = documents_or_defaults(docs, "India");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].issuing_authority, "Income Tax Dept");
        assert!(!defaulted);
    }
}
