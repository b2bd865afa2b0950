//! Core types for Campaign Foundry
//!
//! The [`CampaignRecord`] is the single piece of state threaded through the
//! pipeline. Nodes never mutate it directly; they return a [`CampaignDiff`]
//! whose `Some` fields replace the matching record fields wholesale.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Session identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct SessionKey(Arc<str>);

impl SessionKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    /// Fresh random session key for a new client connection.
    pub fn generate() -> Self {
        Self::new(format!("campaign-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Confidence scores keyed by step index (as a string) or document name.
pub type ConfidenceMap = BTreeMap<String, f64>;

/// Returns true for placeholder values meaning "attempted and failed".
pub fn is_sentinel(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("unknown") || v.eq_ignore_ascii_case("n/a")
}

/// Clamp a score into `[0.0, 1.0]`. NaN becomes 0.0.
pub fn clamp_confidence(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Record building blocks
// ---------------------------------------------------------------------------

/// The regulatory authority responsible for company registration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionInfo {
    #[serde(default)]
    pub department_name: String,
    #[serde(default)]
    pub department_url: String,
    #[serde(default)]
    pub jurisdiction_type: String,
}

impl JurisdictionInfo {
    pub fn new(
        department_name: impl Into<String>,
        department_url: impl Into<String>,
        jurisdiction_type: impl Into<String>,
    ) -> Self {
        Self {
            department_name: department_name.into(),
            department_url: department_url.into(),
            jurisdiction_type: jurisdiction_type.into(),
        }
    }

    /// Every resolver tier failed.
    pub fn unknown() -> Self {
        Self::new("Unknown", "", "Unknown")
    }

    /// No location was supplied, so resolution was never possible.
    pub fn not_applicable() -> Self {
        Self::new("N/A", "", "N/A")
    }

    /// A usable authority URL is present.
    pub fn is_resolved(&self) -> bool {
        !is_sentinel(&self.department_url)
    }
}

/// A legal or regulatory document needed before launch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredDocument {
    #[serde(default)]
    pub document_name: String,
    #[serde(default)]
    pub issuing_authority: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub deadline_note: String,
}

impl RequiredDocument {
    pub fn new(
        document_name: impl Into<String>,
        issuing_authority: impl Into<String>,
        purpose: impl Into<String>,
        deadline_note: impl Into<String>,
    ) -> Self {
        Self {
            document_name: document_name.into(),
            issuing_authority: issuing_authority.into(),
            purpose: purpose.into(),
            deadline_note: deadline_note.into(),
        }
    }

    fn dedup_key(&self) -> String {
        self.document_name.trim().to_lowercase()
    }
}

/// Drop documents whose name repeats an earlier one, ignoring case.
/// The first occurrence wins and order is preserved.
pub fn dedup_documents(docs: Vec<RequiredDocument>) -> Vec<RequiredDocument> {
    let mut seen = HashSet::new();
    docs.into_iter()
        .filter(|d| seen.insert(d.dedup_key()))
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudiencePersona {
    #[serde(default)]
    pub pain_point: String,
    #[serde(default)]
    pub motivation: String,
    #[serde(default)]
    pub preferred_channel: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreMessaging {
    #[serde(default)]
    pub value_proposition: String,
    #[serde(default)]
    pub tone_of_voice: String,
    #[serde(default)]
    pub call_to_action: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebinarDetails {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub summary: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPost {
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_prompt: String,
}

/// One email of a nurture sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailStep {
    pub subject: String,
    pub body_markdown: String,
    /// Days to wait before sending (0 = immediately).
    #[serde(default)]
    pub send_delay_days: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandKit {
    pub logo_prompt: String,
    pub color_palette: Vec<String>,
    pub font_pair: String,
}

/// Outcome of delivering one social post to one channel.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub post_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomationStatus {
    pub slack_results: Vec<DeliveryResult>,
    pub telegram_results: Vec<DeliveryResult>,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Campaign record
// ---------------------------------------------------------------------------

/// Default aggregate confidence before the first validation round.
pub const DEFAULT_OVERALL_CONFIDENCE: f64 = 1.0;

fn default_overall_confidence() -> f64 {
    DEFAULT_OVERALL_CONFIDENCE
}

/// Shared pipeline state. Serialized in full for every streamed step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    // planner
    pub initial_prompt: String,
    pub goal: Option<String>,
    pub topic: Option<String>,
    pub target_audience: Option<String>,
    pub company_name: Option<String>,
    pub source_docs_url: Option<String>,
    pub campaign_date: Option<NaiveDate>,
    pub location: Option<String>,

    // jurisdiction + research
    pub jurisdiction_info: Option<JurisdictionInfo>,
    pub registration_procedure: Option<Vec<String>>,
    pub required_documents: Option<Vec<RequiredDocument>>,
    pub raw_govt_content: Option<String>,
    pub audience_persona: Option<AudiencePersona>,
    pub core_messaging: Option<CoreMessaging>,

    // validation
    #[serde(default)]
    pub validation_rounds: u32,
    #[serde(default)]
    pub step_confidence: ConfidenceMap,
    #[serde(default)]
    pub document_confidence: ConfidenceMap,
    #[serde(default)]
    pub validation_mismatches: Vec<String>,
    #[serde(default)]
    pub govt_fallback_only: bool,
    #[serde(default = "default_overall_confidence")]
    pub overall_confidence: f64,

    // strategy + content
    pub strategy_markdown: Option<String>,
    pub webinar_details: Option<WebinarDetails>,
    pub webinar_image_prompt: Option<String>,
    pub blog_post: Option<String>,
    #[serde(default)]
    pub email_sequence: Vec<EmailStep>,
    #[serde(default)]
    pub social_posts: Vec<SocialPost>,

    // design + web + brd + ops
    pub brand_kit: Option<BrandKit>,
    #[serde(default)]
    pub generated_assets: BTreeMap<String, String>,
    pub landing_page_code: Option<String>,
    pub landing_page_url: Option<String>,
    pub brd_url: Option<String>,
    pub automation_status: Option<AutomationStatus>,
}

impl CampaignRecord {
    /// Fresh record holding only the client brief.
    pub fn new(initial_prompt: impl Into<String>) -> Self {
        Self {
            initial_prompt: initial_prompt.into(),
            goal: None,
            topic: None,
            target_audience: None,
            company_name: None,
            source_docs_url: None,
            campaign_date: None,
            location: None,
            jurisdiction_info: None,
            registration_procedure: None,
            required_documents: None,
            raw_govt_content: None,
            audience_persona: None,
            core_messaging: None,
            validation_rounds: 0,
            step_confidence: ConfidenceMap::new(),
            document_confidence: ConfidenceMap::new(),
            validation_mismatches: Vec::new(),
            govt_fallback_only: false,
            overall_confidence: DEFAULT_OVERALL_CONFIDENCE,
            strategy_markdown: None,
            webinar_details: None,
            webinar_image_prompt: None,
            blog_post: None,
            email_sequence: Vec::new(),
            social_posts: Vec::new(),
            brand_kit: None,
            generated_assets: BTreeMap::new(),
            landing_page_code: None,
            landing_page_url: None,
            brd_url: None,
            automation_status: None,
        }
    }

    /// Apply a node's diff. Every `Some` field replaces the record field in
    /// full; lists and maps are never extended or merged.
    pub fn apply(&mut self, diff: CampaignDiff) {
        macro_rules! replace {
            (optional: $($opt:ident),* ; required: $($req:ident),*) => {
                $( if let Some(value) = diff.$opt { self.$opt = Some(value); } )*
                $( if let Some(value) = diff.$req { self.$req = value; } )*
            };
        }

        replace!(
            optional:
                goal, topic, target_audience, company_name, source_docs_url, campaign_date,
                location, jurisdiction_info, registration_procedure, required_documents,
                raw_govt_content, audience_persona, core_messaging, strategy_markdown,
                webinar_details, webinar_image_prompt, blog_post, brand_kit,
                landing_page_code, landing_page_url, brd_url, automation_status;
            required:
                validation_rounds, step_confidence, document_confidence,
                validation_mismatches, govt_fallback_only, email_sequence, social_posts,
                generated_assets
        );

        if let Some(score) = diff.overall_confidence {
            self.overall_confidence = clamp_confidence(score);
        }
    }

    /// Planner fields the client supplied (or a previous planner run wrote).
    pub fn has_plan(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.goal) && present(&self.topic) && present(&self.target_audience)
    }

    pub fn topic_or_default(&self) -> &str {
        self.topic.as_deref().unwrap_or("")
    }

    pub fn location_or_default(&self) -> &str {
        self.location.as_deref().unwrap_or("")
    }

    pub fn documents(&self) -> &[RequiredDocument] {
        self.required_documents.as_deref().unwrap_or(&[])
    }

    pub fn procedure(&self) -> &[String] {
        self.registration_procedure.as_deref().unwrap_or(&[])
    }

    /// Campaign date as ISO-8601, or an empty string.
    pub fn campaign_date_iso(&self) -> String {
        self.campaign_date.map(|d| d.to_string()).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Partial update returned by a node. `Some` means "replace this field".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignDiff {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_docs_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction_info: Option<JurisdictionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_procedure: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_documents: Option<Vec<RequiredDocument>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_govt_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience_persona: Option<AudiencePersona>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_messaging: Option<CoreMessaging>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_confidence: Option<ConfidenceMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_confidence: Option<ConfidenceMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_mismatches: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub govt_fallback_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webinar_details: Option<WebinarDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webinar_image_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog_post: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_sequence: Option<Vec<EmailStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_posts: Option<Vec<SocialPost>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_kit: Option<BrandKit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_assets: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landing_page_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landing_page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brd_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation_status: Option<AutomationStatus>,
}

impl CampaignDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the fields this diff replaces, sorted by name.
    pub fn changed_fields(&self) -> Vec<String> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_case_insensitive() {
        assert!(is_sentinel(""));
        assert!(is_sentinel("  "));
        assert!(is_sentinel("Unknown"));
        assert!(is_sentinel("UNKNOWN"));
        assert!(is_sentinel("n/a"));
        assert!(!is_sentinel("https://www.acra.gov.sg"));
    }

    #[test]
    fn clamp_handles_out_of_range_and_nan() {
        assert_eq!(clamp_confidence(1.7), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(0.42), 0.42);
    }

    #[test]
    fn apply_replaces_lists_instead_of_extending() {
        let mut record = CampaignRecord::new("brief");
        record.validation_mismatches = vec!["old".into(), "older".into()];
        record.apply(CampaignDiff {
            validation_mismatches: Some(vec!["new".into()]),
            ..Default::default()
        });
        assert_eq!(record.validation_mismatches, vec!["new".to_string()]);
    }

    #[test]
    fn apply_replaces_maps_instead_of_merging() {
        let mut record = CampaignRecord::new("brief");
        record.step_confidence.insert("0".into(), 0.9);
        record.step_confidence.insert("1".into(), 0.8);
        let mut fresh = ConfidenceMap::new();
        fresh.insert("0".into(), 0.2);
        record.apply(CampaignDiff {
            step_confidence: Some(fresh.clone()),
            ..Default::default()
        });
        assert_eq!(record.step_confidence, fresh);
    }

    #[test]
    fn apply_leaves_absent_fields_untouched() {
        let mut record = CampaignRecord::new("brief");
        record.topic = Some("fintech".into());
        record.apply(CampaignDiff {
            goal: Some("launch".into()),
            ..Default::default()
        });
        assert_eq!(record.topic.as_deref(), Some("fintech"));
        assert_eq!(record.goal.as_deref(), Some("launch"));
        assert_eq!(record.initial_prompt, "brief");
    }

    #[test]
    fn apply_clamps_overall_confidence() {
        let mut record = CampaignRecord::new("brief");
        record.apply(CampaignDiff {
            overall_confidence: Some(3.0),
            ..Default::default()
        });
        assert_eq!(record.overall_confidence, 1.0);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let docs = vec![
            RequiredDocument::new("PAN Card", "Income Tax Dept", "", ""),
            RequiredDocument::new("pan card ", "Other", "", ""),
            RequiredDocument::new("GST Registration", "CBIC", "", ""),
        ];
        let out = dedup_documents(docs);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].issuing_authority, "Income Tax Dept");
        assert_eq!(out[1].document_name, "GST Registration");
    }

    #[test]
    fn changed_fields_lists_only_set_fields() {
        let diff = CampaignDiff {
            topic: Some("x".into()),
            validation_rounds: Some(1),
            ..Default::default()
        };
        let fields = diff.changed_fields();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains(&"topic".to_string()));
        assert!(fields.contains(&"validation_rounds".to_string()));
        assert!(CampaignDiff::new().is_empty());
    }

    #[test]
    fn has_plan_requires_three_fields() {
        let mut record = CampaignRecord::new("brief");
        record.goal = Some("g".into());
        record.topic = Some("t".into());
        assert!(!record.has_plan());
        record.target_audience = Some("   ".into());
        assert!(!record.has_plan());
        record.target_audience = Some("CTOs".into());
        assert!(record.has_plan());
    }
}
