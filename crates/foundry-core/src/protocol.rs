//! Wire protocol for the campaign stream and the single-shot endpoints
//!
//! Session stream (WebSocket, `/ws_stream_campaign`):
//!
//! Client → Server (exactly once, first frame):
//!   { "initial_prompt": "...", "topic": "fintech", "location": "India", "campaign_date": "2025-03-01" }
//!
//! Server → Client (one per executed node, in order):
//!   { "event": "step", "node": "planner_agent", "step": 1, "data": { ...full campaign record... } }
//!
//! Server → Client (terminal):
//!   { "event": "done" }
//!   { "event": "error", "data": "message" }

use crate::error::{Error, Result};
use crate::types::{AudiencePersona, CampaignRecord, CoreMessaging};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// First message of a campaign session. Optional fields pre-populate the
/// record and make the planner pass them through instead of generating them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StartRequest {
    pub initial_prompt: String,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub source_docs_url: Option<String>,
    /// ISO-8601 date; a full datetime is accepted and truncated to its date.
    #[serde(default)]
    pub campaign_date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse `YYYY-MM-DD`, or the date part of an ISO-8601 datetime.
pub fn parse_campaign_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

impl StartRequest {
    /// Parse the first client frame.
    pub fn parse(text: &str) -> Result<Self> {
        let req: Self = serde_json::from_str(text)?;
        if req.initial_prompt.trim().is_empty() {
            return Err(Error::InvalidMessage("initial_prompt is required".into()));
        }
        Ok(req)
    }

    /// Build the starting record. Empty strings count as absent and an
    /// unparseable date is dropped.
    pub fn into_record(self) -> CampaignRecord {
        let mut record = CampaignRecord::new(self.initial_prompt);
        record.goal = non_empty(self.goal);
        record.topic = non_empty(self.topic);
        record.target_audience = non_empty(self.target_audience);
        record.company_name = non_empty(self.company_name);
        record.source_docs_url = non_empty(self.source_docs_url);
        record.location = non_empty(self.location);
        record.campaign_date = self.campaign_date.as_deref().and_then(parse_campaign_date);
        record
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Server-pushed session event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum SessionEvent {
    /// One node finished; `data` is the full record after its diff was merged.
    Step {
        node: String,
        step: u64,
        data: Box<CampaignRecord>,
    },
    /// The pipeline reached its end.
    Done,
    /// The stream itself failed.
    Error { data: String },
}

impl SessionEvent {
    pub fn step(node: impl Into<String>, step: u64, record: CampaignRecord) -> Self {
        Self::Step {
            node: node.into(),
            step,
            data: Box::new(record),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            data: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ---------------------------------------------------------------------------
// Single-shot endpoints
// ---------------------------------------------------------------------------

/// `POST /infer_plan`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InferPlanRequest {
    pub initial_prompt: String,
}

/// `POST /regenerate_landing_page`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegenerateLandingPageRequest {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub audience_persona: Option<AudiencePersona>,
    #[serde(default)]
    pub core_messaging: Option<CoreMessaging>,
    #[serde(default)]
    pub generated_assets: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub company_name: Option<String>,
}

/// `POST /deploy_to_vercel`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeployRequest {
    pub html_content: String,
    pub project_name: String,
}

/// Result of a static-site deployment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Deployment {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
