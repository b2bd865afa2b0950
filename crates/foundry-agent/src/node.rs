//! Node contract: every pipeline step reads the record and returns a diff
//!
//! Nodes never fail. Adapter errors, timeouts and malformed model output are
//! handled inside the node and surface as [`NodeOutcome::Degraded`] carrying
//! whatever defaults the node could still produce.

use foundry_core::config::PolicyConfig;
use foundry_core::{CampaignDiff, CampaignRecord, FoundryConfig};
use foundry_llm::{Extractor, LlmProvider};
use foundry_tools::Adapters;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum NodeOutcome {
    Complete(CampaignDiff),
    Degraded { diff: CampaignDiff, reason: String },
}

impl NodeOutcome {
    pub fn degraded(diff: CampaignDiff, reason: impl Into<String>) -> Self {
        Self::Degraded { diff, reason: reason.into() }
    }

    pub fn diff(&self) -> &CampaignDiff {
        match self {
            Self::Complete(diff) | Self::Degraded { diff, .. } => diff,
        }
    }

    pub fn into_diff(self) -> CampaignDiff {
        match self {
            Self::Complete(diff) | Self::Degraded { diff, .. } => diff,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Complete(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// Everything a node may call out to. Built once, shared read-only.
#[derive(Clone)]
pub struct NodeContext {
    pub llm: Extractor,
    /// Same model at a higher temperature, for landing page regeneration.
    pub regen_llm: Extractor,
    pub adapters: Adapters,
    pub policy: PolicyConfig,
    /// Lowercased country → registration portal URL.
    pub portals: BTreeMap<String, String>,
}

impl NodeContext {
    pub fn new(provider: Arc<dyn LlmProvider>, adapters: Adapters, config: &FoundryConfig) -> Self {
        let llm = Extractor::new(provider, &config.llm, config.timeouts.llm());
        Self {
            regen_llm: llm.with_temperature(config.llm.regen_temperature),
            llm,
            adapters,
            policy: config.policy.clone(),
            portals: config.portal_table(),
        }
    }
}

#[async_trait::async_trait]
pub trait Node: Send + Sync {
    /// Wire name, as streamed to clients and returned by the router.
    fn name(&self) -> &'static str;

    async fn run(&self, record: &CampaignRecord, ctx: &NodeContext) -> NodeOutcome;
}

/// Today's date, for prompts that reason about deadlines.
pub(crate) fn today() -> String {
    chrono::Local::now().date_naive().to_string()
}

/// First `max` characters of `s`, on a char boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
