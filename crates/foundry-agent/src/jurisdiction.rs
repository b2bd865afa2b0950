//! Tiered discovery of the authority that registers companies in a country
//!
//! Tier 1 reads a known national portal and asks the model which agency on it
//! handles registration. Tier 2 searches the web and extracts the agency from
//! the results. A tier only counts when it yields a non-sentinel URL.

use crate::node::{truncate_chars, NodeContext};
use foundry_core::JurisdictionInfo;
use foundry_llm::Extractor;
use foundry_tools::{format_hits, ScrapeAdapter, SearchAdapter};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Portal text handed to extraction is capped at this many characters.
pub const PORTAL_CONTEXT_CHARS: usize = 4000;

pub(crate) const JURISDICTION_SCHEMA: &str = r#"{
  "department_name": "exact official name of the government department or regulatory body",
  "department_url": "official website URL of this department (a real, valid URL)",
  "jurisdiction_type": "e.g. Company Registration, Business Licensing, Startup Registration"
}"#;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Portal,
    Search,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Resolved {
    pub info: JurisdictionInfo,
    pub tier: Tier,
}

/// Portal URL for `location`: the longest table key contained in the
/// lowercased location wins, so "south africa" beats a shorter overlap.
pub fn lookup_portal<'a>(table: &'a BTreeMap<String, String>, location: &str) -> Option<&'a str> {
    let needle = location.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    table
        .iter()
        .filter(|(key, _)| needle.contains(key.as_str()))
        .max_by_key(|(key, _)| key.len())
        .map(|(_, url)| url.as_str())
}

pub struct JurisdictionResolver {
    llm: Extractor,
    search: Arc<dyn SearchAdapter>,
    scraper: Arc<dyn ScrapeAdapter>,
    portals: BTreeMap<String, String>,
}

impl JurisdictionResolver {
    pub fn new(
        llm: Extractor,
        search: Arc<dyn SearchAdapter>,
        scraper: Arc<dyn ScrapeAdapter>,
        portals: BTreeMap<String, String>,
    ) -> Self {
        Self { llm, search, scraper, portals }
    }

    pub fn from_context(ctx: &NodeContext) -> Self {
        Self::new(
            ctx.llm.clone(),
            ctx.adapters.search.clone(),
            ctx.adapters.scraper.clone(),
            ctx.portals.clone(),
        )
    }

    /// Resolve the registration authority. `None` means both tiers failed.
    pub async fn resolve(&self, location: &str, topic: &str, company: &str) -> Option<Resolved> {
        if let Some(portal) = lookup_portal(&self.portals, location) {
            match self.from_portal(portal, location, topic).await {
                Some(info) => {
                    info!(department = %info.department_name, "Jurisdiction resolved from portal");
                    return Some(Resolved { info, tier: Tier::Portal });
                }
                None => warn!(portal, "Portal tier failed, falling back to search"),
            }
        }

        match self.from_search(location, topic, company).await {
            Some(info) => {
                info!(department = %info.department_name, "Jurisdiction resolved from search");
                Some(Resolved { info, tier: Tier::Search })
            }
            None => {
                warn!(location, "No jurisdiction found");
                None
            }
        }
    }

    async fn from_portal(&self, portal: &str, country: &str, topic: &str) -> Option<JurisdictionInfo> {
        let content = match self.scraper.page_text(portal).await {
            Ok(text) => text,
            Err(e) => {
                warn!(portal, "Portal scrape failed: {}", e);
                return None;
            }
        };
        if content.trim().is_empty() {
            return None;
        }

        let system = "From this government portal content, find the ONE agency that handles \
                      business, startup or company registration. Give its name and real URL. \
                      Do not invent agencies.";
        let user = format!(
            "Country: {country}\nTopic: {topic}\n\nCONTENT:\n{}",
            truncate_chars(&content, PORTAL_CONTEXT_CHARS)
        );
        self.accept(self.llm.extract(system, &user, JURISDICTION_SCHEMA).await, "portal")
    }

    async fn from_search(&self, country: &str, topic: &str, company: &str) -> Option<JurisdictionInfo> {
        let query = format!("official agency for business/startup/company registration in {country} {topic}");
        let hits = match self.search.search(&query).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Jurisdiction search failed: {}", e);
                return None;
            }
        };

        let system = "Use the search results to identify the real government department that \
                      handles company and startup registration.";
        let user = format!(
            "Country: {country}\nTopic: {topic}\nCompany: {company}\nSearch:\n{}",
            format_hits(&hits)
        );
        self.accept(self.llm.extract(system, &user, JURISDICTION_SCHEMA).await, "search")
    }

    fn accept(
        &self,
        result: foundry_llm::LlmResult<JurisdictionInfo>,
        tier: &str,
    ) -> Option<JurisdictionInfo> {
        match result {
            Ok(info) if info.is_resolved() => Some(info),
            Ok(info) => {
                warn!(tier, url = %info.department_url, "Extraction returned a sentinel URL");
                None
            }
            Err(e) => {
                warn!(tier, "Jurisdiction extraction failed: {}", e);
                None
            }
        }
    }
}
