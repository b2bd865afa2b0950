//! Audit of the registration procedure and document list
//!
//! The scraped authority site is ground truth; fresh web searches are the
//! cross-reference. Produces per-item confidence scores, an overall score
//! and the mismatch list that drives the retry router.

use crate::node::{Node, NodeContext, NodeOutcome};
use foundry_core::config::PolicyConfig;
use foundry_core::{
    clamp_confidence, dedup_documents, CampaignDiff, CampaignRecord, ConfidenceMap, RequiredDocument,
};
use foundry_tools::adapter::MIN_TRUSTED_CHARS;
use foundry_tools::format_hits;
use futures::future::join_all;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{info, warn};

pub const NOTHING_TO_VALIDATE: &str = "No registration steps or documents were generated.";
const NO_SCRAPE: &str = "Government website could not be scraped. Use web search results as reference.";
const MISSING_DOC_AUTHORITY: &str = "See official government website";

const VALIDATION_SCHEMA: &str = r#"{
  "is_validated": true,
  "overall_confidence": 0.0,
  "step_confidence": { "0": 0.0 },
  "document_confidence": { "<document_name>": 0.0 },
  "mismatches": ["specific discrepancy: wrong name, wrong authority, invented document, wrong order"],
  "missing_docs": ["document listed on the government site but absent from the list"],
  "missing_steps": ["step found in research but absent from the procedure"]
}"#;

const AUDITOR_SYSTEM: &str = "You are a meticulous compliance auditor for startup registration \
procedures. You are given:\n\
  A) Raw text scraped from the government department's website. Treat it as GROUND TRUTH.\n\
  B) Registration steps extracted from that scrape.\n\
  C) A generated list of required documents.\n\
  D) Independent web-search results.\n\n\
Compare B and C against A and D. Score EACH step and EACH document from 0.0 to 1.0:\n\
  1.0 explicitly confirmed on the government site or by several authoritative sources,\n\
  0.7 mentioned in web search but not on the government site,\n\
  0.4 plausible but not verified,\n\
  0.1 contradicted or invented.\n\
List every mismatch, list documents on the government site that are missing from C, and set \
is_validated only if overall_confidence >= 0.75 with no critical mismatches. Never trust \
generated content over what the government site states.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ValidationOutput {
    is_validated: bool,
    overall_confidence: f64,
    step_confidence: ConfidenceMap,
    document_confidence: ConfidenceMap,
    mismatches: Vec<String>,
    missing_docs: Vec<String>,
    missing_steps: Vec<String>,
}

pub fn search_queries(record: &CampaignRecord) -> Vec<String> {
    let topic = record.topic_or_default();
    let location = record.location_or_default();
    let mut queries = vec![
        format!("{topic} company registration official requirements {location}"),
        format!("required documents {topic} startup registration {location}"),
    ];
    if let Some(first) = record.documents().first().filter(|d| !d.document_name.is_empty()) {
        queries.push(format!("\"{}\" {location} official registration", first.document_name));
    }
    queries
}

fn format_steps(steps: &[String]) -> String {
    if steps.is_empty() {
        return "No steps provided.".into();
    }
    steps.iter().enumerate().map(|(i, s)| format!("{i}. {s}")).collect::<Vec<_>>().join("\n")
}

fn format_documents(docs: &[RequiredDocument]) -> String {
    if docs.is_empty() {
        return "No documents provided.".into();
    }
    docs.iter()
        .map(|d| format!("  • {} - Issuing authority: {}", d.document_name, d.issuing_authority))
        .collect::<Vec<_>>()
        .join("\n")
}

fn clamp_map(map: ConfidenceMap) -> ConfidenceMap {
    map.into_iter().map(|(k, v)| (k, clamp_confidence(v))).collect()
}

/// Append documents the audit found missing, skipping any name already
/// present (case-insensitively). Returns the new list and the names added.
fn append_missing(docs: &[RequiredDocument], missing: &[String]) -> (Vec<RequiredDocument>, Vec<String>) {
    let mut seen: HashSet<String> = docs.iter().map(|d| d.document_name.trim().to_lowercase()).collect();
    let mut merged = docs.to_vec();
    let mut added = Vec::new();
    for name in missing.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if seen.insert(name.to_lowercase()) {
            merged.push(RequiredDocument::new(
                name,
                MISSING_DOC_AUTHORITY,
                "Listed on the official government registration page but not generated by research.",
                "Check official website for deadline",
            ));
            added.push(name.to_string());
        }
    }
    (dedup_documents(merged), added)
}

/// Neutral scores and advisory notes when the audit itself could not run.
fn heuristic_fallback(
    steps: &[String],
    docs: &[RequiredDocument],
    raw: &str,
    policy: &PolicyConfig,
    mut diff: CampaignDiff,
) -> CampaignDiff {
    let neutral = clamp_confidence(policy.neutral_confidence);
    diff.step_confidence = Some((0..steps.len()).map(|i| (i.to_string(), neutral)).collect());
    diff.document_confidence = Some(
        docs.iter()
            .enumerate()
            .map(|(i, d)| {
                let key = if d.document_name.is_empty() { format!("doc_{i}") } else { d.document_name.clone() };
                (key, neutral)
            })
            .collect(),
    );
    diff.overall_confidence = Some(neutral);

    let mut notes = Vec::new();
    if docs.len() < 3 {
        notes.push("Limited documents found - verify official registration requirements".to_string());
    }
    if steps.len() < 3 {
        notes.push("Limited procedure steps found - check official government portal".to_string());
    }
    if raw.chars().count() < MIN_TRUSTED_CHARS {
        notes.push("Unable to verify against official government website - check source directly".to_string());
    }
    if notes.is_empty() {
        notes.push("Documentation review pending - cross-reference with official sources".to_string());
    }
    diff.validation_mismatches = Some(notes);
    diff.govt_fallback_only = Some(false);
    diff
}

pub struct ValidationNode;

impl ValidationNode {
    async fn cross_reference(&self, ctx: &NodeContext, queries: &[String]) -> String {
        let results = join_all(queries.iter().map(|q| ctx.adapters.search.search(q))).await;
        let mut out = String::new();
        for (query, result) in queries.iter().zip(results) {
            match result {
                Ok(hits) => out.push_str(&format!("\n--- Query: {} ---\n{}\n", query, format_hits(&hits))),
                Err(e) => warn!(query = %query, "Validation search failed: {}", e),
            }
        }
        out
    }
}

#[async_trait::async_trait]
impl Node for ValidationNode {
    fn name(&self) -> &'static str {
        "validation_agent"
    }

    async fn run(&self, record: &CampaignRecord, ctx: &NodeContext) -> NodeOutcome {
        let policy = &ctx.policy;
        let round = record.validation_rounds + 1;
        info!(round, max_rounds = policy.max_rounds, "Validation round");

        let scraped = record.raw_govt_content.as_deref().unwrap_or("");
        let steps = record.procedure();
        let docs = record.documents();

        let mut diff = CampaignDiff {
            validation_rounds: Some(round),
            ..Default::default()
        };

        if steps.is_empty() && docs.is_empty() {
            warn!("Nothing to validate");
            diff.overall_confidence = Some(0.0);
            diff.validation_mismatches = Some(vec![NOTHING_TO_VALIDATE.to_string()]);
            diff.govt_fallback_only = Some(!scraped.is_empty());
            return NodeOutcome::degraded(diff, "no registration steps or documents");
        }

        let ground_truth = if scraped.is_empty() {
            warn!("No government scrape, auditing against web search only");
            NO_SCRAPE
        } else {
            scraped
        };

        let web = self.cross_reference(ctx, &search_queries(record)).await;
        let user = format!(
            "=== A) RAW GOVERNMENT WEBSITE CONTENT (SOURCE OF TRUTH) ===\n{ground_truth}\n\n\
             === B) EXTRACTED REGISTRATION STEPS ===\n{}\n\n\
             === C) GENERATED REQUIRED DOCUMENTS ===\n{}\n\n\
             === D) INDEPENDENT WEB-SEARCH CROSS-REFERENCE ===\n{}\n\n\
             Country/Jurisdiction: {}\nStartup Type: {}\n\n\
             Audit all items and return the validation report.",
            format_steps(steps),
            format_documents(docs),
            if web.is_empty() { "No web results retrieved." } else { web.as_str() },
            record.location_or_default(),
            record.topic_or_default(),
        );

        let report = match ctx.llm.extract::<ValidationOutput>(AUDITOR_SYSTEM, &user, VALIDATION_SCHEMA).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Validation extraction failed, using heuristic notes: {}", e);
                let diff = heuristic_fallback(steps, docs, scraped, policy, diff);
                return NodeOutcome::degraded(diff, format!("validation extraction failed: {e}"));
            }
        };

        let confidence = clamp_confidence(report.overall_confidence);
        info!(
            confidence,
            validated = report.is_validated,
            mismatches = report.mismatches.len(),
            "Validation complete"
        );

        let mut document_confidence = clamp_map(report.document_confidence);
        let (merged, added) = append_missing(docs, &report.missing_docs);
        if !added.is_empty() {
            let score = clamp_confidence(policy.missing_doc_confidence);
            for name in &added {
                document_confidence.entry(name.clone()).or_insert(score);
            }
            info!(added = added.len(), "Added documents found missing by the audit");
            diff.required_documents = Some(merged);
        }

        let mismatches = report
            .mismatches
            .into_iter()
            .chain(report.missing_docs.iter().map(|d| format!("Missing doc: {d}")))
            .chain(report.missing_steps.iter().map(|s| format!("Missing step: {s}")))
            .collect();

        let fallback_only = confidence < policy.critical_confidence_floor && scraped.is_empty();
        if fallback_only {
            warn!(confidence, "Confidence critically low with no government scrape");
        }

        diff.step_confidence = Some(clamp_map(report.step_confidence));
        diff.document_confidence = Some(document_confidence);
        diff.overall_confidence = Some(confidence);
        diff.validation_mismatches = Some(mismatches);
        diff.govt_fallback_only = Some(fallback_only);
        NodeOutcome::Complete(diff)
    }
}
