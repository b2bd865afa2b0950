//! Tests for foundry-core: record merge, protocol messages, config loading

use foundry_core::*;
use std::collections::BTreeMap;

// ===========================================================================
// SessionKey
// ===========================================================================

#[test]
fn session_key_new_and_display() {
    let key = SessionKey::new("abc-123");
    assert_eq!(key.as_str(), "abc-123");
    assert_eq!(format!("{}", key), "abc-123");
}

#[test]
fn session_key_generate_is_unique() {
    let a = SessionKey::generate();
    let b = SessionKey::generate();
    assert_ne!(a, b);
    assert!(a.as_str().starts_with("campaign-"));
}

// ===========================================================================
// Merge
// ===========================================================================

fn sample_diff() -> CampaignDiff {
    let mut confidence = ConfidenceMap::new();
    confidence.insert("0".into(), 0.7);
    CampaignDiff {
        topic: Some("fintech".into()),
        registration_procedure: Some(vec!["Reserve a name".into(), "File SPICe+".into()]),
        required_documents: Some(vec![RequiredDocument::new("PAN Card", "Income Tax Dept", "Tax ID", "Before filing")]),
        step_confidence: Some(confidence),
        validation_rounds: Some(1),
        overall_confidence: Some(0.55),
        ..Default::default()
    }
}

#[test]
fn merge_is_idempotent() {
    let mut once = CampaignRecord::new("brief");
    once.apply(sample_diff());

    let mut twice = CampaignRecord::new("brief");
    twice.apply(sample_diff());
    twice.apply(sample_diff());

    assert_eq!(once, twice);
}

#[test]
fn empty_diff_is_a_no_op() {
    let mut record = CampaignRecord::new("brief");
    record.apply(sample_diff());
    let before = record.clone();
    record.apply(CampaignDiff::new());
    assert_eq!(record, before);
}

#[test]
fn later_diff_replaces_documents_wholesale() {
    let mut record = CampaignRecord::new("brief");
    record.apply(sample_diff());
    record.apply(CampaignDiff {
        required_documents: Some(vec![RequiredDocument::new("GST Certificate", "CBIC", "", "")]),
        ..Default::default()
    });
    let names: Vec<_> = record.documents().iter().map(|d| d.document_name.as_str()).collect();
    assert_eq!(names, vec!["GST Certificate"]);
}

#[test]
fn generated_assets_map_is_replaced() {
    let mut record = CampaignRecord::new("brief");
    record.generated_assets.insert("webinar_banner_url".into(), "a".into());
    let mut assets = BTreeMap::new();
    assets.insert("post_1_image_url".into(), "b".into());
    record.apply(CampaignDiff {
        generated_assets: Some(assets),
        ..Default::default()
    });
    assert_eq!(record.generated_assets.len(), 1);
    assert!(!record.generated_assets.contains_key("webinar_banner_url"));
}

#[test]
fn diff_deserializes_from_partial_json() {
    let diff: CampaignDiff = serde_json::from_str(r#"{"goal": "Grow signups", "validation_rounds": 2}"#).unwrap();
    assert_eq!(diff.goal.as_deref(), Some("Grow signups"));
    assert_eq!(diff.validation_rounds, Some(2));
    assert_eq!(diff.changed_fields(), vec!["goal", "validation_rounds"]);
}

// ===========================================================================
// Record serialization
// ===========================================================================

#[test]
fn record_serializes_every_field() {
    let record = CampaignRecord::new("brief");
    let v = serde_json::to_value(&record).unwrap();
    let obj = v.as_object().unwrap();
    for key in [
        "initial_prompt",
        "jurisdiction_info",
        "validation_rounds",
        "overall_confidence",
        "govt_fallback_only",
        "generated_assets",
        "automation_status",
    ] {
        assert!(obj.contains_key(key), "missing {key}");
    }
    assert!(v["jurisdiction_info"].is_null());
    assert_eq!(v["validation_rounds"], 0);
}

#[test]
fn webinar_summary_uses_abstract_key() {
    let details = WebinarDetails {
        title: "Launch".into(),
        summary: "What we'll cover".into(),
    };
    let v = serde_json::to_value(&details).unwrap();
    assert_eq!(v["abstract"], "What we'll cover");
}

#[test]
fn jurisdiction_sentinels() {
    assert!(!JurisdictionInfo::unknown().is_resolved());
    assert!(!JurisdictionInfo::not_applicable().is_resolved());
    assert_eq!(JurisdictionInfo::not_applicable().department_name, "N/A");
    assert!(JurisdictionInfo::new("ACRA", "https://www.acra.gov.sg", "National").is_resolved());
}

// ===========================================================================
// Protocol
// ===========================================================================

#[test]
fn start_request_prefills_record() {
    let req = StartRequest::parse(
        r#"{"initial_prompt": "Launch a webinar", "topic": "fintech", "location": "India",
            "target_audience": "", "campaign_date": "2025-03-01"}"#,
    )
    .unwrap();
    let record = req.into_record();
    assert_eq!(record.initial_prompt, "Launch a webinar");
    assert_eq!(record.location.as_deref(), Some("India"));
    assert!(record.target_audience.is_none());
    assert_eq!(record.campaign_date_iso(), "2025-03-01");
}

#[test]
fn start_request_rejects_garbage() {
    assert!(matches!(StartRequest::parse("not json"), Err(Error::JsonError(_))));
    assert!(matches!(StartRequest::parse("{}"), Err(_)));
}

#[test]
fn deploy_request_roundtrip() {
    let req: DeployRequest = serde_json::from_str(r#"{"html_content": "<p>x</p>", "project_name": "demo"}"#).unwrap();
    assert_eq!(req.project_name, "demo");
}

// ===========================================================================
// Config
// ===========================================================================

#[test]
fn config_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = FoundryConfig::load(&dir.path().join("nope.toml"));
    assert_eq!(cfg.server.port, 8000);
}

#[test]
fn config_load_bad_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foundry.toml");
    std::fs::write(&path, "this is [[ not toml").unwrap();
    let cfg = FoundryConfig::load(&path);
    assert_eq!(cfg.policy.max_rounds, 2);
}

#[test]
fn config_load_reads_sections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foundry.toml");
    std::fs::write(
        &path,
        "[server]\nport = 9100\n\n[policy]\nconfidence_threshold = 0.75\n\n[portals]\n\"new zealand\" = \"https://www.companies.govt.nz\"\n",
    )
    .unwrap();
    let cfg = FoundryConfig::load(&path);
    assert_eq!(cfg.server.port, 9100);
    assert_eq!(cfg.server.bind, "0.0.0.0");
    assert_eq!(cfg.policy.confidence_threshold, 0.75);
    assert!(cfg.portal_table().contains_key("new zealand"));
}

#[test]
fn config_toml_roundtrips() {
    let cfg = FoundryConfig::default();
    let text = cfg.to_toml();
    assert!(text.contains("[policy]"));
    let back: FoundryConfig = toml::from_str(&text).unwrap();
    assert_eq!(back.timeouts.llm_secs, 30);
}
