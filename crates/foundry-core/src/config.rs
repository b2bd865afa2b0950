//! Foundry configuration
//!
//! Tunables live in a TOML file (`foundry.toml` by default). A missing or
//! unparseable file falls back to defaults. Credentials never live in the
//! file; they are read from the environment by [`Credentials::from_env`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration, built once at startup and shared read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FoundryConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub policy: PolicyConfig,
    pub timeouts: TimeoutConfig,
    pub output: OutputConfig,
    /// Extra country → registration portal entries, merged over the built-in table.
    pub portals: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions base URL.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Temperature for landing page regeneration.
    pub regen_temperature: f32,
    pub max_tokens: usize,
}

/// Routing and scoring policy for the validation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Below this the pipeline may loop back to research.
    pub confidence_threshold: f64,
    /// Maximum validation rounds before proceeding regardless.
    pub max_rounds: u32,
    /// Below this with no scrape, the run is flagged `govt_fallback_only`.
    pub critical_confidence_floor: f64,
    /// Score given to every item when the audit itself fails.
    pub neutral_confidence: f64,
    /// Score given to documents the audit says are missing.
    pub missing_doc_confidence: f64,
    /// Runner safety ceiling on node executions per session.
    pub max_node_executions: usize,
}

/// Per-call timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub llm_secs: u64,
    pub search_secs: u64,
    pub scrape_secs: u64,
    pub scrape_fallback_secs: u64,
    pub images_secs: u64,
    pub webhook_secs: u64,
    pub deploy_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for generated BRD artifacts.
    pub dir: PathBuf,
}

// ============================================================
// Defaults
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000, bind: "0.0.0.0".into() }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".into(),
            model: "llama-3.3-70b-versatile".into(),
            temperature: 0.0,
            regen_temperature: 0.9,
            max_tokens: 4096,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.68,
            max_rounds: 2,
            critical_confidence_floor: 0.3,
            neutral_confidence: 0.6,
            missing_doc_confidence: 0.5,
            max_node_executions: 32,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_secs: 30,
            search_secs: 15,
            scrape_secs: 10,
            scrape_fallback_secs: 5,
            images_secs: 10,
            webhook_secs: 10,
            deploy_secs: 30,
        }
    }
}

impl PolicyConfig {
    /// Node executions of the longest legal run: planner and jurisdiction,
    /// research plus validation once per round, then the six closing nodes.
    pub fn min_node_executions(&self) -> usize {
        2 + 2 * self.max_rounds as usize + 6
    }
}

impl TimeoutConfig {
    pub fn llm(&self) -> Duration {
        Duration::from_secs(self.llm_secs)
    }
    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }
    pub fn scrape(&self) -> Duration {
        Duration::from_secs(self.scrape_secs)
    }
    pub fn scrape_fallback(&self) -> Duration {
        Duration::from_secs(self.scrape_fallback_secs)
    }
    pub fn images(&self) -> Duration {
        Duration::from_secs(self.images_secs)
    }
    pub fn webhook(&self) -> Duration {
        Duration::from_secs(self.webhook_secs)
    }
    pub fn deploy(&self) -> Duration {
        Duration::from_secs(self.deploy_secs)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("campaign_outputs") }
    }
}

/// Built-in country → business registration portal table.
pub const KNOWN_PORTALS: &[(&str, &str)] = &[
    ("united states", "https://www.sba.gov/business-guide/launch-your-business"),
    ("usa", "https://www.sba.gov/business-guide/launch-your-business"),
    ("united kingdom", "https://www.gov.uk/set-up-business"),
    ("uk", "https://www.gov.uk/set-up-business"),
    ("canada", "https://ised-isde.canada.ca/site/corporations-canada/en"),
    ("australia", "https://business.gov.au/registrations"),
    ("india", "https://www.startupindia.gov.in"),
    ("germany", "https://www.existenzgruender.de/EN/Home/inhalt.html"),
    ("france", "https://www.guichet-entreprises.fr/en/"),
    ("singapore", "https://www.acra.gov.sg"),
    ("uae", "https://www.economy.gov.ae/english/pages/default.aspx"),
    ("south africa", "https://www.cipc.co.za"),
    ("nigeria", "https://www.cac.gov.ng"),
    ("kenya", "https://brs.go.ke"),
    ("brazil", "https://www.gov.br/empresas-e-negocios/pt-br"),
    ("japan", "https://www.moj.go.jp/ENGLISH/"),
    ("egypt", "https://www.gafi.gov.eg"),
    ("morocco", "https://www.invest.gov.ma"),
];

// ============================================================
// Loading
// ============================================================

impl FoundryConfig {
    /// Load config from a TOML file, falling back to defaults when the file
    /// is missing, unparseable or fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Rejected {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} - using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Parse and validate TOML config text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The execution ceiling must leave room for every validation round.
    pub fn validate(&self) -> Result<()> {
        let needed = self.policy.min_node_executions();
        if self.policy.max_node_executions < needed {
            return Err(Error::ConfigError(format!(
                "policy.max_node_executions = {} cannot finish a run with max_rounds = {} (needs at least {})",
                self.policy.max_node_executions, self.policy.max_rounds, needed
            )));
        }
        Ok(())
    }

    /// Write as TOML (for `foundry init-config`).
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml())?;
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Built-in portals with `[portals]` entries layered on top, keys lowercased.
    pub fn portal_table(&self) -> BTreeMap<String, String> {
        let mut table: BTreeMap<String, String> = KNOWN_PORTALS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (k, v) in &self.portals {
            table.insert(k.trim().to_lowercase(), v.clone());
        }
        table
    }
}

// ============================================================
// Credentials
// ============================================================

/// Secrets for external services. Each is optional; a missing credential
/// degrades the matching adapter instead of failing startup.
#[derive(Clone, Default)]
pub struct Credentials {
    pub groq_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub unsplash_access_key: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub vercel_token: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            groq_api_key: var("GROQ_API_KEY"),
            tavily_api_key: var("TAVILY_API_KEY"),
            unsplash_access_key: var("UNSPLASH_ACCESS_KEY"),
            slack_webhook_url: var("SLACK_WEBHOOK_URL"),
            telegram_bot_token: var("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: var("TELEGRAM_CHAT_ID"),
            vercel_token: var("VERCEL_TOKEN"),
        }
    }

    /// Names of the credentials that are set, for startup logging.
    pub fn present(&self) -> Vec<&'static str> {
        [
            ("GROQ_API_KEY", self.groq_api_key.is_some()),
            ("TAVILY_API_KEY", self.tavily_api_key.is_some()),
            ("UNSPLASH_ACCESS_KEY", self.unsplash_access_key.is_some()),
            ("SLACK_WEBHOOK_URL", self.slack_webhook_url.is_some()),
            ("TELEGRAM_BOT_TOKEN", self.telegram_bot_token.is_some()),
            ("TELEGRAM_CHAT_ID", self.telegram_chat_id.is_some()),
            ("VERCEL_TOKEN", self.vercel_token.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("present", &self.present()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy() {
        let cfg = FoundryConfig::default();
        assert_eq!(cfg.policy.confidence_threshold, 0.68);
        assert_eq!(cfg.policy.max_rounds, 2);
        assert_eq!(cfg.policy.max_node_executions, 32);
        assert_eq!(cfg.llm.regen_temperature, 0.9);
        assert_eq!(cfg.output.dir, PathBuf::from("campaign_outputs"));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: FoundryConfig = toml::from_str("[policy]\nmax_rounds = 5\n").unwrap();
        assert_eq!(cfg.policy.max_rounds, 5);
        assert_eq!(cfg.policy.confidence_threshold, 0.68);
        assert_eq!(cfg.server.port, 8000);
    }

    #[test]
    fn ceiling_must_cover_every_round() {
        assert_eq!(PolicyConfig::default().min_node_executions(), 12);

        let err = FoundryConfig::parse("[policy]\nmax_rounds = 15\n").unwrap_err();
        assert!(matches!(err, Error::ConfigError(ref m) if m.contains("needs at least 38")));

        let cfg = FoundryConfig::parse("[policy]\nmax_rounds = 15\nmax_node_executions = 38\n").unwrap();
        assert_eq!(cfg.policy.max_rounds, 15);
    }

    #[test]
    fn unparseable_toml_is_a_config_error() {
        assert!(matches!(FoundryConfig::parse("[policy"), Err(Error::ConfigError(_))));
    }

    #[test]
    fn load_rejects_unfinishable_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foundry.toml");
        std::fs::write(&path, "[policy]\nmax_rounds = 15\n").unwrap();
        assert_eq!(FoundryConfig::load(&path).policy.max_rounds, 2);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foundry.toml");
        let mut cfg = FoundryConfig::default();
        cfg.server.port = 9100;
        cfg.save(&path).unwrap();
        assert_eq!(FoundryConfig::load(&path).server.port, 9100);
        assert!(matches!(cfg.save(&dir.path().join("missing/foundry.toml")), Err(Error::IoError(_))));
    }

    #[test]
    fn portal_table_has_builtins_and_overrides() {
        let mut cfg = FoundryConfig::default();
        assert_eq!(cfg.portal_table().len(), 18);
        cfg.portals.insert("New Zealand".into(), "https://www.companies.govt.nz".into());
        cfg.portals.insert("india".into(), "https://www.mca.gov.in".into());
        let table = cfg.portal_table();
        assert_eq!(table.len(), 19);
        assert_eq!(table["new zealand"], "https://www.companies.govt.nz");
        assert_eq!(table["india"], "https://www.mca.gov.in");
    }

    #[test]
    fn credentials_debug_hides_values() {
        let creds = Credentials {
            groq_api_key: Some("gsk_secret".into()),
            ..Default::default()
        };
        let shown = format!("{:?}", creds);
        assert!(shown.contains("GROQ_API_KEY"));
        assert!(!shown.contains("gsk_secret"));
    }
}
