//! Confidence-gated routing after the validation node

use foundry_core::config::PolicyConfig;
use foundry_core::CampaignRecord;
use tracing::{info, warn};

pub const RESEARCH_NODE: &str = "research_agent";
pub const STRATEGY_NODE: &str = "strategy_agent";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Re-run research with the audit's mismatches as corrective input.
    Retry,
    Proceed,
}

impl Route {
    pub fn target(self) -> &'static str {
        match self {
            Self::Retry => RESEARCH_NODE,
            Self::Proceed => STRATEGY_NODE,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ConfidenceRouter {
    pub threshold: f64,
    pub max_rounds: u32,
}

impl ConfidenceRouter {
    pub fn new(threshold: f64, max_rounds: u32) -> Self {
        Self { threshold, max_rounds }
    }

    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self::new(policy.confidence_threshold, policy.max_rounds)
    }

    /// Pure decision over the three routing inputs.
    pub fn decide(&self, confidence: f64, rounds: u32, mismatches: usize) -> Route {
        if confidence < self.threshold && rounds < self.max_rounds && mismatches > 0 {
            Route::Retry
        } else {
            Route::Proceed
        }
    }

    pub fn route(&self, record: &CampaignRecord) -> Route {
        let confidence = record.overall_confidence;
        let rounds = record.validation_rounds;
        let route = self.decide(confidence, rounds, record.validation_mismatches.len());
        match route {
            Route::Retry => info!(
                confidence,
                rounds,
                max_rounds = self.max_rounds,
                "Routing back to research"
            ),
            Route::Proceed => {
                if record.govt_fallback_only {
                    warn!("Government fallback mode active, proceeding with raw scrape only");
                }
                info!(confidence, rounds, "Routing to strategy");
            }
        }
        route
    }
}

impl Default for ConfidenceRouter {
    fn default() -> Self {
        Self::from_policy(&PolicyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn boundary_table() {
        let r = ConfidenceRouter::default();
        // (confidence, rounds, mismatches, expected)
        let cases = [
            (0.5, 0, 1, Route::Retry),
            (0.5, 1, 3, Route::Retry),
            (0.68, 0, 1, Route::Proceed),
            (0.6799, 1, 1, Route::Retry),
            (0.5, 2, 1, Route::Proceed),
            (0.5, 0, 0, Route::Proceed),
            (0.0, 0, 1, Route::Retry),
            (1.0, 0, 5, Route::Proceed),
        ];
        for (conf, rounds, mismatches, expected) in cases {
            assert_eq!(r.decide(conf, rounds, mismatches), expected, "{conf} {rounds} {mismatches}");
        }
    }

    #[test]
    fn targets() {
        assert_eq!(Route::Retry.target(), "research_agent");
        assert_eq!(Route::Proceed.target(), "strategy_agent");
    }

    #[test]
    fn routes_from_record_state() {
        let r = ConfidenceRouter::default();
        let mut record = CampaignRecord::new("x");
        record.overall_confidence = 0.5;
        record.validation_rounds = 1;
        record.validation_mismatches = vec!["Wrong authority".into()];
        assert_eq!(r.route(&record), Route::Retry);

        record.validation_rounds = 2;
        assert_eq!(r.route(&record), Route::Proceed);
    }

    proptest! {
        #[test]
        fn retry_iff_all_three_conditions(
            conf in 0.0f64..=1.0,
            rounds in 0u32..5,
            mismatches in 0usize..4,
        ) {
            let r = ConfidenceRouter::new(0.68, 2);
            let expected = conf < 0.68 && rounds < 2 && mismatches > 0;
            prop_assert_eq!(r.decide(conf, rounds, mismatches) == Route::Retry, expected);
        }
    }
}
