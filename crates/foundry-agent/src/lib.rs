//! Foundry Agent - the campaign pipeline
//!
//! Nodes implement [`Node`] and never fail; the [`GraphRunner`] drives them
//! over a fixed [`Topology`], merging each diff into the record and routing
//! the validation loop through the [`ConfidenceRouter`].

pub mod graph;
pub mod jurisdiction;
pub mod landing;
pub mod node;
pub mod nodes;
pub mod router;

pub use graph::{Edge, GraphRunner, OutcomeKind, RunError, RunUpdate, StepEvent, Topology};
pub use jurisdiction::{lookup_portal, JurisdictionResolver, Resolved, Tier};
pub use landing::{build_landing_page, display_company, extract_sections, generate_landing_page, LandingInputs};
pub use node::{Node, NodeContext, NodeOutcome};
pub use nodes::{infer_plan, PlannerOutput};
pub use router::{ConfidenceRouter, Route};
