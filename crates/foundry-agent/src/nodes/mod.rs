//! The ten pipeline nodes, in execution order

pub mod brd;
pub mod content;
pub mod design;
pub mod jurisdiction;
pub mod ops;
pub mod planner;
pub mod research;
pub mod strategy;
pub mod validation;
pub mod web;

pub use brd::BrdNode;
pub use content::ContentNode;
pub use design::DesignNode;
pub use jurisdiction::JurisdictionNode;
pub use ops::OpsNode;
pub use planner::{infer_plan, PlannerNode, PlannerOutput};
pub use research::ResearchNode;
pub use strategy::StrategyNode;
pub use validation::ValidationNode;
pub use web::WebNode;
