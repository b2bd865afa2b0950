//! Graph runner: fixed topology, one conditional edge, full-replace merge
//!
//! The runner drives nodes one at a time, applies each diff to the record,
//! and reports a [`StepEvent`] per execution. Cycles are bounded twice: the
//! router stops retrying after `max_rounds`, and the runner aborts once
//! `max_node_executions` nodes have run.

use crate::node::{Node, NodeContext, NodeOutcome};
use crate::nodes::*;
use crate::router::{ConfidenceRouter, Route, RESEARCH_NODE, STRATEGY_NODE};
use foundry_core::{CampaignRecord, Error, Result};
use futures::Stream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edge {
    Always(&'static str),
    /// Decided by the confidence router after the node runs.
    Conditional { retry: &'static str, proceed: &'static str },
    End,
}

pub struct Topology {
    entry: &'static str,
    nodes: HashMap<&'static str, Arc<dyn Node>>,
    edges: HashMap<&'static str, Edge>,
}

impl Topology {
    /// Build and validate: the entry exists, node names are unique, every
    /// node has an outgoing edge, every edge target exists, and there is
    /// exactly one conditional edge.
    pub fn new(
        entry: &'static str,
        nodes: Vec<Arc<dyn Node>>,
        edges: Vec<(&'static str, Edge)>,
    ) -> Result<Self> {
        let mut by_name = HashMap::new();
        for node in nodes {
            let name = node.name();
            if by_name.insert(name, node).is_some() {
                return Err(Error::InvalidTopology(format!("duplicate node {name}")));
            }
        }
        if !by_name.contains_key(entry) {
            return Err(Error::InvalidTopology(format!("entry node {entry} is not registered")));
        }

        let mut edge_map = HashMap::new();
        for (from, edge) in edges {
            if !by_name.contains_key(from) {
                return Err(Error::InvalidTopology(format!("edge from unknown node {from}")));
            }
            let targets: Vec<&str> = match &edge {
                Edge::Always(to) => vec![*to],
                Edge::Conditional { retry, proceed } => vec![*retry, *proceed],
                Edge::End => vec![],
            };
            if let Some(missing) = targets.iter().find(|t| !by_name.contains_key(**t)) {
                return Err(Error::InvalidTopology(format!("edge {from} -> {missing} targets unknown node")));
            }
            if edge_map.insert(from, edge).is_some() {
                return Err(Error::InvalidTopology(format!("node {from} has two outgoing edges")));
            }
        }

        if let Some(orphan) = by_name.keys().find(|n| !edge_map.contains_key(**n)) {
            return Err(Error::InvalidTopology(format!("node {orphan} has no outgoing edge")));
        }
        let conditionals = edge_map.values().filter(|e| matches!(e, Edge::Conditional { .. })).count();
        if conditionals != 1 {
            return Err(Error::InvalidTopology(format!(
                "expected exactly one conditional edge, found {conditionals}"
            )));
        }

        Ok(Self { entry, nodes: by_name, edges: edge_map })
    }

    /// planner → jurisdiction → research → validation ⇄ research, then
    /// strategy → content → design → web → brd → ops.
    pub fn campaign() -> Result<Self> {
        let nodes: Vec<Arc<dyn Node>> = vec![
            Arc::new(PlannerNode),
            Arc::new(JurisdictionNode),
            Arc::new(ResearchNode),
            Arc::new(ValidationNode),
            Arc::new(StrategyNode),
            Arc::new(ContentNode),
            Arc::new(DesignNode),
            Arc::new(WebNode),
            Arc::new(BrdNode),
            Arc::new(OpsNode),
        ];
        let edges = vec![
            ("planner_agent", Edge::Always("jurisdiction_agent")),
            ("jurisdiction_agent", Edge::Always(RESEARCH_NODE)),
            (RESEARCH_NODE, Edge::Always("validation_agent")),
            ("validation_agent", Edge::Conditional { retry: RESEARCH_NODE, proceed: STRATEGY_NODE }),
            (STRATEGY_NODE, Edge::Always("content_agent")),
            ("content_agent", Edge::Always("design_agent")),
            ("design_agent", Edge::Always("web_agent")),
            ("web_agent", Edge::Always("brd_agent")),
            ("brd_agent", Edge::Always("ops_agent")),
            ("ops_agent", Edge::End),
        ];
        Self::new("planner_agent", nodes, edges)
    }

    pub fn entry(&self) -> &'static str {
        self.entry
    }

    pub fn edge(&self, from: &str) -> Option<&Edge> {
        self.edges.get(from)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeKind {
    Complete,
    Degraded,
}

/// One node execution, with the full record after its diff was applied.
#[derive(Clone, Debug)]
pub struct StepEvent {
    pub step: u64,
    pub node: &'static str,
    pub outcome: OutcomeKind,
    pub reason: Option<String>,
    pub snapshot: CampaignRecord,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("run cancelled after {0} steps")]
    Cancelled(u64),

    #[error("node execution ceiling of {0} exceeded")]
    CeilingExceeded(usize),

    #[error("runner task failed: {0}")]
    Aborted(String),
}

/// What [`GraphRunner::stream`] yields: every step, then the final result.
#[derive(Debug)]
pub enum RunUpdate {
    Step(StepEvent),
    Finished(std::result::Result<CampaignRecord, RunError>),
}

pub struct GraphRunner {
    topology: Topology,
    ctx: NodeContext,
    router: ConfidenceRouter,
    max_node_executions: usize,
}

impl GraphRunner {
    pub fn new(topology: Topology, ctx: NodeContext) -> Self {
        let router = ConfidenceRouter::from_policy(&ctx.policy);
        let max_node_executions = ctx.policy.max_node_executions;
        Self { topology, ctx, router, max_node_executions }
    }

    /// The campaign pipeline over `ctx`.
    pub fn campaign(ctx: NodeContext) -> Result<Self> {
        Ok(Self::new(Topology::campaign()?, ctx))
    }

    pub fn context(&self) -> &NodeContext {
        &self.ctx
    }

    /// Run to completion. Each executed node produces one event on `events`;
    /// a dropped receiver is treated like cancellation.
    pub async fn run(
        &self,
        mut record: CampaignRecord,
        events: mpsc::Sender<StepEvent>,
        cancel: CancellationToken,
    ) -> std::result::Result<CampaignRecord, RunError> {
        let mut current = self.topology.entry;
        let mut step: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                info!(step, "Run cancelled");
                return Err(RunError::Cancelled(step));
            }
            if step as usize >= self.max_node_executions {
                warn!(limit = self.max_node_executions, "Node execution ceiling reached");
                return Err(RunError::CeilingExceeded(self.max_node_executions));
            }

            let Some(node) = self.topology.nodes.get(current) else {
                return Err(RunError::Aborted(format!("unknown node {current}")));
            };

            debug!(node = current, step = step + 1, "Running node");
            let outcome = tokio::select! {
                outcome = node.run(&record, &self.ctx) => outcome,
                _ = cancel.cancelled() => {
                    info!(node = current, step, "Run cancelled mid-node");
                    return Err(RunError::Cancelled(step));
                }
            };

            let (kind, reason) = match &outcome {
                NodeOutcome::Complete(_) => (OutcomeKind::Complete, None),
                NodeOutcome::Degraded { reason, .. } => {
                    warn!(node = current, reason = %reason, "Node degraded");
                    (OutcomeKind::Degraded, Some(reason.clone()))
                }
            };
            let diff = outcome.into_diff();
            debug!(node = current, fields = ?diff.changed_fields(), "Applying diff");
            record.apply(diff);
            step += 1;
            info!(node = current, step, confidence = record.overall_confidence, "Node finished");

            let event = StepEvent {
                step,
                node: current,
                outcome: kind,
                reason,
                snapshot: record.clone(),
            };
            if events.send(event).await.is_err() {
                info!(step, "Event receiver dropped, stopping run");
                return Err(RunError::Cancelled(step));
            }

            current = match self.topology.edge(current) {
                Some(Edge::Always(next)) => *next,
                Some(Edge::Conditional { retry, proceed }) => match self.router.route(&record) {
                    Route::Retry => *retry,
                    Route::Proceed => *proceed,
                },
                Some(Edge::End) | None => break,
            };
        }

        info!(steps = step, "Run complete");
        Ok(record)
    }

    /// Stream of step updates followed by the final result. Dropping the
    /// stream stops the run at the next node boundary.
    pub fn stream(
        self: Arc<Self>,
        record: CampaignRecord,
        cancel: CancellationToken,
    ) -> impl Stream<Item = RunUpdate> + Send {
        async_stream::stream! {
            let (tx, mut rx) = mpsc::channel(32);
            let runner = self.clone();
            let handle = tokio::spawn(async move { runner.run(record, tx, cancel).await });

            while let Some(event) = rx.recv().await {
                yield RunUpdate::Step(event);
            }
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(RunError::Aborted(e.to_string())),
            };
            yield RunUpdate::Finished(result);
        }
    }
}
