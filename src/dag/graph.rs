// src/dag/graph.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, SimError};
use crate::types::StageId;

/// Internal node structure: stores immediate predecessors and successors.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StageNode {
    /// Stages that must complete before this one can run.
    preds: Vec<StageId>,
    /// Stages that wait on this one.
    succs: Vec<StageId>,
}

/// Dependency structure of a single job, keyed by stage index.
///
/// Edges are `(predecessor, successor)` pairs. Construction rejects unknown
/// stage indices, self-edges, stage counts above the configured bound and
/// cycles, so every `StageGraph` in the system is a DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageGraph {
    nodes: Vec<StageNode>,
    edges: Vec<(StageId, StageId)>,
}

impl StageGraph {
    /// Build and validate a stage graph.
    pub fn new(num_stages: usize, edges: &[(StageId, StageId)], max_stages: usize) -> Result<Self> {
        if num_stages == 0 {
            return Err(SimError::InvalidJob("job must have at least one stage".to_string()));
        }
        if num_stages > max_stages {
            return Err(SimError::InvalidJob(format!(
                "job has {num_stages} stages, more than the maximum of {max_stages}"
            )));
        }

        let mut nodes = vec![
            StageNode {
                preds: Vec::new(),
                succs: Vec::new(),
            };
            num_stages
        ];
        let mut kept = Vec::with_capacity(edges.len());

        for &(from, to) in edges {
            if from >= num_stages || to >= num_stages {
                return Err(SimError::InvalidJob(format!(
                    "edge {from} -> {to} references a stage outside 0..{num_stages}"
                )));
            }
            if from == to {
                return Err(SimError::DagCycle(format!(
                    "stage {from} cannot depend on itself"
                )));
            }
            // Duplicate edges carry no extra meaning.
            if nodes[to].preds.contains(&from) {
                continue;
            }
            nodes[to].preds.push(from);
            nodes[from].succs.push(to);
            kept.push((from, to));
        }

        ensure_acyclic(num_stages, &kept)?;

        Ok(Self { nodes, edges: kept })
    }

    pub fn num_stages(&self) -> usize {
        self.nodes.len()
    }

    /// All `(predecessor, successor)` edges, in insertion order.
    pub fn edges(&self) -> &[(StageId, StageId)] {
        &self.edges
    }

    /// Stages with in-degree 0.
    pub fn source_stages(&self) -> Vec<StageId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.preds.is_empty())
            .map(|(id, _)| id)
            .collect()
    }

    /// Immediate predecessors of a stage.
    pub fn predecessors_of(&self, stage: StageId) -> &[StageId] {
        self.nodes
            .get(stage)
            .map(|n| n.preds.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate successors of a stage.
    pub fn successors_of(&self, stage: StageId) -> &[StageId] {
        self.nodes
            .get(stage)
            .map(|n| n.succs.as_slice())
            .unwrap_or(&[])
    }

    /// Stages in a topological order (predecessors before successors).
    pub fn topological_order(&self) -> Vec<StageId> {
        let graph = graph_map(self.nodes.len(), &self.edges);
        // Acyclicity was checked at construction.
        toposort(&graph, None).unwrap_or_else(|_| (0..self.nodes.len()).collect())
    }

    /// A stage on some cycle of `edges`, or `None` if they form a DAG.
    ///
    /// Edges must reference stages in `0..num_stages`.
    pub fn find_cycle(num_stages: usize, edges: &[(StageId, StageId)]) -> Option<StageId> {
        toposort(&graph_map(num_stages, edges), None)
            .err()
            .map(|cycle| cycle.node_id())
    }
}

/// Edge direction: predecessor -> successor.
fn graph_map(num_stages: usize, edges: &[(StageId, StageId)]) -> DiGraphMap<StageId, ()> {
    let mut graph: DiGraphMap<StageId, ()> = DiGraphMap::new();
    for id in 0..num_stages {
        graph.add_node(id);
    }
    for &(from, to) in edges {
        graph.add_edge(from, to, ());
    }
    graph
}

/// Reject cycles using a topological sort over a `petgraph` graph map.
fn ensure_acyclic(num_stages: usize, edges: &[(StageId, StageId)]) -> Result<()> {
    match StageGraph::find_cycle(num_stages, edges) {
        None => Ok(()),
        Some(stage) => Err(SimError::DagCycle(format!(
            "cycle detected in stage DAG involving stage {stage}"
        ))),
    }
}
