// src/dag/job.rs

//! Jobs: a DAG of stages plus per-episode progress.

use crate::dag::graph::StageGraph;
use crate::dag::stage::Stage;
use crate::errors::{Result, SimError};
use crate::types::{JobId, SimTime, StageId};
use crate::workload::JobArrival;

/// A job instantiated for one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub arrival_time: SimTime,
    /// Set once every stage has completed.
    pub completion_time: Option<SimTime>,
    stages: Vec<Stage>,
    graph: StageGraph,
    num_completed_stages: usize,
}

impl Job {
    /// Instantiate a job from its arrival record, validating its DAG.
    pub fn from_arrival(id: JobId, arrival: &JobArrival, max_stages: usize) -> Result<Self> {
        let spec = &arrival.job;

        if !arrival.arrival_time.is_finite() || arrival.arrival_time < 0.0 {
            return Err(SimError::InvalidJob(format!(
                "job {id} ('{}') has invalid arrival time {}",
                spec.name, arrival.arrival_time
            )));
        }

        let graph = StageGraph::new(spec.stages.len(), &spec.edges, max_stages).map_err(|e| match e {
            SimError::DagCycle(msg) => SimError::DagCycle(format!("job {id} ('{}'): {msg}", spec.name)),
            SimError::InvalidJob(msg) => SimError::InvalidJob(format!("job {id} ('{}'): {msg}", spec.name)),
            other => other,
        })?;

        let mut stages = Vec::with_capacity(spec.stages.len());
        for (stage_id, s) in spec.stages.iter().enumerate() {
            if s.num_tasks == 0 {
                return Err(SimError::InvalidJob(format!(
                    "job {id} ('{}'): stage {stage_id} has no tasks",
                    spec.name
                )));
            }
            if !s.task_duration.is_valid() {
                return Err(SimError::InvalidJob(format!(
                    "job {id} ('{}'): stage {stage_id} has invalid task duration {:?}",
                    spec.name, s.task_duration
                )));
            }
            stages.push(Stage::new(stage_id, s.num_tasks, s.task_duration));
        }

        Ok(Self {
            id,
            name: spec.name.clone(),
            arrival_time: arrival.arrival_time,
            completion_time: None,
            stages,
            graph,
            num_completed_stages: 0,
        })
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, stage: StageId) -> Option<&Stage> {
        self.stages.get(stage)
    }

    pub fn stage_mut(&mut self, stage: StageId) -> Option<&mut Stage> {
        self.stages.get_mut(stage)
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn num_completed_stages(&self) -> usize {
        self.num_completed_stages
    }

    pub fn is_complete(&self) -> bool {
        self.num_completed_stages == self.stages.len()
    }

    /// Time spent in the system, once complete.
    pub fn duration(&self) -> Option<SimTime> {
        self.completion_time.map(|t| t - self.arrival_time)
    }

    /// Record that one more stage finished.
    pub fn add_stage_completion(&mut self) {
        debug_assert!(self.num_completed_stages < self.stages.len());
        self.num_completed_stages += 1;
    }

    /// Stages with no dependencies.
    pub fn source_stages(&self) -> Vec<StageId> {
        self.graph.source_stages()
    }

    /// Whether every predecessor of `stage` has completed.
    pub fn deps_complete(&self, stage: StageId) -> bool {
        self.graph
            .predecessors_of(stage)
            .iter()
            .all(|&p| self.stages[p].is_complete())
    }

    /// Stages whose predecessors are all complete and which are not complete
    /// themselves, regardless of how many tasks are already dispatched.
    pub fn eligible_stages(&self) -> Vec<StageId> {
        self.stages
            .iter()
            .filter(|s| !s.is_complete() && self.deps_complete(s.id))
            .map(|s| s.id)
            .collect()
    }

    /// Whether `stage` can accept workers right now.
    pub fn is_in_frontier(&self, stage: StageId) -> bool {
        match self.stages.get(stage) {
            Some(s) => s.num_undispatched_tasks() > 0 && self.deps_complete(stage),
            None => false,
        }
    }

    /// Eligible stages that still have undispatched tasks.
    pub fn frontier(&self) -> Vec<StageId> {
        (0..self.stages.len())
            .filter(|&id| self.is_in_frontier(id))
            .collect()
    }

    /// If `stage` is complete, the successors whose predecessors are now all
    /// complete. Empty otherwise.
    pub fn new_frontier(&self, stage: StageId) -> Vec<StageId> {
        match self.stages.get(stage) {
            Some(s) if s.is_complete() => self
                .graph
                .successors_of(stage)
                .iter()
                .copied()
                .filter(|&succ| self.deps_complete(succ))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Per-stage critical path: the stage's remaining work plus the longest
    /// critical path among its successors.
    pub fn critical_paths(&self) -> Vec<SimTime> {
        let mut cp = vec![0.0; self.stages.len()];
        for stage in self.graph.topological_order().into_iter().rev() {
            let downstream = self
                .graph
                .successors_of(stage)
                .iter()
                .map(|&s| cp[s])
                .fold(0.0, f64::max);
            cp[stage] = self.stages[stage].remaining_work() + downstream;
        }
        cp
    }

    /// Length of the job's remaining critical path.
    pub fn critical_path(&self) -> SimTime {
        self.critical_paths().into_iter().fold(0.0, f64::max)
    }
}
