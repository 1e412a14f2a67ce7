// src/workload/spec.rs

//! Episode input types: what `Environment::reset` consumes.

use crate::dag::TaskDuration;
use crate::types::{RewardShaping, SimTime, StageId};

/// Default upper bound on stages per job; sizes the operation mask.
pub const DEFAULT_MAX_STAGES: usize = 20;

/// Static description of one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    pub num_tasks: usize,
    pub task_duration: TaskDuration,
}

/// Static description of one job: its stages and `(predecessor, successor)`
/// dependency edges between stage indices.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    /// Template or display name; not required to be unique.
    pub name: String,
    pub stages: Vec<StageSpec>,
    pub edges: Vec<(StageId, StageId)>,
}

/// A job together with the time it enters the system.
///
/// Jobs arriving at time `0` are already present when the episode starts.
#[derive(Debug, Clone, PartialEq)]
pub struct JobArrival {
    pub arrival_time: SimTime,
    pub job: JobSpec,
}

/// One entry of the worker manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    /// Worker class label (heterogeneous clusters); informational.
    pub class: String,
}

impl Default for WorkerSpec {
    fn default() -> Self {
        Self {
            class: "default".to_string(),
        }
    }
}

/// Episode-wide knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeParams {
    /// Delay before a worker can start work after switching jobs.
    pub moving_delay: SimTime,
    /// Truncate once simulated time reaches this value.
    pub max_wall_time: Option<SimTime>,
    /// Truncate after this many `step` calls.
    pub max_steps: Option<u64>,
    /// Upper bound on stages per job.
    pub max_stages: usize,
    pub reward: RewardShaping,
    pub reward_scale: f64,
}

impl Default for EpisodeParams {
    fn default() -> Self {
        Self {
            moving_delay: 0.0,
            max_wall_time: None,
            max_steps: None,
            max_stages: DEFAULT_MAX_STAGES,
            reward: RewardShaping::default(),
            reward_scale: 1.0,
        }
    }
}

/// Everything needed to start an episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    /// Arrival sequence; a job's position here is its `JobId`.
    pub jobs: Vec<JobArrival>,
    pub workers: Vec<WorkerSpec>,
    pub params: EpisodeParams,
}

impl Episode {
    /// Episode with `num_workers` default-class workers.
    pub fn new(jobs: Vec<JobArrival>, num_workers: usize, params: EpisodeParams) -> Self {
        Self {
            jobs,
            workers: vec![WorkerSpec::default(); num_workers],
            params,
        }
    }
}
