// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::dag::TaskDuration;
use crate::types::{RewardShaping, SimTime, StageId};
use crate::workload::{
    DEFAULT_MAX_STAGES, EpisodeParams, JobSpec, RandomDagParams, StageSpec, WorkerSpec,
};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [env]
/// moving_delay = 2000.0
/// reward = "holding_cost"
///
/// [workers]
/// count = 10
///
/// [workload]
/// num_init_jobs = 1
/// num_job_arrivals = 20
/// job_arrival_rate = 4e-5
/// templates = ["chain"]
///
/// [job.chain]
/// stages = [
///   { tasks = 2, duration = 1000.0 },
///   { tasks = 4, duration = { min = 400.0, max = 600.0 }, after = [0] },
/// ]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub env: EnvSection,

    #[serde(default)]
    pub workers: WorkersSection,

    #[serde(default)]
    pub workload: WorkloadSection,

    /// Job templates from `[job.<name>]`.
    #[serde(default)]
    pub job: BTreeMap<String, JobTemplateConfig>,
}

/// Validated configuration. Obtain one with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub env: EnvSection,
    pub workers: WorkersSection,
    pub workload: WorkloadSection,
    pub job: BTreeMap<String, JobTemplateConfig>,
}

impl ConfigFile {
    /// Assemble without validation; callers go through `TryFrom`.
    pub(crate) fn new_unchecked(
        env: EnvSection,
        workers: WorkersSection,
        workload: WorkloadSection,
        job: BTreeMap<String, JobTemplateConfig>,
    ) -> Self {
        Self {
            env,
            workers,
            workload,
            job,
        }
    }

    pub fn episode_params(&self) -> EpisodeParams {
        EpisodeParams {
            moving_delay: self.env.moving_delay,
            max_wall_time: self.env.max_wall_time,
            max_steps: self.env.max_steps,
            max_stages: self.env.max_stages,
            reward: self.env.reward,
            reward_scale: self.env.reward_scale,
        }
    }

    pub fn worker_specs(&self) -> Vec<WorkerSpec> {
        vec![
            WorkerSpec {
                class: self.workers.class.clone(),
            };
            self.workers.count
        ]
    }

    /// Templates named in `[workload].templates`, in listed order.
    pub fn templates(&self) -> Vec<JobSpec> {
        self.workload
            .templates
            .iter()
            .filter_map(|name| self.job.get(name).map(|t| t.to_job_spec(name)))
            .collect()
    }
}

/// `[env]` section: episode-wide simulation knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvSection {
    /// Delay for a worker to switch to a different job.
    #[serde(default = "default_moving_delay")]
    pub moving_delay: SimTime,

    #[serde(default)]
    pub max_wall_time: Option<SimTime>,

    #[serde(default)]
    pub max_steps: Option<u64>,

    #[serde(default = "default_max_stages")]
    pub max_stages: usize,

    /// `"holding_cost"` (default) or `"completions"`.
    #[serde(default)]
    pub reward: RewardShaping,

    #[serde(default = "default_reward_scale")]
    pub reward_scale: f64,
}

fn default_moving_delay() -> SimTime {
    2000.0
}

fn default_max_stages() -> usize {
    DEFAULT_MAX_STAGES
}

fn default_reward_scale() -> f64 {
    1e-3
}

impl Default for EnvSection {
    fn default() -> Self {
        Self {
            moving_delay: default_moving_delay(),
            max_wall_time: None,
            max_steps: None,
            max_stages: default_max_stages(),
            reward: RewardShaping::default(),
            reward_scale: default_reward_scale(),
        }
    }
}

/// `[workers]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersSection {
    #[serde(default = "default_worker_count")]
    pub count: usize,

    #[serde(default = "default_worker_class")]
    pub class: String,
}

fn default_worker_count() -> usize {
    10
}

fn default_worker_class() -> String {
    "default".to_string()
}

impl Default for WorkersSection {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            class: default_worker_class(),
        }
    }
}

/// `[workload]` section: how episodes are drawn.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadSection {
    /// Jobs present at time zero.
    #[serde(default = "default_num_init_jobs")]
    pub num_init_jobs: usize,

    /// Jobs arriving later, one Poisson process.
    #[serde(default = "default_num_job_arrivals")]
    pub num_job_arrivals: usize,

    #[serde(default = "default_job_arrival_rate")]
    pub job_arrival_rate: f64,

    /// Names of `[job.<name>]` templates to draw from. Empty means random
    /// DAGs shaped by `[workload.random]`.
    #[serde(default)]
    pub templates: Vec<String>,

    #[serde(default)]
    pub random: RandomSection,
}

fn default_num_init_jobs() -> usize {
    1
}

fn default_num_job_arrivals() -> usize {
    20
}

fn default_job_arrival_rate() -> f64 {
    4e-5
}

impl Default for WorkloadSection {
    fn default() -> Self {
        Self {
            num_init_jobs: default_num_init_jobs(),
            num_job_arrivals: default_num_job_arrivals(),
            job_arrival_rate: default_job_arrival_rate(),
            templates: Vec::new(),
            random: RandomSection::default(),
        }
    }
}

/// `[workload.random]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RandomSection {
    #[serde(default = "default_random_max_stages")]
    pub max_stages: usize,

    #[serde(default = "default_edge_probability")]
    pub edge_probability: f64,

    /// Inclusive `[min, max]` tasks per stage.
    #[serde(default = "default_tasks")]
    pub tasks: [usize; 2],

    /// Inclusive `[min, max]` task duration.
    #[serde(default = "default_task_duration")]
    pub task_duration: [SimTime; 2],
}

fn default_random_max_stages() -> usize {
    6
}

fn default_edge_probability() -> f64 {
    0.3
}

fn default_tasks() -> [usize; 2] {
    [1, 8]
}

fn default_task_duration() -> [SimTime; 2] {
    [500.0, 2000.0]
}

impl Default for RandomSection {
    fn default() -> Self {
        Self {
            max_stages: default_random_max_stages(),
            edge_probability: default_edge_probability(),
            tasks: default_tasks(),
            task_duration: default_task_duration(),
        }
    }
}

impl From<&RandomSection> for RandomDagParams {
    fn from(r: &RandomSection) -> Self {
        Self {
            max_stages: r.max_stages,
            edge_probability: r.edge_probability,
            min_tasks: r.tasks[0],
            max_tasks: r.tasks[1],
            min_task_duration: r.task_duration[0],
            max_task_duration: r.task_duration[1],
        }
    }
}

/// `[job.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobTemplateConfig {
    pub stages: Vec<StageConfig>,
}

impl JobTemplateConfig {
    /// Stage dependencies as `(predecessor, successor)` pairs.
    pub fn edges(&self) -> Vec<(StageId, StageId)> {
        self.stages
            .iter()
            .enumerate()
            .flat_map(|(id, s)| s.after.iter().map(move |&dep| (dep, id)))
            .collect()
    }

    pub fn to_job_spec(&self, name: &str) -> JobSpec {
        JobSpec {
            name: name.to_string(),
            stages: self
                .stages
                .iter()
                .map(|s| StageSpec {
                    num_tasks: s.tasks,
                    task_duration: s.duration.into(),
                })
                .collect(),
            edges: self.edges(),
        }
    }
}

/// One stage inside a job template.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    pub tasks: usize,

    pub duration: DurationConfig,

    /// Indices of stages this one waits for.
    #[serde(default)]
    pub after: Vec<StageId>,
}

/// `duration = 1000.0` or `duration = { min = 500.0, max = 1500.0 }`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DurationConfig {
    Fixed(SimTime),
    Uniform { min: SimTime, max: SimTime },
}

impl From<DurationConfig> for TaskDuration {
    fn from(d: DurationConfig) -> Self {
        match d {
            DurationConfig::Fixed(v) => TaskDuration::Fixed(v),
            DurationConfig::Uniform { min, max } => TaskDuration::Uniform { min, max },
        }
    }
}
