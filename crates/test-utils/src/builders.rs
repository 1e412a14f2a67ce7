#![allow(dead_code)]

use std::collections::BTreeMap;

use dagsched::config::{
    ConfigFile, DurationConfig, JobTemplateConfig, RawConfigFile, StageConfig,
};
use dagsched::dag::TaskDuration;
use dagsched::types::{SimTime, StageId};
use dagsched::workload::{Episode, EpisodeParams, JobArrival, JobSpec, StageSpec, WorkerSpec};

/// Builder for `JobSpec`. Stages are numbered in the order they are added.
pub struct JobSpecBuilder {
    job: JobSpec,
}

impl JobSpecBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            job: JobSpec {
                name: name.to_string(),
                stages: Vec::new(),
                edges: Vec::new(),
            },
        }
    }

    /// Stage with `tasks` tasks of fixed `duration`.
    pub fn stage(self, tasks: usize, duration: SimTime) -> Self {
        self.stage_with(tasks, TaskDuration::Fixed(duration))
    }

    pub fn stage_with(mut self, tasks: usize, duration: TaskDuration) -> Self {
        self.job.stages.push(StageSpec {
            num_tasks: tasks,
            task_duration: duration,
        });
        self
    }

    pub fn edge(mut self, from: StageId, to: StageId) -> Self {
        self.job.edges.push((from, to));
        self
    }

    /// Linear chain over all stages added so far.
    pub fn chained(mut self) -> Self {
        for to in 1..self.job.stages.len() {
            self.job.edges.push((to - 1, to));
        }
        self
    }

    pub fn build(self) -> JobSpec {
        self.job
    }
}

/// Builder for `Episode`.
pub struct EpisodeBuilder {
    episode: Episode,
}

impl EpisodeBuilder {
    pub fn new(num_workers: usize) -> Self {
        Self {
            episode: Episode::new(Vec::new(), num_workers, EpisodeParams::default()),
        }
    }

    pub fn job_at(mut self, arrival_time: SimTime, job: JobSpec) -> Self {
        self.episode.jobs.push(JobArrival { arrival_time, job });
        self
    }

    pub fn worker_class(mut self, class: &str) -> Self {
        for w in self.episode.workers.iter_mut() {
            *w = WorkerSpec {
                class: class.to_string(),
            };
        }
        self
    }

    pub fn moving_delay(mut self, delay: SimTime) -> Self {
        self.episode.params.moving_delay = delay;
        self
    }

    pub fn max_wall_time(mut self, limit: SimTime) -> Self {
        self.episode.params.max_wall_time = Some(limit);
        self
    }

    pub fn max_steps(mut self, steps: u64) -> Self {
        self.episode.params.max_steps = Some(steps);
        self
    }

    pub fn params(mut self, params: EpisodeParams) -> Self {
        self.episode.params = params;
        self
    }

    pub fn build(self) -> Episode {
        self.episode
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                job: BTreeMap::new(),
                ..RawConfigFile::default()
            },
        }
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers.count = count;
        self
    }

    pub fn moving_delay(mut self, delay: SimTime) -> Self {
        self.config.env.moving_delay = delay;
        self
    }

    pub fn arrivals(mut self, init: usize, later: usize, rate: f64) -> Self {
        self.config.workload.num_init_jobs = init;
        self.config.workload.num_job_arrivals = later;
        self.config.workload.job_arrival_rate = rate;
        self
    }

    /// Add `[job.<name>]` with `(tasks, duration, after)` stages and list it
    /// in `[workload].templates`.
    pub fn template(mut self, name: &str, stages: &[(usize, SimTime, &[StageId])]) -> Self {
        let template = JobTemplateConfig {
            stages: stages
                .iter()
                .map(|&(tasks, duration, after)| StageConfig {
                    tasks,
                    duration: DurationConfig::Fixed(duration),
                    after: after.to_vec(),
                })
                .collect(),
        };
        self.config.job.insert(name.to_string(), template);
        self.config.workload.templates.push(name.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
