// src/workload/generator.rs

//! Random episode generation.
//!
//! An episode consists of `num_init_jobs` jobs present at time zero followed
//! by `num_job_arrivals` jobs whose inter-arrival times are exponentially
//! distributed with rate `job_arrival_rate`. Each job's DAG is drawn
//! uniformly from the configured templates, or generated at random when no
//! templates are given.

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::config::ConfigFile;
use crate::dag::TaskDuration;
use crate::types::{SimTime, StageId};
use crate::workload::spec::{Episode, EpisodeParams, JobArrival, JobSpec, StageSpec, WorkerSpec};

/// Shape of randomly generated DAGs.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomDagParams {
    pub max_stages: usize,
    /// Probability of an edge `i -> j` for every `i < j`.
    pub edge_probability: f64,
    pub min_tasks: usize,
    pub max_tasks: usize,
    pub min_task_duration: SimTime,
    pub max_task_duration: SimTime,
}

impl Default for RandomDagParams {
    fn default() -> Self {
        Self {
            max_stages: 6,
            edge_probability: 0.3,
            min_tasks: 1,
            max_tasks: 8,
            min_task_duration: 500.0,
            max_task_duration: 2000.0,
        }
    }
}

/// Produces episodes from a fixed description and a caller-supplied random
/// source.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadGenerator {
    pub num_init_jobs: usize,
    pub num_job_arrivals: usize,
    /// Mean arrivals per unit of simulated time.
    pub job_arrival_rate: f64,
    /// Job shapes to draw from; random DAGs when empty.
    pub templates: Vec<JobSpec>,
    pub random_dag: RandomDagParams,
    pub workers: Vec<WorkerSpec>,
    pub params: EpisodeParams,
}

impl WorkloadGenerator {
    /// Build from a validated config.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            num_init_jobs: cfg.workload.num_init_jobs,
            num_job_arrivals: cfg.workload.num_job_arrivals,
            job_arrival_rate: cfg.workload.job_arrival_rate,
            templates: cfg.templates(),
            random_dag: RandomDagParams::from(&cfg.workload.random),
            workers: cfg.worker_specs(),
            params: cfg.episode_params(),
        }
    }

    /// Draw one episode.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Episode {
        let total = self.num_init_jobs + self.num_job_arrivals;
        let mut jobs = Vec::with_capacity(total);
        let mut t: SimTime = 0.0;

        for i in 0..total {
            if i >= self.num_init_jobs {
                t += sample_exponential(rng, self.job_arrival_rate);
            }
            let job = self.draw_job(rng, i);
            jobs.push(JobArrival {
                arrival_time: t,
                job,
            });
        }

        debug!(
            num_jobs = jobs.len(),
            last_arrival = t,
            "generated episode workload"
        );

        Episode {
            jobs,
            workers: self.workers.clone(),
            params: self.params.clone(),
        }
    }

    fn draw_job<R: Rng + ?Sized>(&self, rng: &mut R, index: usize) -> JobSpec {
        match self.templates.choose(rng) {
            Some(template) => template.clone(),
            None => random_job(rng, &self.random_dag, index),
        }
    }
}

/// Inverse-CDF sample of an exponential inter-arrival time.
fn sample_exponential<R: Rng + ?Sized>(rng: &mut R, rate: f64) -> SimTime {
    if rate <= 0.0 {
        return 0.0;
    }
    let u: f64 = rng.random();
    -(1.0 - u).ln() / rate
}

/// Random DAG over `1..=max_stages` stages with edges only from lower to
/// higher stage index, so the result is acyclic by construction.
pub fn random_job<R: Rng + ?Sized>(rng: &mut R, params: &RandomDagParams, index: usize) -> JobSpec {
    let num_stages = rng.random_range(1..=params.max_stages.max(1));
    let min_tasks = params.min_tasks.max(1);
    let max_tasks = params.max_tasks.max(min_tasks);

    let stages = (0..num_stages)
        .map(|_| {
            let duration = if params.max_task_duration > params.min_task_duration {
                rng.random_range(params.min_task_duration..=params.max_task_duration)
            } else {
                params.min_task_duration
            };
            StageSpec {
                num_tasks: rng.random_range(min_tasks..=max_tasks),
                task_duration: TaskDuration::Fixed(duration),
            }
        })
        .collect();

    let mut edges: Vec<(StageId, StageId)> = Vec::new();
    for to in 1..num_stages {
        for from in 0..to {
            if rng.random_bool(params.edge_probability.clamp(0.0, 1.0)) {
                edges.push((from, to));
            }
        }
    }

    JobSpec {
        name: format!("random_{index}"),
        stages,
        edges,
    }
}
