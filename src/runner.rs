// src/runner.rs

//! Episode driver: one environment, one policy, until the episode ends.

use anyhow::anyhow;
use tracing::{debug, info};

use crate::engine::{Environment, Observation};
use crate::errors::{Result, SimError};
use crate::policy::Policy;
use crate::types::{EpisodeStatus, SimTime};
use crate::workload::WorkloadGenerator;

/// What happened in one finished episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub seed: u64,
    pub total_reward: f64,
    pub steps: u64,
    pub final_time: SimTime,
    pub completed_jobs: usize,
    /// Mean job duration over completed jobs.
    pub avg_job_duration: Option<SimTime>,
    pub status: EpisodeStatus,
}

/// Step `env` with `policy`, starting from `observation`, until the episode
/// is completed or truncated.
///
/// Fails if the policy keeps declining to act while nothing is left to
/// advance time, which would otherwise loop forever.
pub fn run_episode<P: Policy + ?Sized>(
    env: &mut Environment,
    mut observation: Observation,
    policy: &mut P,
    seed: u64,
) -> Result<EpisodeSummary> {
    let mut status = env.status().ok_or(SimError::NotReset)?;

    while !status.is_done() {
        let decision = policy.propose(&observation);
        let outcome = env.step(decision)?;

        if decision.is_none() && outcome.observation == observation {
            return Err(SimError::Other(anyhow!(
                "policy '{}' stalled at time {} with no pending events",
                policy.name(),
                observation.time
            )));
        }

        observation = outcome.observation;
        status = outcome.status;
    }

    let summary = EpisodeSummary {
        seed,
        total_reward: env.total_reward(),
        steps: env.step_count(),
        final_time: env.current_time(),
        completed_jobs: env.num_completed_jobs(),
        avg_job_duration: env.avg_job_duration(),
        status,
    };
    debug!(policy = policy.name(), ?summary, "episode summary");
    Ok(summary)
}

/// Run one episode per seed, each drawn from `generator` with that seed.
pub fn evaluate<P: Policy + ?Sized>(
    generator: &WorkloadGenerator,
    policy: &mut P,
    seeds: impl IntoIterator<Item = u64>,
) -> Result<Vec<EpisodeSummary>> {
    let mut env = Environment::new();
    let mut summaries = Vec::new();

    for seed in seeds {
        let observation = env.reset_with(generator, seed)?;
        let summary = run_episode(&mut env, observation, policy, seed)?;
        info!(
            policy = policy.name(),
            seed,
            avg_job_duration = ?summary.avg_job_duration,
            status = ?summary.status,
            "evaluation episode finished"
        );
        summaries.push(summary);
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Decision;
    use crate::policy::FifoPolicy;
    use crate::workload::{Episode, EpisodeParams};

    struct Idle;

    impl Policy for Idle {
        fn name(&self) -> &str {
            "idle"
        }

        fn propose(&mut self, _: &Observation) -> Option<Decision> {
            None
        }
    }

    fn one_job_episode() -> Episode {
        use crate::dag::TaskDuration;
        use crate::workload::{JobArrival, JobSpec, StageSpec};

        Episode::new(
            vec![JobArrival {
                arrival_time: 0.0,
                job: JobSpec {
                    name: "j".to_string(),
                    stages: vec![StageSpec {
                        num_tasks: 3,
                        task_duration: TaskDuration::Fixed(2.0),
                    }],
                    edges: Vec::new(),
                },
            }],
            3,
            EpisodeParams::default(),
        )
    }

    #[test]
    fn fifo_finishes_single_job() {
        let mut env = Environment::new();
        let obs = env.reset(one_job_episode(), 1).unwrap();
        let summary = run_episode(&mut env, obs, &mut FifoPolicy::new(), 1).unwrap();
        assert_eq!(summary.status, EpisodeStatus::Completed);
        assert_eq!(summary.completed_jobs, 1);
        assert_eq!(summary.avg_job_duration, Some(2.0));
        assert_eq!(summary.steps, 1);
    }

    #[test]
    fn idle_policy_is_reported_as_stalled() {
        let mut env = Environment::new();
        let obs = env.reset(one_job_episode(), 1).unwrap();
        let err = run_episode(&mut env, obs, &mut Idle, 1).unwrap_err();
        assert!(err.to_string().contains("stalled"));
    }

    #[test]
    fn run_before_reset_fails() {
        let mut env = Environment::new();
        let obs = Environment::new().observe();
        assert!(obs.is_err());
        let dummy = {
            let mut other = Environment::new();
            other.reset(one_job_episode(), 0).unwrap()
        };
        assert!(matches!(
            run_episode(&mut env, dummy, &mut FifoPolicy::new(), 0),
            Err(SimError::NotReset)
        ));
    }
}
