// src/engine/env.rs

//! Scheduling state machine.
//!
//! [`Environment`] is the synchronous core of the simulator. An external
//! decision-maker calls [`Environment::reset`] once per episode, then
//! [`Environment::step`] repeatedly with either a [`Decision`] or `None`.
//! Each `step` applies the decision, drains the timeline until the next
//! decision point, and reports the new observation, the reward accrued in
//! between, and whether the episode is over.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::dag::Job;
use crate::engine::event_handlers::{apply_decision, handle_event};
use crate::engine::observation::Observation;
use crate::engine::reward::RewardModel;
use crate::engine::timeline::{Event, Timeline};
use crate::engine::workers::WorkerPool;
use crate::engine::{Decision, StepOutcome};
use crate::errors::{Result, SimError};
use crate::types::{EpisodeStatus, JobId, SimTime};
use crate::workload::{Episode, EpisodeParams, WorkloadGenerator};

/// Lifecycle of an [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvPhase {
    /// Constructed, never reset.
    Uninitialized,
    /// Reset, no `step` yet.
    Ready,
    /// At least one `step` taken, episode not over.
    Running,
    /// Episode completed or truncated.
    Terminal,
}

/// Mutable state of one episode.
///
/// Owned exclusively by its [`Environment`]; event handlers borrow it
/// mutably for the duration of one event.
#[derive(Debug)]
pub(crate) struct SimState {
    pub(crate) time: SimTime,
    /// Every job of the episode, indexed by `JobId`. Inactive until arrival.
    pub(crate) jobs: Vec<Job>,
    /// Arrived, incomplete jobs, ascending by id.
    pub(crate) active_job_ids: Vec<JobId>,
    /// Completed jobs in completion order.
    pub(crate) completed_job_ids: Vec<JobId>,
    pub(crate) workers: WorkerPool,
    pub(crate) timeline: Timeline,
    pub(crate) params: EpisodeParams,
    pub(crate) reward_model: RewardModel,
    pub(crate) rng: StdRng,
    pub(crate) step_count: u64,
    pub(crate) total_reward: f64,
    pub(crate) status: EpisodeStatus,
}

impl SimState {
    /// Validate an episode and build its initial state. Nothing outside the
    /// returned value is touched, so a failure leaves any running episode
    /// intact.
    pub(crate) fn new(episode: Episode, rng: StdRng) -> Result<Self> {
        let Episode {
            jobs: arrivals,
            workers,
            params,
        } = episode;

        if workers.is_empty() {
            return Err(SimError::ConfigError(
                "episode needs at least one worker".to_string(),
            ));
        }
        if params.max_stages == 0 {
            return Err(SimError::ConfigError(
                "max_stages must be >= 1".to_string(),
            ));
        }
        if !params.moving_delay.is_finite() || params.moving_delay < 0.0 {
            return Err(SimError::ConfigError(format!(
                "moving_delay must be a non-negative number (got {})",
                params.moving_delay
            )));
        }

        let jobs = arrivals
            .iter()
            .enumerate()
            .map(|(id, arrival)| Job::from_arrival(id, arrival, params.max_stages))
            .collect::<Result<Vec<_>>>()?;

        let mut state = SimState {
            time: 0.0,
            jobs,
            active_job_ids: Vec::new(),
            completed_job_ids: Vec::new(),
            workers: WorkerPool::new(&workers),
            timeline: Timeline::new(),
            reward_model: RewardModel::new(params.reward, params.reward_scale),
            params,
            rng,
            step_count: 0,
            total_reward: 0.0,
            status: EpisodeStatus::Running,
        };

        for job in 0..state.jobs.len() {
            let arrival_time = state.jobs[job].arrival_time;
            if arrival_time <= 0.0 {
                state.activate_job(job);
            } else {
                state.timeline.schedule(arrival_time, Event::JobArrival { job });
            }
        }

        info!(
            num_jobs = state.jobs.len(),
            initial_jobs = state.active_job_ids.len(),
            num_workers = state.workers.len(),
            "environment reset"
        );

        state.status = state.evaluate_status();
        Ok(state)
    }

    /// Whether some free worker could be committed to some frontier stage.
    pub(crate) fn actions_available(&self) -> bool {
        self.workers.num_free() > 0
            && self
                .active_job_ids
                .iter()
                .any(|&id| !self.jobs[id].frontier().is_empty())
    }

    pub(crate) fn activate_job(&mut self, job: JobId) {
        if let Err(pos) = self.active_job_ids.binary_search(&job) {
            self.active_job_ids.insert(pos, job);
        }
    }

    pub(crate) fn deactivate_job(&mut self, job: JobId) {
        if let Ok(pos) = self.active_job_ids.binary_search(&job) {
            self.active_job_ids.remove(pos);
        }
    }

    fn observe(&self) -> Observation {
        Observation::capture(
            self.time,
            &self.jobs,
            &self.active_job_ids,
            &self.workers,
            self.params.max_stages,
        )
    }

    fn wall_time_exhausted(&self) -> bool {
        matches!(self.params.max_wall_time, Some(limit) if self.time >= limit)
    }

    /// Check a decision against the current masks without mutating anything.
    fn validate(&self, decision: &Decision) -> Result<()> {
        let in_frontier = self.active_job_ids.binary_search(&decision.job).is_ok()
            && self.jobs[decision.job].is_in_frontier(decision.stage);
        let free = self.workers.num_free();

        if !in_frontier || free == 0 {
            return Err(SimError::InvalidStage {
                job: decision.job,
                stage: decision.stage,
            });
        }
        if decision.parallelism == 0 || decision.parallelism > free {
            return Err(SimError::InvalidParallelism {
                requested: decision.parallelism,
                free,
            });
        }
        Ok(())
    }

    /// Pop and process events until a decision point, the end of the
    /// timeline, or the wall-time budget. Returns the reward accrued.
    ///
    /// All events sharing the current timestamp are processed before
    /// yielding, so an observation never shows half of an instant.
    fn drain(&mut self, mut must_advance: bool) -> f64 {
        let mut reward = 0.0;

        loop {
            let Some(next_time) = self.timeline.peek_time() else {
                break;
            };

            let same_instant = next_time <= self.time;
            if !must_advance && !same_instant && self.actions_available() {
                break;
            }

            if let Some(limit) = self.params.max_wall_time {
                if next_time > limit {
                    reward += self
                        .reward_model
                        .on_elapsed(limit - self.time, self.active_job_ids.len());
                    self.time = limit;
                    debug!(time = self.time, "wall-time budget reached");
                    break;
                }
            }

            let Some((time, event)) = self.timeline.pop_next() else {
                break;
            };
            reward += self
                .reward_model
                .on_elapsed(time - self.time, self.active_job_ids.len());
            self.time = self.time.max(time);
            reward += handle_event(self, event);
            must_advance = false;
        }

        reward
    }

    fn evaluate_status(&self) -> EpisodeStatus {
        if !self.timeline.has_pending_arrivals() && self.active_job_ids.is_empty() {
            EpisodeStatus::Completed
        } else if self.wall_time_exhausted() {
            EpisodeStatus::Truncated
        } else if matches!(self.params.max_steps, Some(max) if self.step_count >= max) {
            EpisodeStatus::Truncated
        } else {
            EpisodeStatus::Running
        }
    }
}

/// One simulation instance. Single-threaded; independent instances share
/// nothing and may run on separate threads.
#[derive(Debug)]
pub struct Environment {
    phase: EnvPhase,
    state: Option<SimState>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            phase: EnvPhase::Uninitialized,
            state: None,
        }
    }

    pub fn phase(&self) -> EnvPhase {
        self.phase
    }

    /// Start a new episode, discarding any previous one.
    ///
    /// `seed` initialises the environment's only random source, which is
    /// used to sample task durations.
    pub fn reset(&mut self, episode: Episode, seed: u64) -> Result<Observation> {
        self.reset_with_rng(episode, StdRng::seed_from_u64(seed))
    }

    /// Seed the random source, draw an episode from `generator` with it, and
    /// start that episode. The same source then samples task durations.
    pub fn reset_with(&mut self, generator: &WorkloadGenerator, seed: u64) -> Result<Observation> {
        let mut rng = StdRng::seed_from_u64(seed);
        let episode = generator.generate(&mut rng);
        self.reset_with_rng(episode, rng)
    }

    fn reset_with_rng(&mut self, episode: Episode, rng: StdRng) -> Result<Observation> {
        let state = SimState::new(episode, rng)?;
        Ok(self.install(state))
    }

    /// Replace the current episode with a freshly built one.
    pub(crate) fn install(&mut self, state: SimState) -> Observation {
        let observation = state.observe();
        self.phase = if state.status.is_done() {
            EnvPhase::Terminal
        } else {
            EnvPhase::Ready
        };
        self.state = Some(state);
        observation
    }

    /// Apply `decision` (or none) and advance simulated time to the next
    /// decision point.
    ///
    /// Invalid decisions are rejected before any state changes, so the
    /// observation after a rejection equals the one before it.
    pub fn step(&mut self, decision: Option<Decision>) -> Result<StepOutcome> {
        if let Err(e) = self.check(decision.as_ref()) {
            if let Some(d) = &decision {
                warn!(job = d.job, stage = d.stage, parallelism = d.parallelism, error = %e, "decision rejected");
            }
            return Err(e);
        }
        let state = self.state.as_mut().ok_or(SimError::NotReset)?;

        self.phase = EnvPhase::Running;
        state.step_count += 1;

        let must_advance = match decision {
            Some(d) => {
                apply_decision(state, d)?;
                false
            }
            None => true,
        };
        let reward = state.drain(must_advance);

        state.total_reward += reward;
        state.status = state.evaluate_status();
        if state.status.is_done() {
            self.phase = EnvPhase::Terminal;
            info!(
                status = ?state.status,
                time = state.time,
                steps = state.step_count,
                completed_jobs = state.completed_job_ids.len(),
                total_reward = state.total_reward,
                "episode finished"
            );
        }

        Ok(StepOutcome {
            observation: state.observe(),
            reward,
            status: state.status,
        })
    }

    /// Whether `step` would accept `decision` right now. Never mutates.
    pub fn check(&self, decision: Option<&Decision>) -> Result<()> {
        let state = self.state.as_ref().ok_or(SimError::NotReset)?;
        if self.phase == EnvPhase::Terminal {
            return Err(SimError::EpisodeFinished);
        }
        match decision {
            Some(d) => state.validate(d),
            None => Ok(()),
        }
    }

    /// Current observation, recomputed from state.
    pub fn observe(&self) -> Result<Observation> {
        self.state
            .as_ref()
            .map(SimState::observe)
            .ok_or(SimError::NotReset)
    }

    pub fn status(&self) -> Option<EpisodeStatus> {
        self.state.as_ref().map(|s| s.status)
    }

    pub fn current_time(&self) -> SimTime {
        self.state.as_ref().map_or(0.0, |s| s.time)
    }

    pub fn step_count(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.step_count)
    }

    pub fn total_reward(&self) -> f64 {
        self.state.as_ref().map_or(0.0, |s| s.total_reward)
    }

    /// All jobs of the current episode, indexed by id.
    pub fn jobs(&self) -> &[Job] {
        self.state
            .as_ref()
            .map(|s| s.jobs.as_slice())
            .unwrap_or(&[])
    }

    pub fn active_job_ids(&self) -> &[JobId] {
        self.state
            .as_ref()
            .map(|s| s.active_job_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn workers(&self) -> Option<&WorkerPool> {
        self.state.as_ref().map(|s| &s.workers)
    }

    pub fn num_completed_jobs(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.completed_job_ids.len())
    }

    /// `completion − arrival` for every completed job, in completion order.
    pub fn job_durations(&self) -> Vec<SimTime> {
        match &self.state {
            Some(s) => s
                .completed_job_ids
                .iter()
                .filter_map(|&id| s.jobs[id].duration())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Mean time in system over completed jobs; `None` if none completed.
    pub fn avg_job_duration(&self) -> Option<SimTime> {
        let durations = self.job_durations();
        if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<SimTime>() / durations.len() as SimTime)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::TaskDuration;
    use crate::workload::{JobArrival, JobSpec, StageSpec};

    fn single_stage_job(arrival_time: SimTime, tasks: usize, duration: SimTime) -> JobArrival {
        JobArrival {
            arrival_time,
            job: JobSpec {
                name: "single".to_string(),
                stages: vec![StageSpec {
                    num_tasks: tasks,
                    task_duration: TaskDuration::Fixed(duration),
                }],
                edges: Vec::new(),
            },
        }
    }

    #[test]
    fn step_before_reset_is_rejected() {
        let mut env = Environment::new();
        assert!(matches!(env.step(None), Err(SimError::NotReset)));
        assert!(matches!(env.observe(), Err(SimError::NotReset)));
        assert_eq!(env.phase(), EnvPhase::Uninitialized);
    }

    #[test]
    fn check_mirrors_step_without_side_effects() {
        let mut env = Environment::new();
        assert!(matches!(env.check(None), Err(SimError::NotReset)));

        env.reset(Episode::new(vec![single_stage_job(0.0, 1, 2.0)], 1, EpisodeParams::default()), 0)
            .unwrap();
        let ok = Decision::new(0, 0, 1);
        assert!(env.check(Some(&ok)).is_ok());
        assert!(matches!(
            env.check(Some(&Decision::new(0, 0, 2))),
            Err(SimError::InvalidParallelism { requested: 2, free: 1 })
        ));
        assert_eq!(env.step_count(), 0);
        assert_eq!(env.phase(), EnvPhase::Ready);

        env.step(Some(ok)).unwrap();
        assert!(matches!(env.check(None), Err(SimError::EpisodeFinished)));
    }

    #[test]
    fn parallel_tasks_divide_stage_duration() {
        let mut env = Environment::new();
        let episode = Episode::new(vec![single_stage_job(0.0, 4, 10.0)], 2, EpisodeParams::default());
        env.reset(episode, 0).unwrap();

        let out = env.step(Some(Decision::new(0, 0, 2))).unwrap();
        assert_eq!(out.status, EpisodeStatus::Completed);
        assert_eq!(env.current_time(), 20.0);
        assert_eq!(env.avg_job_duration(), Some(20.0));
        // One job held for 20 time units.
        assert_eq!(out.reward, -20.0);
        assert_eq!(env.phase(), EnvPhase::Terminal);
        assert!(matches!(env.step(None), Err(SimError::EpisodeFinished)));
    }

    #[test]
    fn surplus_parallelism_stays_free() {
        let mut env = Environment::new();
        let jobs = vec![single_stage_job(0.0, 1, 5.0), single_stage_job(0.0, 1, 5.0)];
        env.reset(Episode::new(jobs, 3, EpisodeParams::default()), 0).unwrap();

        let out = env.step(Some(Decision::new(0, 0, 3))).unwrap();
        // Only one task to run: two workers remain free and job 1 is still
        // schedulable at time 0.
        assert_eq!(out.observation.time, 0.0);
        assert_eq!(out.observation.num_free_workers, 2);
        assert!(out.observation.op_mask.is_set(1, 0));
        assert!(!out.observation.op_mask.is_set(0, 0));
    }

    #[test]
    fn moving_delay_applies_when_switching_jobs() {
        let params = EpisodeParams {
            moving_delay: 3.0,
            ..EpisodeParams::default()
        };
        let jobs = vec![single_stage_job(0.0, 1, 1.0), single_stage_job(0.0, 1, 1.0)];
        let mut env = Environment::new();
        env.reset(Episode::new(jobs, 1, params), 0).unwrap();

        // Unaffiliated worker starts immediately on job 0.
        let out = env.step(Some(Decision::new(0, 0, 1))).unwrap();
        assert_eq!(out.observation.time, 1.0);

        // Switching to job 1 costs the movement delay.
        let out = env.step(Some(Decision::new(1, 0, 1))).unwrap();
        assert_eq!(out.status, EpisodeStatus::Completed);
        assert_eq!(env.current_time(), 5.0);
        assert_eq!(env.job_durations(), vec![1.0, 5.0]);
    }

    #[test]
    fn waits_for_future_arrivals_with_empty_decision() {
        let mut env = Environment::new();
        let obs = env
            .reset(
                Episode::new(vec![single_stage_job(7.0, 1, 1.0)], 1, EpisodeParams::default()),
                0,
            )
            .unwrap();
        assert!(!obs.actions_available);
        assert!(obs.active_job_ids.is_empty());

        let out = env.step(None).unwrap();
        assert_eq!(out.status, EpisodeStatus::Running);
        assert_eq!(out.observation.time, 7.0);
        assert_eq!(out.observation.active_job_ids, vec![0]);
        // No job was present before the arrival.
        assert_eq!(out.reward, 0.0);
    }

    #[test]
    fn wall_time_budget_truncates() {
        let params = EpisodeParams {
            max_wall_time: Some(4.0),
            ..EpisodeParams::default()
        };
        let mut env = Environment::new();
        env.reset(Episode::new(vec![single_stage_job(0.0, 1, 10.0)], 1, params), 0)
            .unwrap();

        let out = env.step(Some(Decision::new(0, 0, 1))).unwrap();
        assert_eq!(out.status, EpisodeStatus::Truncated);
        assert_eq!(out.observation.time, 4.0);
        assert_eq!(out.reward, -4.0);
        assert_eq!(env.num_completed_jobs(), 0);
        assert_eq!(env.avg_job_duration(), None);
    }

    #[test]
    fn step_budget_truncates() {
        let params = EpisodeParams {
            max_steps: Some(1),
            ..EpisodeParams::default()
        };
        let jobs = vec![single_stage_job(0.0, 1, 1.0), single_stage_job(0.0, 1, 1.0)];
        let mut env = Environment::new();
        env.reset(Episode::new(jobs, 1, params), 0).unwrap();

        let out = env.step(Some(Decision::new(0, 0, 1))).unwrap();
        assert!(out.status.is_truncated());
    }

    #[test]
    fn empty_episode_is_complete_immediately() {
        let mut env = Environment::new();
        env.reset(Episode::new(Vec::new(), 1, EpisodeParams::default()), 0)
            .unwrap();
        assert_eq!(env.status(), Some(EpisodeStatus::Completed));
        assert_eq!(env.phase(), EnvPhase::Terminal);
    }

    #[test]
    fn reset_without_workers_fails() {
        let mut env = Environment::new();
        let err = env
            .reset(Episode::new(vec![single_stage_job(0.0, 1, 1.0)], 0, EpisodeParams::default()), 0)
            .unwrap_err();
        assert!(matches!(err, SimError::ConfigError(_)));
        assert_eq!(env.phase(), EnvPhase::Uninitialized);
    }
}
