// src/engine/mod.rs

//! Discrete-event scheduling engine.
//!
//! This module ties together:
//! - the event timeline ([`timeline`])
//! - the worker pool ([`workers`])
//! - the scheduling state machine exposing `reset` / `step` ([`env`])
//! - per-event state transitions ([`event_handlers`])
//! - observations and action masks ([`observation`])
//! - reward shaping ([`reward`])
//! - a lockstep batch of independent environments ([`vec_env`])
//!
//! Everything here is synchronous and deterministic: no channels, no IO,
//! one seeded random source per environment.

use crate::types::{EpisodeStatus, JobId, StageId};

/// A scheduling decision: commit up to `parallelism` free workers to
/// `stage` of `job`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub job: JobId,
    pub stage: StageId,
    pub parallelism: usize,
}

impl Decision {
    pub fn new(job: JobId, stage: StageId, parallelism: usize) -> Self {
        Self {
            job,
            stage,
            parallelism,
        }
    }
}

/// Result of a single `step`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    /// Reward accrued during this call only.
    pub reward: f64,
    pub status: EpisodeStatus,
}

pub mod env;
pub mod event_handlers;
pub mod observation;
pub mod reward;
pub mod timeline;
pub mod vec_env;
pub mod workers;

pub use env::{EnvPhase, Environment};
pub use observation::{JobView, Observation, OpMask, ParallelismMask, StageView};
pub use reward::RewardModel;
pub use timeline::{Event, Timeline};
pub use vec_env::{VecEnvironment, VecStep};
pub use workers::{Assignment, Worker, WorkerPool, WorkerState};
