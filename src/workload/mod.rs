// src/workload/mod.rs

//! Episode inputs.
//!
//! - [`spec`] defines what `Environment::reset` consumes: the job arrival
//!   sequence, the worker manifest and episode parameters.
//! - [`generator`] draws such episodes from a configured distribution.

pub mod generator;
pub mod spec;

pub use generator::{RandomDagParams, WorkloadGenerator, random_job};
pub use spec::{
    DEFAULT_MAX_STAGES, Episode, EpisodeParams, JobArrival, JobSpec, StageSpec, WorkerSpec,
};
