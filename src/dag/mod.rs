// src/dag/mod.rs

//! Job and stage model.
//!
//! - [`graph`] holds the validated dependency structure of one job.
//! - [`stage`] tracks task progress of a single stage.
//! - [`job`] combines both and answers frontier queries.

pub mod graph;
pub mod job;
pub mod stage;

pub use graph::StageGraph;
pub use job::Job;
pub use stage::{Stage, TaskDuration};
