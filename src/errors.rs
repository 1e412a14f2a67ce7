// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::types::{JobId, StageId};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("step called before reset")]
    NotReset,

    #[error("episode has already finished; call reset to start a new one")]
    EpisodeFinished,

    #[error("stage {stage} of job {job} is not schedulable right now")]
    InvalidStage { job: JobId, stage: StageId },

    #[error("invalid parallelism {requested} ({free} workers free)")]
    InvalidParallelism { requested: usize, free: usize },

    #[error("batch size mismatch: expected {expected}, got {got}")]
    BatchSizeMismatch { expected: usize, got: usize },

    #[error("environment {index}: {source}")]
    VecEnv {
        index: usize,
        #[source]
        source: Box<SimError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SimError>;
