// src/config/mod.rs

//! Configuration loading and validation for dagsched.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate ranges, template references and template DAGs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigFile, DurationConfig, EnvSection, JobTemplateConfig, RandomSection, RawConfigFile,
    StageConfig, WorkersSection, WorkloadSection,
};
