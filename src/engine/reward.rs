// src/engine/reward.rs

//! Reward shaping.

use crate::types::{RewardShaping, SimTime};

/// Turns simulation progress into reward according to the configured
/// [`RewardShaping`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardModel {
    shaping: RewardShaping,
    scale: f64,
}

impl RewardModel {
    pub fn new(shaping: RewardShaping, scale: f64) -> Self {
        Self { shaping, scale }
    }

    /// Reward for `elapsed` time passing with `active_jobs` jobs in the system.
    pub fn on_elapsed(&self, elapsed: SimTime, active_jobs: usize) -> f64 {
        match self.shaping {
            RewardShaping::HoldingCost => -self.scale * elapsed * active_jobs as f64,
            RewardShaping::Completions => 0.0,
        }
    }

    /// Reward for one job completing.
    pub fn on_job_completed(&self) -> f64 {
        match self.shaping {
            RewardShaping::HoldingCost => 0.0,
            RewardShaping::Completions => self.scale,
        }
    }
}

impl Default for RewardModel {
    fn default() -> Self {
        Self::new(RewardShaping::default(), 1.0)
    }
}
