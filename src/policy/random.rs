// src/policy/random.rs

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::engine::{Decision, Observation};
use crate::policy::Policy;

/// Uniform choice among legal stages and legal parallelism levels.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &str {
        "random"
    }

    fn propose(&mut self, obs: &Observation) -> Option<Decision> {
        let ops = obs.op_mask.legal_ops();
        let &(job, stage) = ops.choose(&mut self.rng)?;
        let max_level = obs.parallelism_mask.max_level(job);
        if max_level == 0 {
            return None;
        }
        let parallelism = self.rng.random_range(1..=max_level);
        Some(Decision::new(job, stage, parallelism))
    }
}
