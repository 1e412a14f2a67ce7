// src/policy/fifo.rs

use crate::engine::{Decision, Observation};
use crate::policy::{Policy, greedy_parallelism, schedulable_jobs};

/// Serve jobs in arrival order. The earliest schedulable job gets its
/// lowest-numbered frontier stage with as many workers as it can use.
#[derive(Debug, Default, Clone)]
pub struct FifoPolicy;

impl FifoPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl Policy for FifoPolicy {
    fn name(&self) -> &str {
        "fifo"
    }

    fn propose(&mut self, obs: &Observation) -> Option<Decision> {
        if !obs.actions_available {
            return None;
        }

        let job = schedulable_jobs(obs).min_by(|a, b| {
            a.arrival_time
                .total_cmp(&b.arrival_time)
                .then(a.id.cmp(&b.id))
        })?;
        let stage = job
            .stages
            .iter()
            .find(|s| obs.op_mask.is_set(job.id, s.id))?
            .id;
        let parallelism = greedy_parallelism(obs, job, stage)?;

        Some(Decision::new(job.id, stage, parallelism))
    }
}
