// src/policy/cpt.rs

use crate::engine::{Decision, Observation};
use crate::policy::{Policy, greedy_parallelism, schedulable_jobs};

/// Critical-path heuristic.
///
/// Picks the schedulable job whose remaining critical path is shortest
/// (`by_shortest`) or longest, then that job's legal stage with the longest
/// critical path, so work on the job's bottleneck chain starts first.
#[derive(Debug, Clone)]
pub struct CriticalPathPolicy {
    by_shortest: bool,
}

impl CriticalPathPolicy {
    pub fn new(by_shortest: bool) -> Self {
        Self { by_shortest }
    }
}

impl Policy for CriticalPathPolicy {
    fn name(&self) -> &str {
        if self.by_shortest { "scpt" } else { "lcpt" }
    }

    fn propose(&mut self, obs: &Observation) -> Option<Decision> {
        if !obs.actions_available {
            return None;
        }

        // Ties go to the lower job id in both directions.
        let job = schedulable_jobs(obs).min_by(|a, b| {
            let ord = a.critical_path().total_cmp(&b.critical_path());
            let ord = if self.by_shortest { ord } else { ord.reverse() };
            ord.then(a.id.cmp(&b.id))
        })?;

        let stage = job
            .stages
            .iter()
            .filter(|s| obs.op_mask.is_set(job.id, s.id))
            .min_by(|a, b| {
                b.critical_path
                    .total_cmp(&a.critical_path)
                    .then(a.id.cmp(&b.id))
            })?
            .id;
        let parallelism = greedy_parallelism(obs, job, stage)?;

        Some(Decision::new(job.id, stage, parallelism))
    }
}
