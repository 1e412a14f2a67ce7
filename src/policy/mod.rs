// src/policy/mod.rs

//! Decision-makers that drive an [`Environment`](crate::engine::Environment).
//!
//! A policy only ever sees the [`Observation`]; it proposes a decision that
//! is legal under the observation's masks, or `None` to let time advance.

pub mod cpt;
pub mod fifo;
pub mod random;

use std::fmt;
use std::str::FromStr;

use crate::engine::{Decision, JobView, Observation};
use crate::types::StageId;

pub use cpt::CriticalPathPolicy;
pub use fifo::FifoPolicy;
pub use random::RandomPolicy;

/// Capability shared by all schedulers.
pub trait Policy: Send {
    /// Short label used in logs and reports.
    fn name(&self) -> &str;

    /// Choose the next decision for `observation`.
    fn propose(&mut self, observation: &Observation) -> Option<Decision>;
}

/// Built-in policies selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Fifo,
    ShortestCriticalPath,
    LongestCriticalPath,
    Random,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Fifo,
        PolicyKind::ShortestCriticalPath,
        PolicyKind::LongestCriticalPath,
        PolicyKind::Random,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PolicyKind::Fifo => "fifo",
            PolicyKind::ShortestCriticalPath => "scpt",
            PolicyKind::LongestCriticalPath => "lcpt",
            PolicyKind::Random => "random",
        }
    }

    /// Instantiate the policy. `seed` is only used by stochastic policies.
    pub fn build(self, seed: u64) -> Box<dyn Policy> {
        match self {
            PolicyKind::Fifo => Box::new(FifoPolicy::new()),
            PolicyKind::ShortestCriticalPath => Box::new(CriticalPathPolicy::new(true)),
            PolicyKind::LongestCriticalPath => Box::new(CriticalPathPolicy::new(false)),
            PolicyKind::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fifo" => Ok(PolicyKind::Fifo),
            "scpt" => Ok(PolicyKind::ShortestCriticalPath),
            "lcpt" => Ok(PolicyKind::LongestCriticalPath),
            "random" => Ok(PolicyKind::Random),
            other => Err(format!("unknown policy '{other}'")),
        }
    }
}

/// Parallelism the greedy heuristics ask for: enough workers to run every
/// undispatched task of the stage at once, capped by the mask.
fn greedy_parallelism(obs: &Observation, job: &JobView, stage: StageId) -> Option<usize> {
    let undispatched = job
        .stage(stage)
        .map(|s| s.num_tasks - s.num_dispatched_tasks)?;
    let level = undispatched.min(obs.parallelism_mask.max_level(job.id));
    (level >= 1).then_some(level)
}

/// Jobs that have at least one legal stage.
fn schedulable_jobs(obs: &Observation) -> impl Iterator<Item = &JobView> {
    obs.jobs
        .iter()
        .filter(|j| j.stages.iter().any(|s| obs.op_mask.is_set(j.id, s.id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_and_print() {
        for kind in PolicyKind::ALL {
            assert_eq!(kind.label().parse::<PolicyKind>(), Ok(kind));
            assert_eq!(kind.build(0).name(), kind.label());
        }
        assert!("decima".parse::<PolicyKind>().is_err());
    }
}
