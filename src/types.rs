use std::str::FromStr;
use serde::Deserialize;

/// Index of a job in the episode's arrival sequence.
pub type JobId = usize;

/// Index of a stage within its job.
pub type StageId = usize;

/// Index of a worker in the episode's worker manifest.
pub type WorkerId = usize;

/// Simulated time. Units are whatever the workload uses (the bundled
/// generator uses milliseconds).
pub type SimTime = f64;

/// How the environment turns elapsed simulated time into reward.
///
/// - `HoldingCost`: every active, incomplete job costs one unit per unit of
///   simulated time, so reward is `-(elapsed × active jobs)` summed over
///   event boundaries (default).
/// - `Completions`: `+1` for every job that completes.
///
/// Both are multiplied by the configured `reward_scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardShaping {
    HoldingCost,
    Completions,
}

impl Default for RewardShaping {
    fn default() -> Self {
        RewardShaping::HoldingCost
    }
}

impl FromStr for RewardShaping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "holding_cost" | "holding-cost" => Ok(RewardShaping::HoldingCost),
            "completions" => Ok(RewardShaping::Completions),
            other => Err(format!(
                "invalid reward shaping: {other} (expected \"holding_cost\" or \"completions\")"
            )),
        }
    }
}

/// Where an episode stands after a `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeStatus {
    /// More decisions are expected.
    Running,
    /// Every job arrived and completed.
    Completed,
    /// A step or wall-time budget ran out before all jobs completed.
    Truncated,
}

impl EpisodeStatus {
    pub fn is_done(self) -> bool {
        !matches!(self, EpisodeStatus::Running)
    }

    pub fn is_terminated(self) -> bool {
        matches!(self, EpisodeStatus::Completed)
    }

    pub fn is_truncated(self) -> bool {
        matches!(self, EpisodeStatus::Truncated)
    }
}
