// src/engine/vec_env.rs

//! Lockstep batch of independent environments.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::engine::env::{Environment, SimState};
use crate::engine::observation::Observation;
use crate::engine::Decision;
use crate::errors::{Result, SimError};
use crate::types::EpisodeStatus;
use crate::workload::Episode;

/// Batched result of [`VecEnvironment::step`]; entry `i` belongs to
/// environment `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct VecStep {
    pub observations: Vec<Observation>,
    pub rewards: Vec<f64>,
    pub statuses: Vec<EpisodeStatus>,
}

/// N environments stepped together. They share nothing; the batch is pure
/// composition.
#[derive(Debug)]
pub struct VecEnvironment {
    envs: Vec<Environment>,
    last: Vec<Option<Observation>>,
}

impl VecEnvironment {
    pub fn new(num_envs: usize) -> Self {
        Self {
            envs: (0..num_envs).map(|_| Environment::new()).collect(),
            last: vec![None; num_envs],
        }
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    pub fn envs(&self) -> &[Environment] {
        &self.envs
    }

    /// Reset every environment.
    ///
    /// `episodes` holds either one episode shared by all environments or one
    /// per environment; `seeds` always holds one seed per environment. If any
    /// episode is invalid, every environment keeps its previous episode.
    pub fn reset(&mut self, episodes: Vec<Episode>, seeds: &[u64]) -> Result<Vec<Observation>> {
        let n = self.envs.len();
        if seeds.len() != n {
            return Err(SimError::BatchSizeMismatch {
                expected: n,
                got: seeds.len(),
            });
        }
        let episodes = match episodes.len() {
            1 => vec![episodes[0].clone(); n],
            len if len == n => episodes,
            len => {
                return Err(SimError::BatchSizeMismatch {
                    expected: n,
                    got: len,
                });
            }
        };

        // Build every state before installing any, so a bad episode leaves
        // the whole batch as it was.
        let states = episodes
            .into_iter()
            .zip(seeds)
            .enumerate()
            .map(|(index, (episode, &seed))| {
                SimState::new(episode, StdRng::seed_from_u64(seed)).map_err(|e| wrap(index, e))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut observations = Vec::with_capacity(n);
        for (index, (env, state)) in self.envs.iter_mut().zip(states).enumerate() {
            let obs = env.install(state);
            self.last[index] = Some(obs.clone());
            observations.push(obs);
        }

        debug!(num_envs = n, "vectorized reset complete");
        Ok(observations)
    }

    /// Step every environment once.
    ///
    /// The whole batch is checked first; if any action would be rejected, the
    /// error names its index and no environment moves.
    ///
    /// `actions[i]` is `None` to skip environment `i` (its previous
    /// observation is repeated with zero reward) or `Some(decision)` where
    /// the inner `Option` follows [`Environment::step`].
    pub fn step(&mut self, actions: Vec<Option<Option<Decision>>>) -> Result<VecStep> {
        let n = self.envs.len();
        if actions.len() != n {
            return Err(SimError::BatchSizeMismatch {
                expected: n,
                got: actions.len(),
            });
        }

        // Reject the batch before any environment advances.
        for (index, (env, action)) in self.envs.iter().zip(&actions).enumerate() {
            match action {
                Some(decision) => env.check(decision.as_ref()).map_err(|e| wrap(index, e))?,
                None if self.last[index].is_none() => {
                    return Err(wrap(index, SimError::NotReset));
                }
                None => {}
            }
        }

        let mut observations = Vec::with_capacity(n);
        let mut rewards = Vec::with_capacity(n);
        let mut statuses = Vec::with_capacity(n);

        for (index, (env, action)) in self.envs.iter_mut().zip(actions).enumerate() {
            match action {
                Some(decision) => {
                    let out = env.step(decision).map_err(|e| wrap(index, e))?;
                    self.last[index] = Some(out.observation.clone());
                    observations.push(out.observation);
                    rewards.push(out.reward);
                    statuses.push(out.status);
                }
                None => {
                    let obs = match &self.last[index] {
                        Some(obs) => obs.clone(),
                        None => return Err(wrap(index, SimError::NotReset)),
                    };
                    observations.push(obs);
                    rewards.push(0.0);
                    statuses.push(env.status().unwrap_or(EpisodeStatus::Running));
                }
            }
        }

        Ok(VecStep {
            observations,
            rewards,
            statuses,
        })
    }

    /// Mean job duration per environment.
    pub fn avg_job_durations(&self) -> Vec<Option<f64>> {
        self.envs.iter().map(Environment::avg_job_duration).collect()
    }
}

fn wrap(index: usize, source: SimError) -> SimError {
    SimError::VecEnv {
        index,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_before_reset_reports_index() {
        let mut v = VecEnvironment::new(2);
        let err = v.step(vec![None, Some(None)]).unwrap_err();
        match err {
            SimError::VecEnv { index, source } => {
                assert_eq!(index, 0);
                assert!(matches!(*source, SimError::NotReset));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mismatched_batch_is_rejected() {
        let mut v = VecEnvironment::new(3);
        assert!(matches!(
            v.step(vec![None]),
            Err(SimError::BatchSizeMismatch { expected: 3, got: 1 })
        ));
        assert!(matches!(
            v.reset(Vec::new(), &[1, 2, 3]),
            Err(SimError::BatchSizeMismatch { expected: 3, got: 0 })
        ));
    }
}
