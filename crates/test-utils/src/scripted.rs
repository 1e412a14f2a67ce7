use std::collections::VecDeque;

use dagsched::engine::{Decision, Observation};
use dagsched::policy::Policy;

/// Replays a fixed list of decisions, then declines to act.
///
/// Every observation it is shown is kept, so tests can assert on what the
/// decision-maker saw.
#[derive(Debug, Default)]
pub struct ScriptedPolicy {
    script: VecDeque<Option<Decision>>,
    pub seen: Vec<Observation>,
}

impl ScriptedPolicy {
    pub fn new(script: impl IntoIterator<Item = Option<Decision>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            seen: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Policy for ScriptedPolicy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn propose(&mut self, observation: &Observation) -> Option<Decision> {
        self.seen.push(observation.clone());
        self.script.pop_front().flatten()
    }
}
