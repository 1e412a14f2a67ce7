// src/engine/workers.rs

//! Worker pool: availability, job affiliation and movement.

use tracing::debug;

use crate::errors::{Result, SimError};
use crate::types::{JobId, StageId, WorkerId};
use crate::workload::WorkerSpec;

/// What a worker is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Free,
    /// Travelling to `job` after switching affiliation; will start a task
    /// of `stage` when it arrives.
    Moving { job: JobId, stage: StageId },
    /// Executing a task of `stage`.
    Busy { job: JobId, stage: StageId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worker {
    pub id: WorkerId,
    pub class: String,
    /// Job this worker last served; `None` before its first assignment.
    pub job: Option<JobId>,
    pub state: WorkerState,
}

impl Worker {
    pub fn is_free(&self) -> bool {
        matches!(self.state, WorkerState::Free)
    }
}

/// Result of binding one worker to a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub worker: WorkerId,
    /// `true` if the worker switched jobs and must wait out the movement
    /// delay before starting.
    pub moving: bool,
}

/// Fixed set of workers for one episode.
///
/// `num_free() + num_moving() + num_busy() == len()` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// All workers start free and unaffiliated.
    pub fn new(specs: &[WorkerSpec]) -> Self {
        let workers = specs
            .iter()
            .enumerate()
            .map(|(id, spec)| Worker {
                id,
                class: spec.class.clone(),
                job: None,
                state: WorkerState::Free,
            })
            .collect();
        Self { workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn worker(&self, id: WorkerId) -> Option<&Worker> {
        self.workers.get(id)
    }

    /// Ids of free workers, ascending.
    pub fn free_worker_ids(&self) -> Vec<WorkerId> {
        self.workers
            .iter()
            .filter(|w| w.is_free())
            .map(|w| w.id)
            .collect()
    }

    pub fn num_free(&self) -> usize {
        self.workers.iter().filter(|w| w.is_free()).count()
    }

    pub fn num_moving(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| matches!(w.state, WorkerState::Moving { .. }))
            .count()
    }

    pub fn num_busy(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| matches!(w.state, WorkerState::Busy { .. }))
            .count()
    }

    /// Bind `count` free workers to `stage` of `job`.
    ///
    /// Workers already affiliated with `job` are preferred and start
    /// immediately; the rest are picked by ascending id and become
    /// `Moving` if they previously served a different job. Unaffiliated
    /// workers start immediately.
    pub fn assign(&mut self, job: JobId, stage: StageId, count: usize) -> Result<Vec<Assignment>> {
        let free = self.num_free();
        if count == 0 || count > free {
            return Err(SimError::InvalidParallelism {
                requested: count,
                free,
            });
        }

        let (mut chosen, others): (Vec<WorkerId>, Vec<WorkerId>) = self
            .free_worker_ids()
            .into_iter()
            .partition(|&id| self.workers[id].job == Some(job));
        chosen.extend(others);
        chosen.truncate(count);

        let assignments = chosen
            .into_iter()
            .map(|id| {
                let w = &mut self.workers[id];
                let moving = matches!(w.job, Some(prev) if prev != job);
                w.job = Some(job);
                w.state = if moving {
                    WorkerState::Moving { job, stage }
                } else {
                    WorkerState::Busy { job, stage }
                };
                debug!(worker = id, job, stage, moving, "worker assigned");
                Assignment { worker: id, moving }
            })
            .collect();

        Ok(assignments)
    }

    /// A moving worker arrived at its job and starts executing.
    pub fn start_task(&mut self, worker: WorkerId) {
        if let Some(w) = self.workers.get_mut(worker) {
            if let WorkerState::Moving { job, stage } = w.state {
                w.state = WorkerState::Busy { job, stage };
            }
        }
    }

    /// Return a worker to the free pool. It keeps its job affiliation.
    pub fn release(&mut self, worker: WorkerId) {
        if let Some(w) = self.workers.get_mut(worker) {
            debug!(worker, job = ?w.job, "worker released");
            w.state = WorkerState::Free;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> WorkerPool {
        WorkerPool::new(&vec![WorkerSpec::default(); n])
    }

    #[test]
    fn first_assignment_needs_no_move() {
        let mut p = pool(3);
        let a = p.assign(0, 0, 2).unwrap();
        assert_eq!(
            a,
            vec![
                Assignment { worker: 0, moving: false },
                Assignment { worker: 1, moving: false }
            ]
        );
        assert_eq!(p.num_free(), 1);
        assert_eq!(p.num_busy(), 2);
    }

    #[test]
    fn switching_jobs_moves_and_same_job_is_preferred() {
        let mut p = pool(3);
        p.assign(0, 0, 1).unwrap(); // worker 0 -> job 0
        p.assign(1, 0, 1).unwrap(); // worker 1 -> job 1
        p.release(0);
        p.release(1);

        // Job 1 should get worker 1 back first (no move), then worker 0 moves.
        let a = p.assign(1, 2, 2).unwrap();
        assert_eq!(
            a,
            vec![
                Assignment { worker: 1, moving: false },
                Assignment { worker: 0, moving: true }
            ]
        );
        assert_eq!(p.num_moving(), 1);

        p.start_task(0);
        assert_eq!(p.num_moving(), 0);
        assert_eq!(p.num_busy(), 2);
        assert_eq!(p.num_free() + p.num_moving() + p.num_busy(), p.len());
    }

    #[test]
    fn over_assignment_is_rejected_without_side_effects() {
        let mut p = pool(2);
        let before = p.clone();
        assert!(matches!(
            p.assign(0, 0, 3),
            Err(SimError::InvalidParallelism { requested: 3, free: 2 })
        ));
        assert!(matches!(p.assign(0, 0, 0), Err(SimError::InvalidParallelism { .. })));
        assert_eq!(p, before);
    }
}
