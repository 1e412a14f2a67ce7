// src/engine/observation.rs

//! What the decision-maker sees after `reset` / `step`.

use crate::dag::Job;
use crate::engine::workers::WorkerPool;
use crate::types::{JobId, SimTime, StageId};

/// Read-only snapshot of one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageView {
    pub id: StageId,
    pub num_tasks: usize,
    pub num_dispatched_tasks: usize,
    pub num_completed_tasks: usize,
    pub num_assigned_workers: usize,
    /// Expected duration of one task.
    pub mean_task_duration: SimTime,
    /// Remaining work along the longest path starting at this stage.
    pub critical_path: SimTime,
    pub is_complete: bool,
    pub in_frontier: bool,
}

/// Read-only snapshot of one active job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobView {
    pub id: JobId,
    pub name: String,
    pub arrival_time: SimTime,
    pub stages: Vec<StageView>,
    /// `(predecessor, successor)` pairs.
    pub edges: Vec<(StageId, StageId)>,
    pub num_completed_stages: usize,
}

impl JobView {
    /// Longest remaining path through the job.
    pub fn critical_path(&self) -> SimTime {
        self.stages.iter().map(|s| s.critical_path).fold(0.0, f64::max)
    }

    pub fn stage(&self, id: StageId) -> Option<&StageView> {
        self.stages.get(id)
    }
}

/// Legal `(job, stage)` slots, `num_jobs × max_stages`, row-major by job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpMask {
    num_jobs: usize,
    max_stages: usize,
    slots: Vec<bool>,
}

impl OpMask {
    fn new(num_jobs: usize, max_stages: usize) -> Self {
        Self {
            num_jobs,
            max_stages,
            slots: vec![false; num_jobs * max_stages],
        }
    }

    fn set(&mut self, job: JobId, stage: StageId) {
        if job < self.num_jobs && stage < self.max_stages {
            self.slots[job * self.max_stages + stage] = true;
        }
    }

    pub fn is_set(&self, job: JobId, stage: StageId) -> bool {
        job < self.num_jobs && stage < self.max_stages && self.slots[job * self.max_stages + stage]
    }

    pub fn num_jobs(&self) -> usize {
        self.num_jobs
    }

    pub fn max_stages(&self) -> usize {
        self.max_stages
    }

    /// Flattened mask, row-major by job.
    pub fn as_slice(&self) -> &[bool] {
        &self.slots
    }

    /// All legal `(job, stage)` pairs in slot order.
    pub fn legal_ops(&self) -> Vec<(JobId, StageId)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .map(|(i, _)| (i / self.max_stages, i % self.max_stages))
            .collect()
    }

    pub fn any(&self) -> bool {
        self.slots.iter().any(|s| *s)
    }
}

/// Legal parallelism levels per job, `num_jobs × num_workers`. Column `l`
/// stands for parallelism `l + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelismMask {
    num_jobs: usize,
    num_workers: usize,
    levels: Vec<bool>,
}

impl ParallelismMask {
    fn new(num_jobs: usize, num_workers: usize) -> Self {
        Self {
            num_jobs,
            num_workers,
            levels: vec![false; num_jobs * num_workers],
        }
    }

    fn allow_up_to(&mut self, job: JobId, max_level: usize) {
        if job >= self.num_jobs {
            return;
        }
        let row = job * self.num_workers;
        for l in 0..max_level.min(self.num_workers) {
            self.levels[row + l] = true;
        }
    }

    /// Whether `job` may be given `parallelism` workers (1-based).
    pub fn allows(&self, job: JobId, parallelism: usize) -> bool {
        parallelism >= 1
            && parallelism <= self.num_workers
            && job < self.num_jobs
            && self.levels[job * self.num_workers + parallelism - 1]
    }

    /// Largest allowed parallelism for `job`, or 0.
    pub fn max_level(&self, job: JobId) -> usize {
        (1..=self.num_workers)
            .rev()
            .find(|&l| self.allows(job, l))
            .unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.levels
    }
}

/// Snapshot returned by `reset` and `step`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub time: SimTime,
    /// Active jobs, ascending by id.
    pub jobs: Vec<JobView>,
    pub active_job_ids: Vec<JobId>,
    pub op_mask: OpMask,
    pub parallelism_mask: ParallelismMask,
    pub num_free_workers: usize,
    pub num_moving_workers: usize,
    pub num_busy_workers: usize,
    /// If `false`, the caller must pass an empty decision.
    pub actions_available: bool,
}

impl Observation {
    /// Build a fresh snapshot. Masks are recomputed from scratch.
    pub(crate) fn capture(
        time: SimTime,
        jobs: &[Job],
        active_job_ids: &[JobId],
        workers: &WorkerPool,
        max_stages: usize,
    ) -> Self {
        let num_free = workers.num_free();
        let mut op_mask = OpMask::new(jobs.len(), max_stages);
        let mut parallelism_mask = ParallelismMask::new(jobs.len(), workers.len());
        let mut views = Vec::with_capacity(active_job_ids.len());

        for &job_id in active_job_ids {
            let job = &jobs[job_id];
            let frontier = job.frontier();
            let critical_paths = job.critical_paths();

            if num_free > 0 {
                for &stage in &frontier {
                    op_mask.set(job_id, stage);
                }
                parallelism_mask.allow_up_to(job_id, num_free);
            }

            views.push(JobView {
                id: job.id,
                name: job.name.clone(),
                arrival_time: job.arrival_time,
                stages: job
                    .stages()
                    .iter()
                    .map(|s| StageView {
                        id: s.id,
                        num_tasks: s.num_tasks,
                        num_dispatched_tasks: s.num_dispatched_tasks,
                        num_completed_tasks: s.num_completed_tasks,
                        num_assigned_workers: s.num_assigned_workers,
                        mean_task_duration: s.task_duration.mean(),
                        critical_path: critical_paths[s.id],
                        is_complete: s.is_complete(),
                        in_frontier: frontier.contains(&s.id),
                    })
                    .collect(),
                edges: job.graph().edges().to_vec(),
                num_completed_stages: job.num_completed_stages(),
            });
        }

        let actions_available = op_mask.any();

        Self {
            time,
            jobs: views,
            active_job_ids: active_job_ids.to_vec(),
            op_mask,
            parallelism_mask,
            num_free_workers: num_free,
            num_moving_workers: workers.num_moving(),
            num_busy_workers: workers.num_busy(),
            actions_available,
        }
    }

    pub fn job(&self, id: JobId) -> Option<&JobView> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Frontier stages of an active job.
    pub fn frontier_of(&self, id: JobId) -> Vec<StageId> {
        self.job(id)
            .map(|j| j.stages.iter().filter(|s| s.in_frontier).map(|s| s.id).collect())
            .unwrap_or_default()
    }
}
