// src/dag/stage.rs

//! Stages: bags of identical tasks inside a job.

use rand::Rng;

use crate::types::{SimTime, StageId};

/// How long a single task of a stage takes on one worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskDuration {
    /// Every task takes exactly this long.
    Fixed(SimTime),
    /// Each task's duration is drawn uniformly from `[min, max]` when it is
    /// dispatched.
    Uniform { min: SimTime, max: SimTime },
}

impl TaskDuration {
    /// Draw the duration of one task.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SimTime {
        match *self {
            TaskDuration::Fixed(d) => d,
            TaskDuration::Uniform { min, max } if max > min => rng.random_range(min..=max),
            TaskDuration::Uniform { min, .. } => min,
        }
    }

    /// Expected duration of one task.
    pub fn mean(&self) -> SimTime {
        match *self {
            TaskDuration::Fixed(d) => d,
            TaskDuration::Uniform { min, max } => (min + max) / 2.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            TaskDuration::Fixed(d) => d.is_finite() && d >= 0.0,
            TaskDuration::Uniform { min, max } => {
                min.is_finite() && max.is_finite() && min >= 0.0 && min <= max
            }
        }
    }
}

/// Per-episode state of one stage.
///
/// Counts only grow: `num_completed_tasks <= num_dispatched_tasks <= num_tasks`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub id: StageId,
    pub num_tasks: usize,
    pub task_duration: TaskDuration,
    /// Tasks already handed to a worker (moving or executing).
    pub num_dispatched_tasks: usize,
    pub num_completed_tasks: usize,
    /// Workers currently bound to this stage.
    pub num_assigned_workers: usize,
}

impl Stage {
    pub fn new(id: StageId, num_tasks: usize, task_duration: TaskDuration) -> Self {
        Self {
            id,
            num_tasks,
            task_duration,
            num_dispatched_tasks: 0,
            num_completed_tasks: 0,
            num_assigned_workers: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.num_completed_tasks == self.num_tasks
    }

    /// Tasks not yet handed to any worker.
    pub fn num_undispatched_tasks(&self) -> usize {
        self.num_tasks - self.num_dispatched_tasks
    }

    /// Hand the next task to a worker. Returns `false` if none remain.
    pub fn dispatch_task(&mut self) -> bool {
        if self.num_dispatched_tasks < self.num_tasks {
            self.num_dispatched_tasks += 1;
            true
        } else {
            false
        }
    }

    /// Record one finished task. Returns `true` if this completed the stage.
    pub fn complete_task(&mut self) -> bool {
        debug_assert!(self.num_completed_tasks < self.num_dispatched_tasks);
        self.num_completed_tasks += 1;
        self.is_complete()
    }

    /// Expected work still outstanding (unfinished tasks × mean duration).
    pub fn remaining_work(&self) -> SimTime {
        (self.num_tasks - self.num_completed_tasks) as SimTime * self.task_duration.mean()
    }
}
