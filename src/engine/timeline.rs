// src/engine/timeline.rs

//! Time-ordered event queue driving the simulation.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::{JobId, SimTime, StageId, WorkerId};

/// Something that happens at a point in simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A job enters the system.
    JobArrival { job: JobId },
    /// A moving worker reached its new job and can start its task.
    WorkerReady {
        worker: WorkerId,
        job: JobId,
        stage: StageId,
    },
    /// A worker finished one task of a stage.
    TaskCompletion {
        worker: WorkerId,
        job: JobId,
        stage: StageId,
    },
}

/// Heap entry. Ordered by `(time, seq)` ascending; `seq` is assigned at
/// insertion so equal-time events pop in the order they were scheduled.
#[derive(Debug, Clone)]
struct Scheduled {
    time: SimTime,
    seq: u64,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: `BinaryHeap` is a max-heap.
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of pending events.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
    pending_arrivals: usize,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event at `time`.
    pub fn schedule(&mut self, time: SimTime, event: Event) {
        if matches!(event, Event::JobArrival { .. }) {
            self.pending_arrivals += 1;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { time, seq, event });
    }

    /// Remove and return the earliest event, or `None` when empty.
    pub fn pop_next(&mut self) -> Option<(SimTime, Event)> {
        let entry = self.heap.pop()?;
        if matches!(entry.event, Event::JobArrival { .. }) {
            self.pending_arrivals -= 1;
        }
        Some((entry.time, entry.event))
    }

    /// Time of the earliest pending event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|e| e.time)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Whether any job arrival is still queued.
    pub fn has_pending_arrivals(&self) -> bool {
        self.pending_arrivals > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_time_order() {
        let mut t = Timeline::new();
        t.schedule(5.0, Event::JobArrival { job: 0 });
        t.schedule(1.0, Event::JobArrival { job: 1 });
        t.schedule(3.0, Event::JobArrival { job: 2 });

        let order: Vec<_> = std::iter::from_fn(|| t.pop_next()).map(|(time, _)| time).collect();
        assert_eq!(order, vec![1.0, 3.0, 5.0]);
        assert!(t.pop_next().is_none());
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut t = Timeline::new();
        for job in 0..5 {
            t.schedule(2.0, Event::JobArrival { job });
        }
        for expected in 0..5 {
            match t.pop_next() {
                Some((_, Event::JobArrival { job })) => assert_eq!(job, expected),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn tracks_pending_arrivals() {
        let mut t = Timeline::new();
        t.schedule(1.0, Event::JobArrival { job: 0 });
        t.schedule(
            0.5,
            Event::TaskCompletion {
                worker: 0,
                job: 0,
                stage: 0,
            },
        );
        assert!(t.has_pending_arrivals());
        assert_eq!(t.peek_time(), Some(0.5));
        t.pop_next();
        assert!(t.has_pending_arrivals());
        t.pop_next();
        assert!(!t.has_pending_arrivals());
        assert!(t.is_empty());
    }
}
