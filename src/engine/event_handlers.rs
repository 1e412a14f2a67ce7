// src/engine/event_handlers.rs

//! State transitions for decisions and timeline events.
//!
//! Each handler mutates the episode state for one decision or event and
//! returns the reward it produced (job completions under the
//! `completions` shaping; time-based reward is charged by the drain loop).

use tracing::{debug, info};

use crate::engine::Decision;
use crate::engine::env::SimState;
use crate::engine::timeline::Event;
use crate::errors::Result;
use crate::types::{JobId, StageId, WorkerId};

/// Commit workers for a validated decision.
///
/// At most as many workers as the stage has undispatched tasks are bound;
/// any surplus parallelism stays free.
pub(crate) fn apply_decision(state: &mut SimState, decision: Decision) -> Result<()> {
    let Decision {
        job,
        stage,
        parallelism,
    } = decision;

    let undispatched = state.jobs[job]
        .stage(stage)
        .map_or(0, |s| s.num_undispatched_tasks());
    let count = parallelism.min(undispatched);

    let assignments = state.workers.assign(job, stage, count)?;

    debug!(
        job,
        stage,
        requested = parallelism,
        committed = assignments.len(),
        time = state.time,
        "applying decision"
    );

    for a in assignments {
        if let Some(s) = state.jobs[job].stage_mut(stage) {
            s.dispatch_task();
            s.num_assigned_workers += 1;
        }

        if a.moving {
            let ready_at = state.time + state.params.moving_delay;
            state.timeline.schedule(
                ready_at,
                Event::WorkerReady {
                    worker: a.worker,
                    job,
                    stage,
                },
            );
        } else {
            start_task(state, a.worker, job, stage);
        }
    }

    Ok(())
}

/// Dispatch one timeline event.
pub(crate) fn handle_event(state: &mut SimState, event: Event) -> f64 {
    debug!(time = state.time, ?event, "processing event");

    match event {
        Event::JobArrival { job } => {
            handle_job_arrival(state, job);
            0.0
        }
        Event::WorkerReady { worker, job, stage } => {
            state.workers.start_task(worker);
            start_task(state, worker, job, stage);
            0.0
        }
        Event::TaskCompletion { worker, job, stage } => {
            handle_task_completion(state, worker, job, stage)
        }
    }
}

/// Activate an arriving job; its source stages form its first frontier.
fn handle_job_arrival(state: &mut SimState, job: JobId) {
    state.activate_job(job);
    let j = &state.jobs[job];
    info!(
        job,
        name = %j.name,
        time = state.time,
        frontier = ?j.source_stages(),
        "job arrived"
    );
}

/// Sample a task duration and schedule its completion. The task itself was
/// already counted as dispatched.
fn start_task(state: &mut SimState, worker: WorkerId, job: JobId, stage: StageId) {
    let duration = match state.jobs[job].stage(stage) {
        Some(s) => s.task_duration.sample(&mut state.rng),
        None => return,
    };
    state.timeline.schedule(
        state.time + duration,
        Event::TaskCompletion { worker, job, stage },
    );
}

/// A worker finished a task: it either pulls the next task of the same
/// stage or returns to the pool. Stage and job completion are propagated.
fn handle_task_completion(state: &mut SimState, worker: WorkerId, job: JobId, stage: StageId) -> f64 {
    let Some(s) = state.jobs[job].stage_mut(stage) else {
        return 0.0;
    };

    let stage_complete = s.complete_task();
    let continues = !stage_complete && s.dispatch_task();
    if !continues {
        s.num_assigned_workers -= 1;
    }

    if continues {
        start_task(state, worker, job, stage);
    } else {
        state.workers.release(worker);
    }

    if !stage_complete {
        return 0.0;
    }

    let j = &mut state.jobs[job];
    j.add_stage_completion();
    debug!(
        job,
        stage,
        time = state.time,
        new_frontier = ?j.new_frontier(stage),
        "stage completed"
    );

    if !j.is_complete() {
        return 0.0;
    }

    j.completion_time = Some(state.time);
    info!(
        job,
        name = %j.name,
        time = state.time,
        duration = state.time - j.arrival_time,
        "job completed"
    );
    state.deactivate_job(job);
    state.completed_job_ids.push(job);
    state.reward_model.on_job_completed()
}
