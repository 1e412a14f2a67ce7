// tests/scheduling_scenarios.rs

use dagsched::engine::{Decision, EnvPhase, Environment};
use dagsched::errors::SimError;
use dagsched::types::EpisodeStatus;
use dagsched_test_utils::builders::{EpisodeBuilder, JobSpecBuilder};
use dagsched_test_utils::init_tracing;

#[test]
fn linear_chain_runs_stage_by_stage() {
    init_tracing();

    let job = JobSpecBuilder::new("chain")
        .stage(1, 1.0)
        .stage(1, 1.0)
        .stage(1, 1.0)
        .chained()
        .build();
    let episode = EpisodeBuilder::new(1).job_at(0.0, job).build();

    let mut env = Environment::new();
    let obs = env.reset(episode, 0).unwrap();
    assert_eq!(obs.frontier_of(0), vec![0]);

    let out = env.step(Some(Decision::new(0, 0, 1))).unwrap();
    assert_eq!(out.observation.time, 1.0);
    assert_eq!(out.observation.frontier_of(0), vec![1]);
    assert!(out.observation.job(0).unwrap().stages[0].is_complete);

    let out = env.step(Some(Decision::new(0, 1, 1))).unwrap();
    assert_eq!(out.observation.time, 2.0);
    assert_eq!(out.observation.frontier_of(0), vec![2]);

    let out = env.step(Some(Decision::new(0, 2, 1))).unwrap();
    assert_eq!(out.status, EpisodeStatus::Completed);
    assert_eq!(env.current_time(), 3.0);
    assert_eq!(env.avg_job_duration(), Some(3.0));
    assert_eq!(env.num_completed_jobs(), 1);
    assert!(out.observation.active_job_ids.is_empty());
}

#[test]
fn fan_out_opens_branches_together_and_join_waits_for_both() {
    init_tracing();

    // A -> B, A -> C, B -> D, C -> D; C is the slow branch.
    let fan = JobSpecBuilder::new("fan")
        .stage(1, 1.0)
        .stage(1, 1.0)
        .stage(1, 3.0)
        .stage(1, 1.0)
        .edge(0, 1)
        .edge(0, 2)
        .edge(1, 3)
        .edge(2, 3)
        .build();
    let late = JobSpecBuilder::new("late").stage(1, 1.0).build();
    let episode = EpisodeBuilder::new(2)
        .job_at(0.0, fan)
        .job_at(2.0, late)
        .build();

    let mut env = Environment::new();
    env.reset(episode, 0).unwrap();

    let out = env.step(Some(Decision::new(0, 0, 1))).unwrap();
    assert_eq!(out.observation.time, 1.0);
    assert_eq!(out.observation.frontier_of(0), vec![1, 2]);
    assert!(out.observation.op_mask.is_set(0, 1));
    assert!(out.observation.op_mask.is_set(0, 2));
    assert!(!out.observation.op_mask.is_set(0, 3));

    // Free workers remain, so time does not move between these two.
    let out = env.step(Some(Decision::new(0, 1, 1))).unwrap();
    assert_eq!(out.observation.time, 1.0);
    let out = env.step(Some(Decision::new(0, 2, 1))).unwrap();

    // B finished and the second job arrived; D still waits for C.
    assert_eq!(out.observation.time, 2.0);
    assert!(out.observation.frontier_of(0).is_empty());
    assert!(!out.observation.op_mask.is_set(0, 3));
    assert!(out.observation.op_mask.is_set(1, 0));

    let out = env.step(Some(Decision::new(1, 0, 1))).unwrap();
    assert_eq!(out.observation.time, 4.0);
    assert_eq!(out.observation.frontier_of(0), vec![3]);
    assert_eq!(out.observation.active_job_ids, vec![0]);

    let out = env.step(Some(Decision::new(0, 3, 1))).unwrap();
    assert_eq!(out.status, EpisodeStatus::Completed);
    assert_eq!(env.job_durations(), vec![1.0, 5.0]);
    assert_eq!(env.avg_job_duration(), Some(3.0));
}

#[test]
fn rejected_decisions_leave_state_untouched() {
    init_tracing();

    let job = JobSpecBuilder::new("pair")
        .stage(2, 1.0)
        .stage(1, 1.0)
        .chained()
        .build();
    let episode = EpisodeBuilder::new(1).job_at(0.0, job).build();

    let mut env = Environment::new();
    let before = env.reset(episode, 9).unwrap();

    let err = env.step(Some(Decision::new(0, 0, 2))).unwrap_err();
    assert!(matches!(
        err,
        SimError::InvalidParallelism {
            requested: 2,
            free: 1
        }
    ));
    assert_eq!(env.observe().unwrap(), before);

    let err = env.step(Some(Decision::new(0, 1, 1))).unwrap_err();
    assert!(matches!(err, SimError::InvalidStage { job: 0, stage: 1 }));

    let err = env.step(Some(Decision::new(7, 0, 1))).unwrap_err();
    assert!(matches!(err, SimError::InvalidStage { job: 7, .. }));

    let err = env.step(Some(Decision::new(0, 0, 0))).unwrap_err();
    assert!(matches!(err, SimError::InvalidParallelism { requested: 0, .. }));

    assert_eq!(env.observe().unwrap(), before);
    assert_eq!(env.step_count(), 0);
    assert_eq!(env.phase(), EnvPhase::Ready);
}

#[test]
fn one_worker_runs_a_stage_serially() {
    let job = JobSpecBuilder::new("wide").stage(3, 2.0).build();
    let episode = EpisodeBuilder::new(1).job_at(0.0, job).build();

    let mut env = Environment::new();
    env.reset(episode, 0).unwrap();
    let out = env.step(Some(Decision::new(0, 0, 1))).unwrap();

    assert_eq!(out.status, EpisodeStatus::Completed);
    assert_eq!(env.current_time(), 6.0);
}

#[test]
fn reset_discards_previous_episode() {
    let job = || JobSpecBuilder::new("j").stage(1, 1.0).build();

    let mut env = Environment::new();
    env.reset(EpisodeBuilder::new(1).job_at(0.0, job()).build(), 0)
        .unwrap();
    env.step(Some(Decision::new(0, 0, 1))).unwrap();
    assert_eq!(env.phase(), EnvPhase::Terminal);

    let obs = env
        .reset(
            EpisodeBuilder::new(2)
                .job_at(0.0, job())
                .job_at(0.0, job())
                .build(),
            0,
        )
        .unwrap();
    assert_eq!(env.phase(), EnvPhase::Ready);
    assert_eq!(obs.time, 0.0);
    assert_eq!(obs.active_job_ids, vec![0, 1]);
    assert_eq!(env.num_completed_jobs(), 0);
    assert_eq!(env.total_reward(), 0.0);
}

#[test]
fn failed_reset_keeps_the_running_episode() {
    let mut env = Environment::new();
    env.reset(
        EpisodeBuilder::new(1)
            .job_at(0.0, JobSpecBuilder::new("ok").stage(1, 1.0).build())
            .build(),
        0,
    )
    .unwrap();
    let before = env.observe().unwrap();

    let cyclic = JobSpecBuilder::new("loop")
        .stage(1, 1.0)
        .stage(1, 1.0)
        .edge(0, 1)
        .edge(1, 0)
        .build();
    let err = env
        .reset(EpisodeBuilder::new(1).job_at(0.0, cyclic).build(), 0)
        .unwrap_err();
    assert!(matches!(err, SimError::DagCycle(_)));
    assert_eq!(env.observe().unwrap(), before);
}

#[test]
fn scripted_decisions_drive_the_runner() {
    use dagsched::runner::run_episode;
    use dagsched_test_utils::scripted::ScriptedPolicy;

    let job = JobSpecBuilder::new("chain")
        .stage(2, 1.0)
        .stage(1, 4.0)
        .chained()
        .build();
    let episode = EpisodeBuilder::new(2)
        .worker_class("spot")
        .job_at(0.0, job)
        .build();

    let mut env = Environment::new();
    let obs = env.reset(episode, 0).unwrap();
    let mut policy = ScriptedPolicy::new([
        Some(Decision::new(0, 0, 2)),
        Some(Decision::new(0, 1, 1)),
    ]);
    let summary = run_episode(&mut env, obs, &mut policy, 0).unwrap();

    assert_eq!(summary.status, EpisodeStatus::Completed);
    assert_eq!(summary.final_time, 5.0);
    assert_eq!(summary.steps, 2);
    assert_eq!(policy.remaining(), 0);
    assert_eq!(policy.seen.len(), 2);
    assert_eq!(policy.seen[1].time, 1.0);
    assert_eq!(policy.seen[1].frontier_of(0), vec![1]);
    assert!(
        env.workers()
            .unwrap()
            .workers()
            .iter()
            .all(|w| w.class == "spot")
    );
}

#[test]
fn holding_cost_weights_each_interval_by_active_jobs() {
    init_tracing();

    let episode = EpisodeBuilder::new(2)
        .job_at(0.0, JobSpecBuilder::new("a").stage(1, 1.0).build())
        .job_at(0.0, JobSpecBuilder::new("b").stage(1, 3.0).build())
        .build();

    let mut env = Environment::new();
    env.reset(episode, 0).unwrap();

    let out = env.step(Some(Decision::new(0, 0, 1))).unwrap();
    assert_eq!(out.observation.time, 0.0);
    assert_eq!(out.reward, 0.0);

    // Two jobs held over [0, 1], then one over [1, 3].
    let out = env.step(Some(Decision::new(1, 0, 1))).unwrap();
    assert_eq!(out.status, EpisodeStatus::Completed);
    assert_eq!(env.current_time(), 3.0);
    assert_eq!(out.reward, -4.0);
    assert_eq!(env.total_reward(), -4.0);
}

#[test]
fn holding_cost_counts_jobs_arriving_mid_episode() {
    let fan = JobSpecBuilder::new("fan")
        .stage(1, 1.0)
        .stage(1, 1.0)
        .stage(1, 3.0)
        .stage(1, 1.0)
        .edge(0, 1)
        .edge(0, 2)
        .edge(1, 3)
        .edge(2, 3)
        .build();
    let late = JobSpecBuilder::new("late").stage(1, 1.0).build();
    let episode = EpisodeBuilder::new(2)
        .job_at(0.0, fan)
        .job_at(2.0, late)
        .build();

    let mut env = Environment::new();
    env.reset(episode, 0).unwrap();

    let rewards: Vec<f64> = [
        Decision::new(0, 0, 1),
        Decision::new(0, 1, 1),
        Decision::new(0, 2, 1),
        Decision::new(1, 0, 1),
        Decision::new(0, 3, 1),
    ]
    .into_iter()
    .map(|d| env.step(Some(d)).unwrap().reward)
    .collect();

    // The late job adds to the cost only over [2, 3], while it is in the
    // system.
    assert_eq!(rewards, vec![-1.0, 0.0, -1.0, -3.0, -1.0]);
    assert_eq!(env.total_reward(), -6.0);
    assert_eq!(
        env.total_reward(),
        -env.job_durations().iter().sum::<f64>()
    );
}

#[test]
fn observation_lists_jobs_by_id_not_arrival() {
    // Job 1 is in the system before job 0 arrives.
    let episode = EpisodeBuilder::new(2)
        .job_at(5.0, JobSpecBuilder::new("later").stage(1, 1.0).build())
        .job_at(0.0, JobSpecBuilder::new("first").stage(1, 10.0).build())
        .build();

    let mut env = Environment::new();
    let obs = env.reset(episode, 0).unwrap();
    assert_eq!(obs.active_job_ids, vec![1]);

    let out = env.step(Some(Decision::new(1, 0, 1))).unwrap();
    assert_eq!(out.observation.time, 5.0);
    assert_eq!(out.observation.active_job_ids, vec![0, 1]);
    let ids: Vec<_> = out.observation.jobs.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![0, 1]);
}
