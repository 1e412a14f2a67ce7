// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod policy;
pub mod runner;
pub mod types;
pub mod workload;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::runner::{EpisodeSummary, evaluate};
use crate::workload::WorkloadGenerator;

/// High-level entry point used by `main.rs`.
///
/// Loads the config, then evaluates every selected policy over the same
/// seeded episodes. Policies run concurrently, one blocking task each;
/// episodes never share state.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let generator = Arc::new(WorkloadGenerator::from_config(&cfg));
    let seeds: Vec<u64> = (0..args.episodes as u64)
        .map(|i| args.seed.wrapping_add(i))
        .collect();

    info!(
        policies = ?args.policy.kinds(),
        episodes = args.episodes,
        base_seed = args.seed,
        "starting evaluation"
    );

    let mut handles = Vec::new();
    for kind in args.policy.kinds() {
        let generator = Arc::clone(&generator);
        let seeds = seeds.clone();
        let policy_seed = args.seed;
        let handle = tokio::task::spawn_blocking(move || {
            let mut policy = kind.build(policy_seed);
            evaluate(&generator, policy.as_mut(), seeds)
        });
        handles.push((kind, handle));
    }

    for (kind, handle) in handles {
        let summaries = handle.await??;
        print_report(kind.label(), &summaries);
    }

    Ok(())
}

/// Per-episode average job duration in seconds (workload time is in
/// milliseconds), then the mean over episodes.
fn print_report(name: &str, summaries: &[EpisodeSummary]) {
    let mut total = 0.0;
    let mut counted = 0usize;

    for (i, s) in summaries.iter().enumerate() {
        match s.avg_job_duration {
            Some(avg) => {
                let secs = avg * 1e-3;
                total += secs;
                counted += 1;
                println!(
                    "{name}: test {}, avg job duration = {secs:.1}s ({:?}, {} jobs)",
                    i + 1,
                    s.status,
                    s.completed_jobs
                );
            }
            None => println!("{name}: test {}, no job completed ({:?})", i + 1, s.status),
        }
    }

    if counted > 0 {
        println!("{name}: mean over {counted} episodes = {:.1}s", total / counted as f64);
    }
}

/// Simple dry-run output: print the resolved config.
fn print_dry_run(cfg: &ConfigFile) {
    println!("dagsched dry-run");
    println!("  env.moving_delay = {}", cfg.env.moving_delay);
    if let Some(limit) = cfg.env.max_wall_time {
        println!("  env.max_wall_time = {limit}");
    }
    if let Some(steps) = cfg.env.max_steps {
        println!("  env.max_steps = {steps}");
    }
    println!("  env.max_stages = {}", cfg.env.max_stages);
    println!(
        "  env.reward = {:?} (scale {})",
        cfg.env.reward, cfg.env.reward_scale
    );
    println!(
        "  workers = {} x {}",
        cfg.workers.count, cfg.workers.class
    );
    println!(
        "  workload = {} initial + {} arrivals at rate {}",
        cfg.workload.num_init_jobs, cfg.workload.num_job_arrivals, cfg.workload.job_arrival_rate
    );
    println!();

    let templates = cfg.templates();
    if templates.is_empty() {
        let r = &cfg.workload.random;
        println!(
            "random jobs: up to {} stages, edge probability {}, tasks {:?}, duration {:?}",
            r.max_stages, r.edge_probability, r.tasks, r.task_duration
        );
    } else {
        println!("templates ({}):", templates.len());
        for job in templates {
            println!("  - {}", job.name);
            for (id, stage) in job.stages.iter().enumerate() {
                println!(
                    "      stage {id}: {} tasks, {:?}",
                    stage.num_tasks, stage.task_duration
                );
            }
            if !job.edges.is_empty() {
                println!("      edges: {:?}", job.edges);
            }
        }
    }

    debug!("dry-run complete (no simulation)");
}
