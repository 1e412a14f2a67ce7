// src/config/validate.rs

use crate::config::model::{ConfigFile, JobTemplateConfig, RawConfigFile};
use crate::dag::{StageGraph, TaskDuration};
use crate::errors::{Result, SimError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SimError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.env,
            raw.workers,
            raw.workload,
            raw.job,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_env(cfg)?;
    validate_workers(cfg)?;
    validate_workload(cfg)?;
    validate_template_references(cfg)?;
    for (name, template) in cfg.job.iter() {
        validate_template(name, template, cfg.env.max_stages)?;
    }
    Ok(())
}

fn config_error(msg: impl Into<String>) -> SimError {
    SimError::ConfigError(msg.into())
}

fn validate_env(cfg: &RawConfigFile) -> Result<()> {
    let env = &cfg.env;

    if !env.moving_delay.is_finite() || env.moving_delay < 0.0 {
        return Err(config_error(format!(
            "[env].moving_delay must be a non-negative number (got {})",
            env.moving_delay
        )));
    }
    if env.max_stages == 0 {
        return Err(config_error("[env].max_stages must be >= 1 (got 0)"));
    }
    if let Some(limit) = env.max_wall_time {
        if !(limit > 0.0) {
            return Err(config_error(format!(
                "[env].max_wall_time must be positive (got {limit})"
            )));
        }
    }
    if env.max_steps == Some(0) {
        return Err(config_error("[env].max_steps must be >= 1 (got 0)"));
    }
    if !env.reward_scale.is_finite() {
        return Err(config_error(format!(
            "[env].reward_scale must be finite (got {})",
            env.reward_scale
        )));
    }
    Ok(())
}

fn validate_workers(cfg: &RawConfigFile) -> Result<()> {
    if cfg.workers.count == 0 {
        return Err(config_error("[workers].count must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_workload(cfg: &RawConfigFile) -> Result<()> {
    let w = &cfg.workload;

    if w.num_job_arrivals > 0 && !(w.job_arrival_rate > 0.0 && w.job_arrival_rate.is_finite()) {
        return Err(config_error(format!(
            "[workload].job_arrival_rate must be positive (got {})",
            w.job_arrival_rate
        )));
    }

    let r = &w.random;
    if r.max_stages == 0 || r.max_stages > cfg.env.max_stages {
        return Err(config_error(format!(
            "[workload.random].max_stages must be in 1..={} (got {})",
            cfg.env.max_stages, r.max_stages
        )));
    }
    if !(0.0..=1.0).contains(&r.edge_probability) {
        return Err(config_error(format!(
            "[workload.random].edge_probability must be in [0, 1] (got {})",
            r.edge_probability
        )));
    }
    if r.tasks[0] == 0 || r.tasks[0] > r.tasks[1] {
        return Err(config_error(format!(
            "[workload.random].tasks must be an ordered range starting at >= 1 (got {:?})",
            r.tasks
        )));
    }
    let [lo, hi] = r.task_duration;
    if !(TaskDuration::Uniform { min: lo, max: hi }).is_valid() {
        return Err(config_error(format!(
            "[workload.random].task_duration must be an ordered non-negative range (got {:?})",
            r.task_duration
        )));
    }
    Ok(())
}

fn validate_template_references(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.workload.templates.iter() {
        if !cfg.job.contains_key(name) {
            return Err(config_error(format!(
                "[workload].templates references unknown job template '{name}'"
            )));
        }
    }
    Ok(())
}

fn validate_template(name: &str, template: &JobTemplateConfig, max_stages: usize) -> Result<()> {
    let n = template.stages.len();
    if n == 0 {
        return Err(config_error(format!("job '{name}' has no stages")));
    }
    if n > max_stages {
        return Err(config_error(format!(
            "job '{name}' has {n} stages, more than [env].max_stages = {max_stages}"
        )));
    }

    for (id, stage) in template.stages.iter().enumerate() {
        if stage.tasks == 0 {
            return Err(config_error(format!(
                "job '{name}' stage {id} must have at least one task"
            )));
        }
        if !TaskDuration::from(stage.duration).is_valid() {
            return Err(config_error(format!(
                "job '{name}' stage {id} has an invalid duration {:?}",
                stage.duration
            )));
        }
        for &dep in stage.after.iter() {
            if dep >= n {
                return Err(config_error(format!(
                    "job '{name}' stage {id} has unknown dependency {dep} in `after`"
                )));
            }
            if dep == id {
                return Err(config_error(format!(
                    "job '{name}' stage {id} cannot depend on itself in `after`"
                )));
            }
        }
    }

    validate_template_dag(name, template)
}

fn validate_template_dag(name: &str, template: &JobTemplateConfig) -> Result<()> {
    match StageGraph::find_cycle(template.stages.len(), &template.edges()) {
        None => Ok(()),
        Some(stage) => Err(SimError::DagCycle(format!(
            "cycle detected in job '{name}' involving stage {stage}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(s)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.workers.count, 10);
        assert!(cfg.templates().is_empty());
    }

    #[test]
    fn cyclic_template_is_rejected() {
        let err = parse(
            r#"
            [job.loop]
            stages = [
              { tasks = 1, duration = 1.0, after = [1] },
              { tasks = 1, duration = 1.0, after = [0] },
            ]
            "#,
        )
        .unwrap_err();
        match err {
            SimError::DagCycle(msg) => assert!(msg.contains("job 'loop'")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_template_is_rejected() {
        let err = parse(
            r#"
            [workload]
            templates = ["missing"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown job template 'missing'"));
    }

    #[test]
    fn zero_workers_and_bad_ranges_are_rejected() {
        assert!(parse("[workers]\ncount = 0").is_err());
        assert!(parse("[workload.random]\ntasks = [3, 1]").is_err());
        assert!(parse("[workload.random]\nedge_probability = 1.5").is_err());
        assert!(parse("[env]\nmoving_delay = -1.0").is_err());
    }

    #[test]
    fn uniform_durations_and_dependencies_parse() {
        let cfg = parse(
            r#"
            [workload]
            templates = ["pair"]

            [job.pair]
            stages = [
              { tasks = 2, duration = { min = 1.0, max = 3.0 } },
              { tasks = 1, duration = 5, after = [0] },
            ]
            "#,
        )
        .unwrap();
        let specs = cfg.templates();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].edges, vec![(0, 1)]);
        assert_eq!(
            specs[0].stages[0].task_duration,
            TaskDuration::Uniform { min: 1.0, max: 3.0 }
        );
        assert_eq!(specs[0].stages[1].task_duration, TaskDuration::Fixed(5.0));
    }
}
