//! Runner settings from the environment and simulation settings from disk.

use anyhow::{anyhow, Context, Result};
use sith_core::{RunnerConfig, SimulationConfig};
use std::str::FromStr;

/// Build a [`RunnerConfig`] from the process environment.
///
/// All variables are optional:
/// - `SITH_CONFIG` -- path to a JSON simulation config
/// - `SITH_OUTPUT_DIR` -- export root (default `./data/runs`)
/// - `SITH_RUNS` -- ensemble size (default 1)
/// - `SITH_BASE_SEED` -- seed of the first run (default: the config's seed)
/// - `SITH_RUN_TIMEOUT_SECS` -- wall-clock cap per run
/// - `SITH_MAX_CONCURRENT_RUNS` -- parallel runs (default 4)
pub fn runner_config_from_env() -> Result<RunnerConfig> {
    runner_config_from(|name| std::env::var(name).ok())
}

pub fn runner_config_from<F>(lookup: F) -> Result<RunnerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = RunnerConfig::default();

    let config = RunnerConfig {
        config_path: lookup("SITH_CONFIG"),
        output_dir: lookup("SITH_OUTPUT_DIR").unwrap_or(defaults.output_dir),
        runs: parse_var(&lookup, "SITH_RUNS")?.unwrap_or(defaults.runs),
        base_seed: parse_var(&lookup, "SITH_BASE_SEED")?,
        run_timeout_secs: parse_var(&lookup, "SITH_RUN_TIMEOUT_SECS")?,
        max_concurrent_runs: parse_var(&lookup, "SITH_MAX_CONCURRENT_RUNS")?
            .unwrap_or(defaults.max_concurrent_runs),
    };

    if config.runs == 0 {
        return Err(anyhow!("SITH_RUNS must be at least 1"));
    }
    if config.max_concurrent_runs == 0 {
        return Err(anyhow!("SITH_MAX_CONCURRENT_RUNS must be at least 1"));
    }
    Ok(config)
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("invalid {name}: {raw:?}"))
        })
        .transpose()
}

/// Load the simulation config, falling back to defaults without a path.
/// Validation happens when each run starts.
pub fn load_simulation_config(path: Option<&str>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read simulation config {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse simulation config {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = runner_config_from(lookup(&[])).unwrap();
        assert_eq!(config.runs, 1);
        assert_eq!(config.output_dir, "./data/runs");
        assert!(config.config_path.is_none());
        assert!(config.base_seed.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = runner_config_from(lookup(&[
            ("SITH_CONFIG", "tumor.json"),
            ("SITH_OUTPUT_DIR", "/tmp/out"),
            ("SITH_RUNS", "8"),
            ("SITH_BASE_SEED", "42"),
            ("SITH_RUN_TIMEOUT_SECS", " 60 "),
            ("SITH_MAX_CONCURRENT_RUNS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.config_path.as_deref(), Some("tumor.json"));
        assert_eq!(config.output_dir, "/tmp/out");
        assert_eq!(config.runs, 8);
        assert_eq!(config.base_seed, Some(42));
        assert_eq!(config.run_timeout_secs, Some(60));
        assert_eq!(config.max_concurrent_runs, 2);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(runner_config_from(lookup(&[("SITH_RUNS", "many")])).is_err());
        assert!(runner_config_from(lookup(&[("SITH_RUNS", "0")])).is_err());
        assert!(runner_config_from(lookup(&[("SITH_BASE_SEED", "-1")])).is_err());
        assert!(runner_config_from(lookup(&[("SITH_MAX_CONCURRENT_RUNS", "0")])).is_err());
    }

    #[test]
    fn test_load_simulation_config() {
        assert_eq!(
            load_simulation_config(None).unwrap().population_target,
            SimulationConfig::default().population_target
        );

        let path = std::env::temp_dir().join(format!("sith-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"population_target": 500, "mutation_prob": 0.2}"#).unwrap();
        let config = load_simulation_config(path.to_str()).unwrap();
        assert_eq!(config.population_target, 500);
        assert_eq!(config.mutation_prob, 0.2);
        assert_eq!(config.birth_rate, SimulationConfig::default().birth_rate);
        std::fs::remove_file(&path).unwrap();

        assert!(load_simulation_config(Some("/nonexistent/sith.json")).is_err());
    }
}
