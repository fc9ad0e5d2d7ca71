//! Standalone power measurement command.
//!
//! Starts the WT230 and Yokogawa samplers on every configured
//! power-sampler unit, waits the measurement duration, then stops the
//! samplers and retrieves their CSVs. All units share one timestamp so the
//! artifacts of a run line up by name.

use std::path::Path;
use std::time::Duration;

use measrig_core::feature::timestamp_now;
use measrig_core::{FeatureOptions, RigConfig};

use crate::error::CliError;

const SAMPLERS: [&str; 2] = ["wt230", "yokogawa"];

/// Sample command handler
pub fn cmd_sample(
    config_path: Option<&Path>,
    duration_secs: u64,
    mode: Option<&str>,
    dstdir_override: Option<&Path>,
) -> Result<(), CliError> {
    let config = config_path
        .map_or_else(RigConfig::load_default, RigConfig::load)
        .map_err(|e| CliError::Config(e.to_string()))?;
    if config.power_samplers.is_empty() {
        return Err(CliError::Config(
            "no [[power_samplers]] configured".to_string(),
        ));
    }

    let dstdir = dstdir_override.map_or_else(|| config.dstdir(), Path::to_path_buf);
    std::fs::create_dir_all(&dstdir)?;

    let timestamp = timestamp_now();
    let mut units = Vec::new();
    for (index, sampler_config) in config.power_samplers.iter().enumerate() {
        let mut unit = measrig_core::rig::power_sampler(sampler_config)?;
        let options = sampler_options(index, &timestamp, mode);
        for name in SAMPLERS {
            unit.feature_start(name, &options)?;
        }
        tracing::info!(endpoint = %unit.device().endpoint(), "samplers running");
        units.push(unit);
    }

    std::thread::sleep(Duration::from_secs(duration_secs));

    for (index, unit) in units.iter_mut().enumerate() {
        for name in SAMPLERS {
            unit.feature_stop(name)?;
            // Explicit per-unit names: the yokogawa tool derives its
            // remote filename from the timestamp alone, which would
            // collide across units in one destination directory
            let target = dstdir.join(format!("sampler{index}_{name}_{timestamp}.csv"));
            let saved = unit.feature_save(name, &target)?;
            tracing::info!(file = %saved.display(), "saved measurement");
        }
        unit.teardown()?;
    }
    Ok(())
}

/// Start options shared by both samplers of one unit; the per-unit prefix
/// keeps same-named outputs from colliding in `dstdir`.
fn sampler_options(index: usize, timestamp: &str, mode: Option<&str>) -> FeatureOptions {
    let mut options = FeatureOptions::new()
        .with_prefix(format!("sampler{index}"))
        .with_timestamp(timestamp);
    if let Some(mode) = mode {
        options = options.with_mode(mode);
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_options_prefix_is_per_unit() {
        let a = sampler_options(0, "2016-04-02_09-30-00", None);
        let b = sampler_options(1, "2016-04-02_09-30-00", Some("12V"));
        assert_eq!(a.prefix.as_deref(), Some("sampler0"));
        assert_eq!(b.prefix.as_deref(), Some("sampler1"));
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.mode, None);
        assert_eq!(b.mode.as_deref(), Some("12V"));
    }
}
