//! Governor sweep experiment command.
//!
//! For every {CPU set × governor} point: apply the governor, start the
//! workload slot and the resource logger on the video server, sleep the
//! measurement window, stop both and save the logger CSV locally under a
//! prefix encoding the point's parameters. The device is announced on the
//! first feature start and un-announced by the final teardown.

use std::path::Path;
use std::time::Duration;

use measrig_core::{ExperimentConfig, FeatureOptions, InstrumentedDevice, RigConfig, WORKLOAD_SLOT};

use crate::error::CliError;

/// Sweep command handler
pub fn cmd_sweep(
    config_path: Option<&Path>,
    dstdir_override: Option<&Path>,
    window_override: Option<u64>,
    idle: bool,
) -> Result<(), CliError> {
    let mut config = config_path
        .map_or_else(RigConfig::load_default, RigConfig::load)
        .map_err(|e| CliError::Config(e.to_string()))?;
    if let Some(window) = window_override {
        config.experiment.window_secs = window;
    }

    let dstdir = dstdir_override.map_or_else(|| config.dstdir(), Path::to_path_buf);
    std::fs::create_dir_all(&dstdir)?;

    let mut server = measrig_core::rig::video_server(&config.video_server)?;
    // Saved artifacts carry wall-clock stamps; align best-effort before
    // the first measurement
    server
        .device_mut()
        .sync_clock(measrig_core::DEFAULT_NTP_SERVER, false)?;

    let result = run_sweep(&mut server, &config.experiment, &dstdir, idle);
    let teardown = server.teardown();
    result?;
    teardown?;
    Ok(())
}

fn run_sweep(
    server: &mut InstrumentedDevice,
    experiment: &ExperimentConfig,
    dstdir: &Path,
    idle: bool,
) -> Result<(), CliError> {
    let window = Duration::from_secs(experiment.window_secs);

    for cpus in &experiment.cpu_sets {
        for governor in &experiment.governors {
            tracing::info!(governor = %governor, cpus = ?cpus, "measuring configuration");
            server.device_mut().set_governor(governor, None)?;

            if !idle {
                server.feature_start(WORKLOAD_SLOT, &workload_options(experiment, cpus))?;
            }
            server.feature_start("dstat", &FeatureOptions::new())?;

            std::thread::sleep(window);

            server.feature_stop("dstat")?;
            if !idle {
                server.feature_stop(WORKLOAD_SLOT)?;
                // The generator's transcodes outlive it; sweep them up so
                // the next point starts from an idle machine
                server.device_mut().run("pkill ffmpeg || echo", false)?;
            }

            let prefix = point_prefix(experiment, cpus.len(), governor, idle);
            let saved =
                server.feature_save("dstat", &dstdir.join(format!("{prefix}_dstat.csv")))?;
            tracing::info!(file = %saved.display(), "saved measurement");
        }
        // Idle measurements do not touch the workload's CPU sets
        if idle {
            break;
        }
    }
    Ok(())
}

/// Per-call arguments appended to the configured workload command
fn workload_options(experiment: &ExperimentConfig, cpus: &[usize]) -> FeatureOptions {
    let cpu_list = cpus
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    FeatureOptions::new()
        .with_arg("--size uni")
        .with_arg(format!("--wait {}", experiment.wait_secs))
        .with_arg(format!("--uvmin {}", experiment.uvmin))
        .with_arg(format!("--vmax {}", experiment.vmax))
        .with_arg(format!("--cpus {cpu_list}"))
}

/// File-name prefix encoding one measurement point's parameters
fn point_prefix(
    experiment: &ExperimentConfig,
    cpu_count: usize,
    governor: &str,
    idle: bool,
) -> String {
    if idle {
        format!(
            "cpus={cpu_count}_time={}_idle_governor={governor}",
            experiment.window_secs
        )
    } else {
        format!(
            "cpus={cpu_count}_time={}_wait={}_uvmin={}_vmax={}_governor={governor}",
            experiment.window_secs, experiment.wait_secs, experiment.uvmin, experiment.vmax
        )
    }
}
