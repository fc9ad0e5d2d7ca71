//! Command handler modules for the CLI.

mod sample;
mod subset;
mod sweep;
mod wlgen;

use std::path::Path;

use crate::cli::Commands;
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(config_path: Option<&Path>, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Sweep {
            dstdir,
            window,
            idle,
        } => sweep::cmd_sweep(config_path, dstdir.as_deref(), window, idle),
        Commands::Sample {
            duration,
            mode,
            dstdir,
        } => sample::cmd_sample(config_path, duration, mode.as_deref(), dstdir.as_deref()),
        Commands::Wlgen {
            pool,
            dstdir,
            vmax,
            cpus,
            wait,
            size,
            csize,
            mu,
            gmu,
            gsigma,
            uvmin,
        } => wlgen::cmd_wlgen(wlgen::WlgenParams {
            pool: &pool,
            dstdir: &dstdir,
            vmax,
            cpus,
            wait,
            size,
            csize,
            mu,
            gmu,
            gsigma,
            uvmin,
        }),
        Commands::Subset {
            pool,
            dstdir,
            minsize,
            maxsize,
            factor,
            yes,
        } => subset::cmd_subset(&pool, &dstdir, minsize, maxsize, factor, yes),
    }
}
