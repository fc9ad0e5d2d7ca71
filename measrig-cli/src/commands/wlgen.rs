//! Stochastic transcoding workload generator command.
//!
//! Starts one ffmpeg transcoding per configured CPU every wait interval,
//! picking source videos by a stochastically drawn target size. Finished
//! transcodes are reaped and their output deleted before every batch. All
//! generator state lives in [`Workload`], whose drop terminates the
//! remaining children and removes the destination directory, so cleanup
//! also runs on error paths and on ctrl-c.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Exp, Normal, Uniform};
use tokio::signal::unix::{signal, Signal, SignalKind};

use measrig_core::VideoCatalog;

use crate::cli::SizeDistribution;
use crate::error::CliError;

/// Parameters of the workload generator
pub struct WlgenParams<'a> {
    /// Source video pool directory
    pub pool: &'a Path,
    /// Temporary destination directory
    pub dstdir: &'a Path,
    /// Maximum video size clamp (bytes)
    pub vmax: u64,
    /// CPUs a transcoding is pinned to, round-robin per batch
    pub cpus: Option<Vec<usize>>,
    /// Wait between batches (seconds)
    pub wait: u64,
    /// Size distribution selector
    pub size: SizeDistribution,
    /// Constant size (bytes)
    pub csize: u64,
    /// Exponential expectation value (bytes)
    pub mu: f64,
    /// Normal expectation value (bytes)
    pub gmu: f64,
    /// Normal standard deviation (bytes)
    pub gsigma: f64,
    /// Uniform minimum (bytes)
    pub uvmin: u64,
}

/// Draws target video sizes, clamped to `[1, vmax]`
enum SizeSampler {
    Const { size: u64 },
    Exp { distr: Exp<f64>, vmax: u64 },
    Gauss { distr: Normal<f64>, vmax: u64 },
    Uni { distr: Uniform<f64> },
}

impl SizeSampler {
    #[allow(clippy::cast_precision_loss)]
    fn from_params(params: &WlgenParams<'_>) -> Result<Self, CliError> {
        match params.size {
            SizeDistribution::Const => Ok(Self::Const {
                size: params.csize.min(params.vmax),
            }),
            SizeDistribution::Exp => Exp::new(1.0 / params.mu)
                .map(|distr| Self::Exp {
                    distr,
                    vmax: params.vmax,
                })
                .map_err(|e| CliError::Workload(format!("invalid --mu: {e}"))),
            SizeDistribution::Gauss => Normal::new(params.gmu, params.gsigma)
                .map(|distr| Self::Gauss {
                    distr,
                    vmax: params.vmax,
                })
                .map_err(|e| CliError::Workload(format!("invalid --gmu/--gsigma: {e}"))),
            SizeDistribution::Uni => {
                if params.uvmin > params.vmax {
                    return Err(CliError::Workload(format!(
                        "--uvmin {} exceeds --vmax {}",
                        params.uvmin, params.vmax
                    )));
                }
                Ok(Self::Uni {
                    distr: Uniform::new_inclusive(params.uvmin as f64, params.vmax as f64),
                })
            }
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sample<R: Rng>(&self, rng: &mut R) -> u64 {
        match self {
            Self::Const { size } => *size,
            Self::Exp { distr, vmax } => distr.sample(rng).min(*vmax as f64) as u64,
            Self::Gauss { distr, vmax } => distr.sample(rng).min(*vmax as f64).max(1.0) as u64,
            Self::Uni { distr } => distr.sample(rng) as u64,
        }
    }
}

/// Running transcodes and the directory holding their outputs
struct Workload {
    dstdir: PathBuf,
    processes: HashMap<PathBuf, Child>,
}

impl Workload {
    fn new(dstdir: &Path) -> std::io::Result<Self> {
        if !dstdir.is_dir() {
            std::fs::create_dir_all(dstdir)?;
        }
        Ok(Self {
            dstdir: dstdir.to_path_buf(),
            processes: HashMap::new(),
        })
    }

    /// Removes finished transcodes from the table and their output files
    /// from disk.
    fn reap_finished(&mut self) {
        let finished: Vec<PathBuf> = self
            .processes
            .iter_mut()
            .filter_map(|(path, child)| match child.try_wait() {
                Ok(None) => None,
                Ok(Some(_)) | Err(_) => Some(path.clone()),
            })
            .collect();
        for path in finished {
            tracing::debug!(file = %path.display(), "transcode finished, deleting output");
            let _ = std::fs::remove_file(&path);
            self.processes.remove(&path);
        }
    }

    /// Starts one pinned transcoding of `src` into the destination
    /// directory. A destination name collision replaces the table entry,
    /// matching the process-table semantics of the device layer.
    fn spawn(&mut self, cpu: usize, src: &Path, dst: PathBuf) -> std::io::Result<()> {
        let command = format!(
            "taskset -c {cpu} ffmpeg -loglevel 0 -i {} -vcodec flv -acodec adpcm_swf \
             -ar 44100 -ac 2 -y {}",
            src.display(),
            dst.display()
        );
        let child = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        self.processes.insert(dst, child);
        Ok(())
    }
}

impl Drop for Workload {
    fn drop(&mut self) {
        for child in self.processes.values_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = std::fs::remove_dir_all(&self.dstdir);
    }
}

/// Resolves when the process is asked to stop.
///
/// The rig's own stop path delivers SIGTERM (`Device::stop` runs a remote
/// `kill {pid}`), and a dropped terminal delivers SIGHUP; both must break
/// the generator loop so [`Workload`]'s drop runs, not just ctrl-c.
struct ShutdownSignals {
    terminate: Signal,
    hangup: Signal,
}

impl ShutdownSignals {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    async fn recv(&mut self) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = self.terminate.recv() => {}
            _ = self.hangup.recv() => {}
        }
    }
}

fn all_cpus() -> Vec<usize> {
    let count = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    (0..count).collect()
}

/// Workload generator command handler. Runs until ctrl-c.
pub fn cmd_wlgen(params: WlgenParams<'_>) -> Result<(), CliError> {
    let catalog = VideoCatalog::scan(params.pool).map_err(|e| CliError::Pool(e.to_string()))?;
    let sampler = SizeSampler::from_params(&params)?;
    let cpus = params.cpus.clone().unwrap_or_else(all_cpus);
    let wait = Duration::from_secs(params.wait);

    let mut workload = Workload::new(params.dstdir)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Workload(format!("failed to create async runtime: {e}")))?;

    runtime.block_on(async {
        let mut signals = ShutdownSignals::install()?;
        let mut rng = rand::thread_rng();
        loop {
            workload.reap_finished();

            for &cpu in &cpus {
                let size = sampler.sample(&mut rng);
                let entry = catalog.nearest(size);
                let dst = workload.dstdir.join(format!("{size}.flv"));
                tracing::info!(
                    requested = size,
                    actual = entry.size,
                    cpu,
                    src = %entry.path.display(),
                    "starting transcode"
                );
                workload.spawn(cpu, &entry.path, dst)?;
            }

            tracing::info!(wait_secs = params.wait, "waiting for next batch");
            tokio::select! {
                () = signals.recv() => break,
                () = tokio::time::sleep(wait) => {}
            }
        }
        Ok::<(), CliError>(())
    })?;

    tracing::info!("interrupted, cleaning up");
    Ok(())
}
