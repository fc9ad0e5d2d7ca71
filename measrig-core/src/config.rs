//! Rig configuration
//!
//! Everything a composition needs is supplied here at construction time:
//! device addresses, elevation secrets, feature defaults (sample
//! directories, meter modes), and the experiment plan. There is no dynamic
//! reconfiguration after construction; per-call overrides go through
//! [`crate::feature::FeatureOptions`].

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{RigError, RigResult};

/// Default config file name under the user config directory
const CONFIG_FILE: &str = "measrig/config.toml";

/// One execution target and its feature defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// SSH destination (`user@addr` or a config alias); unset means the
    /// local-machine shell fallback
    pub host: Option<String>,
    /// Non-default SSH port
    pub port: Option<u16>,
    /// Path to an SSH private key
    pub identity_file: Option<String>,
    /// Elevation secret for commands requiring elevated rights
    pub secret: Option<String>,
    /// Resource-logger defaults, when the device carries one
    pub resource_log: Option<ResourceLogConfig>,
    /// Power-meter defaults, when the device carries the samplers
    pub meters: Option<MeterConfig>,
    /// Workload command slot, when the device runs the load generator
    pub workload: Option<WorkloadConfig>,
}

impl DeviceConfig {
    /// The elevation secret wrapped for safe handling
    #[must_use]
    pub fn secret_string(&self) -> Option<SecretString> {
        self.secret.as_deref().map(SecretString::from)
    }
}

/// Defaults for the system-resource logger feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLogConfig {
    /// Sample directory on the device
    pub output_dir: String,
    /// Comma-separated network interfaces to sample
    #[serde(default = "default_interfaces")]
    pub interfaces: String,
}

fn default_interfaces() -> String {
    "eth0".to_string()
}

/// Defaults for the power-meter sampler features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Sample directory on the sampler unit
    pub output_dir: String,
    /// Account the WT230 tool samples under
    pub user: String,
    /// Measurement mode applied when a start supplies none
    pub mode: Option<String>,
}

/// The workload command slot of a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Command started in the slot; per-run flags are appended
    pub command: String,
}

/// Parameters of one governor-sweep experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Local directory receiving the saved CSVs
    pub dstdir: String,
    /// Measurement window per configuration (seconds)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Wait between workload batches (seconds), passed to the generator
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,
    /// Governors to sweep, in order
    #[serde(default = "default_governors")]
    pub governors: Vec<String>,
    /// CPU sets the workload is pinned to, one sweep pass per set
    #[serde(default = "default_cpu_sets")]
    pub cpu_sets: Vec<Vec<usize>>,
    /// Minimal video size for the uniform distribution (bytes)
    #[serde(default = "default_uvmin")]
    pub uvmin: u64,
    /// Maximum video size clamp (bytes)
    #[serde(default = "default_vmax")]
    pub vmax: u64,
}

fn default_window_secs() -> u64 {
    60
}

fn default_wait_secs() -> u64 {
    30
}

fn default_governors() -> Vec<String> {
    ["performance", "powersave", "conservative", "ondemand"]
        .map(String::from)
        .to_vec()
}

fn default_cpu_sets() -> Vec<Vec<usize>> {
    vec![vec![0], (0..4).collect(), (0..6).collect(), (0..8).collect()]
}

fn default_uvmin() -> u64 {
    1
}

fn default_vmax() -> u64 {
    30_000_000
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dstdir: "measurements".to_string(),
            window_secs: default_window_secs(),
            wait_secs: default_wait_secs(),
            governors: default_governors(),
            cpu_sets: default_cpu_sets(),
            uvmin: default_uvmin(),
            vmax: default_vmax(),
        }
    }
}

/// Top-level rig configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RigConfig {
    /// The instrumented video server running the transcoding workload
    pub video_server: DeviceConfig,
    /// Power-sampler units, in rig order
    #[serde(default)]
    pub power_samplers: Vec<DeviceConfig>,
    /// Experiment plan
    #[serde(default)]
    pub experiment: ExperimentConfig,
}

impl RigConfig {
    /// Loads the configuration from a TOML file, expanding `~` in the path.
    ///
    /// # Errors
    /// [`RigError::Io`] when the file cannot be read,
    /// [`RigError::Configuration`] when it does not parse.
    pub fn load(path: &Path) -> RigResult<Self> {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        let text = std::fs::read_to_string(&expanded)?;
        toml::from_str(&text)
            .map_err(|e| RigError::Configuration(format!("invalid config {expanded}: {e}")))
    }

    /// Loads from the default location under the user config directory.
    ///
    /// # Errors
    /// [`RigError::Configuration`] when no config directory exists;
    /// otherwise as [`RigConfig::load`].
    pub fn load_default() -> RigResult<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| RigError::Configuration("no user config directory".to_string()))?;
        Self::load(&base.join(CONFIG_FILE))
    }

    /// Local destination directory for saved artifacts, `~` expanded
    #[must_use]
    pub fn dstdir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.experiment.dstdir).into_owned())
    }
}
