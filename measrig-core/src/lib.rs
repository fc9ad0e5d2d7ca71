//! `measrig` Core Library
//!
//! This crate provides the device-control layer for the measrig measurement
//! rig: starting long-running commands on remote hosts over SSH (or a local
//! shell fallback), tracking them by process id, retrieving output and exit
//! status, and composing pluggable instrumentation features (system-resource
//! logger, external power meters) onto device objects.
//!
//! # Crate Structure
//!
//! - [`transport`] - Remote command execution over SSH or a local shell
//! - [`elevate`] - Non-interactive privilege escalation wrapping
//! - [`device`] - Device handle with process table and host-level helpers
//! - [`feature`] - Pluggable start/stop/save instrumentation features
//! - [`rig`] - Concrete device compositions used by the experiment driver
//! - [`config`] - Rig configuration loaded from a TOML file
//! - [`catalog`] - Nearest-size lookup over a pool of video files
//! - [`testing`] - Scripted transport fakes for tests
//!
//! # Concurrency
//!
//! The whole layer assumes single-threaded, sequential use per device:
//! remote processes run concurrently with the caller once spawned, but
//! liveness and output are only read when the caller asks. Nothing here is
//! re-entrant; concurrent use of one device requires external serialization.

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod device;
pub mod elevate;
pub mod error;
pub mod feature;
pub mod rig;
pub mod testing;
pub mod transport;

pub use catalog::{CatalogEntry, VideoCatalog};
pub use config::{
    DeviceConfig, ExperimentConfig, MeterConfig, ResourceLogConfig, RigConfig, WorkloadConfig,
};
pub use device::{Device, RemoteProcess, DEFAULT_MARKER_MESSAGE, DEFAULT_NTP_SERVER, MARKER_PATH};
pub use elevate::Elevator;
pub use error::{RigError, RigResult};
pub use feature::{
    Feature, FeatureOptions, FeaturePlan, InstrumentedDevice, NamedCommand, ResourceLogger,
    Wt230Meter, YokogawaMeter,
};
pub use rig::{power_sampler, video_server, WORKLOAD_SLOT};
pub use transport::{LocalShell, ProcessHandle, SshTransport, Transport, DEFAULT_STARTUP_DELAY};
