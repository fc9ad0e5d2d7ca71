//! Pluggable start/stop/save instrumentation features
//!
//! A [`Feature`] is one unit of instrumentation a device composition may
//! include: the system-resource logger, a power-meter sampler, or a plain
//! named command slot. Each feature owns exactly one active remote process
//! slot and a "last output file" reference; starting an occupied slot
//! stops the previous occupant first (replace-on-start, never append).
//!
//! An [`InstrumentedDevice`] is a base [`Device`] plus an ordered set of
//! named feature slots; `feature_start`/`feature_stop`/`feature_save` are
//! dispatched through the name lookup table. Slots are independent: no
//! feature knows about any other.

mod resource_logger;
mod wt230;
mod yokogawa;

pub use resource_logger::ResourceLogger;
pub use wt230::Wt230Meter;
pub use yokogawa::YokogawaMeter;

use std::path::{Path, PathBuf};

use crate::device::{Device, DEFAULT_MARKER_MESSAGE};
use crate::error::{RigError, RigResult};
use crate::transport::DEFAULT_STARTUP_DELAY;

/// Second-resolution, lexically sortable timestamp used in output filenames
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Default prefix for generated output filenames
pub const DEFAULT_PREFIX: &str = "measrig";

/// Formats the current local time in [`TIMESTAMP_FORMAT`]
#[must_use]
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Per-call options for a feature start
#[derive(Debug, Clone, Default)]
pub struct FeatureOptions {
    /// Output filename prefix (feature default when unset)
    pub prefix: Option<String>,
    /// Timestamp to embed instead of "now" (lets one run's artifacts share
    /// a stamp across features)
    pub timestamp: Option<String>,
    /// Full output file path, overriding the derived default
    pub output_file: Option<PathBuf>,
    /// Meter measurement mode, e.g. "230V" or "12V"
    pub mode: Option<String>,
    /// Extra arguments appended verbatim to the feature's command line
    pub extra_args: Vec<String>,
}

impl FeatureOptions {
    /// Creates empty options (every feature default applies)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output filename prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets an explicit timestamp
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Sets a full output file path
    #[must_use]
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Sets the meter mode
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Appends an extra command-line argument
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// The explicit timestamp, or the current time formatted for filenames
    #[must_use]
    pub fn timestamp_or_now(&self) -> String {
        self.timestamp.clone().unwrap_or_else(timestamp_now)
    }
}

/// A feature's resolved command line and the output file it will write
#[derive(Debug, Clone)]
pub struct FeaturePlan {
    /// Command to start on the device
    pub command: String,
    /// Output file the command writes, if the feature produces one
    pub output: Option<PathBuf>,
}

impl FeaturePlan {
    /// Plan for a command that produces an output artifact
    #[must_use]
    pub fn with_output(command: String, output: PathBuf) -> Self {
        Self {
            command,
            output: Some(output),
        }
    }

    /// Plan for a command without an output artifact
    #[must_use]
    pub const fn bare(command: String) -> Self {
        Self {
            command,
            output: None,
        }
    }
}

/// One unit of pluggable instrumentation
pub trait Feature: Send {
    /// Slot name the composition dispatches on ("dstat", "wt230", ...)
    fn name(&self) -> &str;

    /// Resolves the command line and output path for one start
    fn plan(&self, options: &FeatureOptions) -> FeaturePlan;
}

/// Fixed command slot materialized from an explicit name→command map
///
/// Start/stop only; it records no output artifact, so `feature_save`
/// reports [`RigError::NoOutput`]. Extra per-call arguments are appended
/// to the stored command.
pub struct NamedCommand {
    name: String,
    command: String,
}

impl NamedCommand {
    /// Creates a named command slot
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

impl Feature for NamedCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn plan(&self, options: &FeatureOptions) -> FeaturePlan {
        let mut command = self.command.clone();
        for arg in &options.extra_args {
            command.push(' ');
            command.push_str(arg);
        }
        FeaturePlan::bare(command)
    }
}

/// One feature slot: the feature, its active process, its last output
struct Slot {
    feature: Box<dyn Feature>,
    pid: Option<u32>,
    last_output: Option<PathBuf>,
}

/// A device composed with an ordered set of named features
///
/// The composition announces the device (advisory marker) before the first
/// feature starts, and [`InstrumentedDevice::teardown`] un-announces
/// unconditionally. Slots are registered at construction; dispatch is by
/// name at call time.
pub struct InstrumentedDevice {
    device: Device,
    slots: Vec<Slot>,
}

impl InstrumentedDevice {
    /// Creates a composition with no features
    #[must_use]
    pub fn new(device: Device) -> Self {
        Self {
            device,
            slots: Vec::new(),
        }
    }

    /// Registers a feature, keeping registration order.
    ///
    /// # Errors
    /// [`RigError::Configuration`] on a duplicate feature name.
    pub fn with_feature(mut self, feature: Box<dyn Feature>) -> RigResult<Self> {
        if self.slots.iter().any(|s| s.feature.name() == feature.name()) {
            return Err(RigError::Configuration(format!(
                "duplicate feature name '{}'",
                feature.name()
            )));
        }
        self.slots.push(Slot {
            feature,
            pid: None,
            last_output: None,
        });
        Ok(self)
    }

    /// Registers a [`NamedCommand`] slot.
    ///
    /// # Errors
    /// [`RigError::Configuration`] on a duplicate feature name.
    pub fn with_command(
        self,
        name: impl Into<String>,
        command: impl Into<String>,
    ) -> RigResult<Self> {
        self.with_feature(Box::new(NamedCommand::new(name, command)))
    }

    /// The underlying device
    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Mutable access to the underlying device (run, governor, clock, ...)
    pub fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    /// Registered feature names, in registration order
    #[must_use]
    pub fn feature_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.feature.name()).collect()
    }

    fn slot_index(&self, name: &str) -> RigResult<usize> {
        self.slots
            .iter()
            .position(|s| s.feature.name() == name)
            .ok_or_else(|| {
                RigError::Configuration(format!("no feature '{name}' on this device"))
            })
    }

    /// Last output file recorded for `name`, if any
    #[must_use]
    pub fn last_output(&self, name: &str) -> Option<&Path> {
        self.slots
            .iter()
            .find(|s| s.feature.name() == name)
            .and_then(|s| s.last_output.as_deref())
    }

    /// Starts the feature `name`.
    ///
    /// An occupied slot is stopped first; the previous stop fully completes
    /// before the new start is issued. The recorded output path is
    /// invalidated on entry and re-recorded only after a successful start.
    /// The device is announced first if it is not yet.
    ///
    /// # Errors
    /// Unknown feature names are [`RigError::Configuration`]; start
    /// failures carry the [`crate::device::Device::start`] taxonomy.
    pub fn feature_start(&mut self, name: &str, options: &FeatureOptions) -> RigResult<u32> {
        let idx = self.slot_index(name)?;
        if !self.device.is_announced() {
            self.device.announce(DEFAULT_MARKER_MESSAGE)?;
        }

        let slot = &mut self.slots[idx];
        if let Some(pid) = slot.pid.take() {
            self.device.stop(pid)?;
        }
        slot.last_output = None;

        let plan = slot.feature.plan(options);
        tracing::info!(feature = name, command = %plan.command, "starting feature");
        let pid = self.device.start(&plan.command, false, DEFAULT_STARTUP_DELAY)?;
        let slot = &mut self.slots[idx];
        slot.pid = Some(pid);
        slot.last_output = plan.output;
        Ok(pid)
    }

    /// Stops the feature `name` and clears its slot.
    ///
    /// A no-op when the slot is empty; the "last output file" reference
    /// survives so the artifact can still be saved.
    ///
    /// # Errors
    /// Unknown feature names, or transport failure of the stop.
    pub fn feature_stop(&mut self, name: &str) -> RigResult<()> {
        let idx = self.slot_index(name)?;
        if let Some(pid) = self.slots[idx].pid.take() {
            self.device.stop(pid)?;
        }
        Ok(())
    }

    /// Retrieves the feature's last output file to `destination`.
    ///
    /// A directory destination receives the file under the remote base
    /// name; any other destination is used verbatim. Returns the final
    /// local path.
    ///
    /// # Errors
    /// [`RigError::NoOutput`] when the feature never recorded an output
    /// file; otherwise the transport's fetch taxonomy.
    pub fn feature_save(&mut self, name: &str, destination: &Path) -> RigResult<PathBuf> {
        let idx = self.slot_index(name)?;
        let remote = self.slots[idx]
            .last_output
            .clone()
            .ok_or_else(|| RigError::NoOutput(name.to_string()))?;

        let target = if destination.is_dir() {
            let base = remote.file_name().ok_or_else(|| {
                RigError::Configuration(format!(
                    "output path {} has no file name",
                    remote.display()
                ))
            })?;
            destination.join(base)
        } else {
            destination.to_path_buf()
        };

        self.device.fetch(&remote, &target)?;
        Ok(target)
    }

    /// Stops every occupied slot and removes the announce marker.
    ///
    /// Safe to call unconditionally; a marker that never existed does not
    /// raise (see [`Device::rm_announce`]).
    ///
    /// # Errors
    /// Transport failures only.
    pub fn teardown(&mut self) -> RigResult<()> {
        let names: Vec<String> = self
            .slots
            .iter()
            .filter(|s| s.pid.is_some())
            .map(|s| s.feature.name().to_string())
            .collect();
        for name in names {
            self.feature_stop(&name)?;
        }
        self.device.rm_announce()
    }
}

impl std::fmt::Debug for InstrumentedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedDevice")
            .field("device", &self.device)
            .field("features", &self.feature_names())
            .finish()
    }
}
