//! Device handle with process table and host-level helpers
//!
//! A [`Device`] composes a transport, an [`Elevator`], and a per-device
//! process table into the operations the experiment driver needs:
//! run-and-wait, start-detached, stop, liveness/output queries, clock
//! synchronization, CPU governor control, and the announce marker.
//!
//! # Concurrency
//!
//! A device is built for single-threaded sequential use. The process table
//! is unsynchronized; calling into one device from two threads at once is
//! undefined and must be serialized externally.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::elevate::Elevator;
use crate::error::{RigError, RigResult};
use crate::transport::{ProcessHandle, Transport, DEFAULT_STARTUP_DELAY};

/// Well-known path of the advisory "device in active use" marker
pub const MARKER_PATH: &str = "/tmp/measrun";

/// Default message written into the marker file
pub const DEFAULT_MARKER_MESSAGE: &str = "measurement run in progress";

/// Default NTP server for clock synchronization
pub const DEFAULT_NTP_SERVER: &str = "ntp.ubuntu.com";

/// One tracked background execution on a device
///
/// Every `RemoteProcess` reachable from a device's table corresponds to a
/// pid actually returned by a successful [`Device::start`]. Entries are
/// never removed; a colliding pid replaces the previous entry (releasing
/// its handle) without terminating the process. See [`Device::start`].
pub struct RemoteProcess {
    pid: u32,
    handle: Box<dyn ProcessHandle>,
    started_at: DateTime<Utc>,
}

impl RemoteProcess {
    /// Remote-host-scoped process id (unique only within one device table)
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// When [`Device::start`] recorded this process
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl std::fmt::Debug for RemoteProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProcess")
            .field("pid", &self.pid)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

/// Execution target wrapped by the rig: a remote host over SSH, or the
/// local machine through the shell fallback
pub struct Device {
    transport: Box<dyn Transport>,
    elevator: Elevator,
    processes: HashMap<u32, RemoteProcess>,
    cpu_count: Option<usize>,
    announced: bool,
}

impl Device {
    /// Creates a device over the given transport
    #[must_use]
    pub fn new(transport: Box<dyn Transport>, elevator: Elevator) -> Self {
        Self {
            transport,
            elevator,
            processes: HashMap::new(),
            cpu_count: None,
            announced: false,
        }
    }

    /// Endpoint label of the underlying transport
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Whether the announce marker was placed by this device handle
    #[must_use]
    pub const fn is_announced(&self) -> bool {
        self.announced
    }

    /// Applies the elevation wrapper when requested.
    ///
    /// Checked before any network round-trip: a missing secret fails here.
    fn prepare(&self, command: &str, elevate: bool) -> RigResult<String> {
        if elevate {
            self.elevator.elevate(command)
        } else {
            Ok(command.to_string())
        }
    }

    /// Executes `command` on the device and waits for its end.
    ///
    /// # Errors
    /// [`RigError::Configuration`] when `elevate` is set without a secret,
    /// [`RigError::Execution`] for a non-zero remote exit,
    /// [`RigError::Transport`] for channel failures.
    pub fn run(&mut self, command: &str, elevate: bool) -> RigResult<(String, String)> {
        let command = self.prepare(command, elevate)?;
        self.transport.run(&command)
    }

    /// Starts `command` on the device in the background.
    ///
    /// Returns the remote process id and records a live handle in the
    /// table. A pid collision with an existing entry is not expected
    /// (remote pids); if it occurs the new entry overwrites the old one
    /// without killing it.
    ///
    /// # Errors
    /// Same taxonomy as [`Device::run`]; the elevation check happens
    /// before the transport is touched.
    pub fn start(
        &mut self,
        command: &str,
        elevate: bool,
        startup_delay: Duration,
    ) -> RigResult<u32> {
        let command = self.prepare(command, elevate)?;
        let (pid, handle) = self.transport.spawn(&command, startup_delay)?;
        tracing::info!(endpoint = %self.transport.endpoint(), pid, "started remote process");
        self.processes.insert(
            pid,
            RemoteProcess {
                pid,
                handle,
                started_at: Utc::now(),
            },
        );
        Ok(pid)
    }

    /// [`Device::start`] with the default startup delay
    ///
    /// # Errors
    /// See [`Device::start`].
    pub fn start_default(&mut self, command: &str, elevate: bool) -> RigResult<u32> {
        self.start(command, elevate, DEFAULT_STARTUP_DELAY)
    }

    /// The table entry for `pid`, if this device started it
    #[must_use]
    pub fn process(&self, pid: u32) -> Option<&RemoteProcess> {
        self.processes.get(&pid)
    }

    fn process_mut(&mut self, pid: u32) -> RigResult<&mut RemoteProcess> {
        self.processes.get_mut(&pid).ok_or_else(|| {
            RigError::Configuration(format!("unknown process id {pid} for this device"))
        })
    }

    /// Checks whether the process behind `pid` is still running.
    ///
    /// Polls the local handle's non-blocking completion state; never a
    /// network round-trip.
    ///
    /// # Errors
    /// [`RigError::Configuration`] for a pid this device never started.
    pub fn is_running(&mut self, pid: u32) -> RigResult<bool> {
        Ok(self.process_mut(pid)?.handle.poll()?.is_none())
    }

    /// Sends a best-effort termination signal to `pid` if still running.
    ///
    /// Fire-and-forget: does not block on the process dying, does not
    /// confirm death, does not remove the pid from the table. Calling it
    /// on an already-terminated process is a no-op, so `stop` is always
    /// safe to repeat.
    ///
    /// # Errors
    /// Transport failures propagate; a non-zero exit of the remote `kill`
    /// (process already gone) does not.
    pub fn stop(&mut self, pid: u32) -> RigResult<()> {
        if !self.is_running(pid)? {
            return Ok(());
        }
        tracing::info!(endpoint = %self.transport.endpoint(), pid, "stopping remote process");
        match self.transport.run(&format!("kill {pid}")) {
            Ok(_) => Ok(()),
            Err(err) if err.is_execution() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Returns stdout and stderr of a finished process.
    ///
    /// # Errors
    /// [`RigError::StillRunning`] while the process lives; the buffered
    /// streams are not touched in that case.
    pub fn get_output(&mut self, pid: u32) -> RigResult<(String, String)> {
        if self.is_running(pid)? {
            return Err(RigError::StillRunning(pid));
        }
        self.process_mut(pid)?.handle.drain()
    }

    /// Synchronizes the device clock against `server` (elevated).
    ///
    /// # Errors
    /// With `critical`, a failed sync propagates; otherwise a non-zero
    /// `ntpdate` exit yields `Ok(None)`. Transport and configuration
    /// errors always propagate.
    pub fn sync_clock(&mut self, server: &str, critical: bool) -> RigResult<Option<String>> {
        match self.run(&format!("ntpdate {server}"), true) {
            Ok((stdout, _)) => Ok(Some(stdout)),
            Err(err) if err.is_execution() && !critical => {
                tracing::warn!(server, error = %err, "non-critical clock sync failed");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Number of logical CPUs, resolved once per device lifetime.
    ///
    /// # Errors
    /// Transport or execution failure of the one-time remote query.
    pub fn cpu_count(&mut self) -> RigResult<usize> {
        if let Some(count) = self.cpu_count {
            return Ok(count);
        }
        let (stdout, _) = self.run("grep -c ^processor /proc/cpuinfo", false)?;
        let count: usize = stdout.trim().parse().map_err(|_| {
            RigError::Configuration(format!("unparseable cpu count {:?}", stdout.trim()))
        })?;
        self.cpu_count = Some(count);
        Ok(count)
    }

    /// Applies a cpufreq governor.
    ///
    /// With `cpus` omitted this is a single elevated round-trip: a remote
    /// shell loop over every logical CPU index `0..count-1`. With an
    /// explicit subset it is one elevated command per index, N round-trips
    /// traded for a trivially simple command line.
    ///
    /// # Errors
    /// [`RigError::Configuration`] without an elevation secret; otherwise
    /// the usual run taxonomy.
    pub fn set_governor(&mut self, governor: &str, cpus: Option<&[usize]>) -> RigResult<()> {
        match cpus {
            None => {
                let count = self.cpu_count()?;
                let command = format!(
                    "for i in $(seq 0 1 {}); do echo {governor} > \
                     /sys/devices/system/cpu/cpu$i/cpufreq/scaling_governor; done",
                    count.saturating_sub(1)
                );
                self.run(&command, true)?;
            }
            Some(cpus) => {
                for cpu in cpus {
                    let command = format!(
                        "echo {governor} > \
                         /sys/devices/system/cpu/cpu{cpu}/cpufreq/scaling_governor"
                    );
                    self.run(&command, true)?;
                }
            }
        }
        Ok(())
    }

    /// Retrieves the file at `remote` on the device into `destination`.
    ///
    /// Delegates to the transport binding: a remote-to-local secure copy
    /// for SSH devices, a plain filesystem copy when device and caller
    /// share storage.
    ///
    /// # Errors
    /// See [`Transport::fetch`].
    pub fn fetch(&mut self, remote: &std::path::Path, destination: &std::path::Path) -> RigResult<()> {
        self.transport.fetch(remote, destination)
    }

    /// Places the advisory marker signalling the device is in active use.
    ///
    /// # Errors
    /// Propagates any failure to write the marker.
    pub fn announce(&mut self, message: &str) -> RigResult<()> {
        self.run(&format!("echo {message} > {MARKER_PATH}"), false)?;
        self.announced = true;
        Ok(())
    }

    /// Removes the advisory marker.
    ///
    /// Teardown must be safe to call unconditionally, so a failing remote
    /// `rm` (marker never existed) is swallowed. Transport failures still
    /// propagate.
    ///
    /// # Errors
    /// [`RigError::Transport`] only.
    pub fn rm_announce(&mut self) -> RigResult<()> {
        match self.run(&format!("rm {MARKER_PATH}"), false) {
            Ok(_) | Err(RigError::Execution { .. }) => {
                self.announced = false;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("endpoint", &self.transport.endpoint())
            .field("processes", &self.processes.len())
            .field("cpu_count", &self.cpu_count)
            .field("announced", &self.announced)
            .finish()
    }
}
