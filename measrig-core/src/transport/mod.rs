//! Remote command execution over SSH or a local shell
//!
//! A [`Transport`] opens a channel to one named endpoint and executes
//! command strings there, either synchronously ([`Transport::run`]) or in
//! the background ([`Transport::spawn`]). Commands are plain shell text;
//! quoting is the remote shell's own business (the caller composes the
//! string, this layer never re-quotes it).
//!
//! Two bindings exist: [`SshTransport`] shells out to `ssh`/`scp` the same
//! way the monitoring exec path does, and [`LocalShell`] runs everything
//! under `sh -c` on the local machine. Both implement the same contract, so
//! a device picks its binding at construction and nothing above notices.

mod local;
mod ssh;

pub use local::LocalShell;
pub use ssh::SshTransport;

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::time::Duration;

use crate::error::{RigError, RigResult};

/// Default delay a caller sleeps after a background spawn (100 ms).
///
/// Many transports tear down the channel as soon as the invoking shell
/// session ends; the delay gives the backgrounded process time to detach
/// before the session closes, at the cost of latency. A deliberate
/// trade-off, not a bug.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_millis(100);

/// Handle to one background execution, polled by the owning device
///
/// The handle streams status locally; polling never performs a network
/// round-trip.
pub trait ProcessHandle: Send {
    /// Non-blocking completion check.
    ///
    /// Returns `Ok(None)` while the execution is still running, and the
    /// exit code once it has terminated. Terminations by signal report `-1`.
    fn poll(&mut self) -> RigResult<Option<i32>>;

    /// Drains the buffered stdout and stderr captured since spawn.
    ///
    /// Must only be called after [`ProcessHandle::poll`] reported
    /// termination; draining a live execution would block on the stream.
    fn drain(&mut self) -> RigResult<(String, String)>;
}

/// Command execution channel to one endpoint
pub trait Transport: Send {
    /// Executes `command` and blocks until remote completion.
    ///
    /// # Errors
    /// [`RigError::Execution`] with the remote exit code and captured
    /// stderr when the command exits non-zero; [`RigError::Transport`] for
    /// connection or authentication failures.
    fn run(&self, command: &str) -> RigResult<(String, String)>;

    /// Starts `command` in the background on the remote shell.
    ///
    /// The command is wrapped as `{command} & echo $! && sleep {delay}`:
    /// the background job's pid is echoed immediately, and the trailing
    /// sleep keeps the invoking session open long enough for the job to
    /// detach. The caller additionally sleeps `startup_delay` before this
    /// returns.
    ///
    /// # Errors
    /// [`RigError::Transport`] when the channel cannot be opened or no pid
    /// is echoed.
    fn spawn(
        &self,
        command: &str,
        startup_delay: Duration,
    ) -> RigResult<(u32, Box<dyn ProcessHandle>)>;

    /// Retrieves the file at `remote` into `destination`.
    ///
    /// `scp` for the SSH binding, a plain filesystem copy for the local
    /// binding. `destination` must be a full file path; directory handling
    /// is the caller's job.
    ///
    /// # Errors
    /// [`RigError::Execution`] when the copy command fails,
    /// [`RigError::Transport`] or [`RigError::Io`] when it cannot start.
    fn fetch(&self, remote: &std::path::Path, destination: &std::path::Path) -> RigResult<()>;

    /// Endpoint label for logging ("user@host" or "local")
    fn endpoint(&self) -> &str;
}

/// Handle over a spawned local child carrying the channel to a background
/// execution (the `ssh` process itself, or the local `sh`).
pub(crate) struct ChildHandle {
    child: Child,
    stdout: Option<BufReader<ChildStdout>>,
    stderr: Option<ChildStderr>,
    exit_code: Option<i32>,
}

impl ProcessHandle for ChildHandle {
    fn poll(&mut self) -> RigResult<Option<i32>> {
        if let Some(code) = self.exit_code {
            return Ok(Some(code));
        }
        match self.child.try_wait()? {
            Some(status) => {
                let code = status.code().unwrap_or(-1);
                self.exit_code = Some(code);
                Ok(Some(code))
            }
            None => Ok(None),
        }
    }

    fn drain(&mut self) -> RigResult<(String, String)> {
        let mut stdout = String::new();
        if let Some(mut reader) = self.stdout.take() {
            reader.read_to_string(&mut stdout)?;
        }
        let mut stderr = String::new();
        if let Some(mut reader) = self.stderr.take() {
            reader.read_to_string(&mut stderr)?;
        }
        Ok((stdout, stderr))
    }
}

/// Spawns `command` (a fully assembled local argv) with piped stdio, reads
/// the echoed pid from the first stdout line, sleeps `startup_delay`, and
/// returns the pid with a handle over the remaining streams.
pub(crate) fn spawn_with_pid_echo(
    mut command: Command,
    startup_delay: Duration,
) -> RigResult<(u32, Box<dyn ProcessHandle>)> {
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| RigError::Transport(format!("failed to spawn transport process: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RigError::Transport("no stdout pipe on transport process".to_string()))?;
    let stderr = child.stderr.take();

    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let pid: u32 = line.trim().parse().map_err(|_| {
        RigError::Transport(format!(
            "transport did not echo a process id (got {line:?})"
        ))
    })?;

    std::thread::sleep(startup_delay);

    let handle = ChildHandle {
        child,
        stdout: Some(reader),
        stderr,
        exit_code: None,
    };
    Ok((pid, Box::new(handle)))
}

/// Formats a startup delay for embedding into the remote `sleep`.
///
/// Sub-second delays need fractional seconds; `sleep 0.1` is POSIX-enough
/// for the target hosts.
pub(crate) fn delay_seconds(delay: Duration) -> String {
    if delay.subsec_nanos() == 0 {
        format!("{}", delay.as_secs())
    } else {
        format!("{}", delay.as_secs_f64())
    }
}

/// Wraps a command for background spawn with pid echo and session-keeping
/// sleep.
pub(crate) fn background_command(command: &str, startup_delay: Duration) -> String {
    format!(
        "{command} & echo $! && sleep {}",
        delay_seconds(startup_delay)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_command_wraps_with_pid_echo_and_sleep() {
        let cmd = background_command("dstat --output /tmp/x.csv", DEFAULT_STARTUP_DELAY);
        assert_eq!(cmd, "dstat --output /tmp/x.csv & echo $! && sleep 0.1");
    }

    #[test]
    fn test_delay_seconds_whole_and_fractional() {
        assert_eq!(delay_seconds(Duration::from_secs(2)), "2");
        assert_eq!(delay_seconds(Duration::from_millis(100)), "0.1");
        assert_eq!(delay_seconds(Duration::from_millis(1500)), "1.5");
    }

    #[test]
    fn test_spawn_with_pid_echo_reads_first_line() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo 4242; echo body; echo oops >&2");
        let (pid, mut handle) = spawn_with_pid_echo(cmd, Duration::from_millis(1)).unwrap();
        assert_eq!(pid, 4242);

        // Child is a short-lived shell; wait for it to finish
        while handle.poll().unwrap().is_none() {
            std::thread::sleep(Duration::from_millis(5));
        }
        let (out, err) = handle.drain().unwrap();
        assert_eq!(out, "body\n");
        assert_eq!(err, "oops\n");
    }

    #[test]
    fn test_spawn_with_pid_echo_rejects_garbage() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo not-a-pid");
        let err = spawn_with_pid_echo(cmd, Duration::from_millis(1)).err().unwrap();
        assert!(matches!(err, RigError::Transport(_)));
    }
}
