//! Local shell transport binding
//!
//! Fallback used when the "remote" device is the machine the rig runs on.
//! Commands go through `sh -c`, artifact retrieval is a plain filesystem
//! copy; the contract is otherwise identical to the SSH binding.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::error::{RigError, RigResult};

use super::{background_command, spawn_with_pid_echo, ProcessHandle, Transport};

/// Transport executing commands on the local machine via `sh -c`
#[derive(Debug, Clone, Default)]
pub struct LocalShell;

impl LocalShell {
    /// Creates a local shell transport
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn shell(command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

impl Transport for LocalShell {
    fn run(&self, command: &str) -> RigResult<(String, String)> {
        tracing::debug!(command, "local run");
        let output = Self::shell(command)
            .output()
            .map_err(|e| RigError::Transport(format!("failed to spawn shell: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.status.success() {
            Ok((stdout, stderr))
        } else {
            Err(RigError::Execution {
                code: output.status.code().unwrap_or(-1),
                stderr,
            })
        }
    }

    fn spawn(
        &self,
        command: &str,
        startup_delay: Duration,
    ) -> RigResult<(u32, Box<dyn ProcessHandle>)> {
        tracing::debug!(command, "local spawn");
        let cmd = Self::shell(&background_command(command, startup_delay));
        spawn_with_pid_echo(cmd, startup_delay)
    }

    fn fetch(&self, remote: &Path, destination: &Path) -> RigResult<()> {
        tracing::debug!(
            remote = %remote.display(),
            destination = %destination.display(),
            "local fetch"
        );
        std::fs::copy(remote, destination)?;
        Ok(())
    }

    fn endpoint(&self) -> &str {
        "local"
    }
}
