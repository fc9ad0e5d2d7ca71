//! SSH transport binding
//!
//! Shells out to `ssh` for execution and `scp` for artifact retrieval.
//! This uses a fresh SSH process per operation rather than a persistent
//! channel, so a wedged remote command can never block the control path.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::error::{RigError, RigResult};

use super::{background_command, spawn_with_pid_echo, ProcessHandle, Transport};

/// Exit status `ssh` itself reports for connection or authentication
/// failures, as opposed to the remote command's own exit code.
const SSH_FAILURE_CODE: i32 = 255;

/// Connection timeout passed to ssh (seconds)
const CONNECT_TIMEOUT_SECS: u32 = 5;

/// Transport executing commands on a remote host via `ssh`
///
/// The destination is anything the local SSH client resolves: `user@addr`,
/// a bare address, or a `Host` alias from the SSH config.
#[derive(Debug, Clone)]
pub struct SshTransport {
    destination: String,
    port: u16,
    identity_file: Option<String>,
}

impl SshTransport {
    /// Creates a transport for `destination` on the default SSH port
    #[must_use]
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            port: 22,
            identity_file: None,
        }
    }

    /// Sets a non-default SSH port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the path to an SSH private key
    #[must_use]
    pub fn with_identity_file(mut self, path: impl Into<String>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Builds the ssh invocation up to (and including) the destination
    fn ssh_command(&self) -> Command {
        let mut cmd = Command::new("ssh");
        // Key-based auth only; a password prompt would hang the rig
        cmd.arg("-o").arg("BatchMode=yes");
        cmd.arg("-o").arg("StrictHostKeyChecking=no");
        cmd.arg("-o")
            .arg(format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"));
        if self.port != 22 {
            cmd.arg("-p").arg(self.port.to_string());
        }
        if let Some(ref key) = self.identity_file {
            cmd.arg("-i").arg(key);
        }
        cmd.arg(&self.destination);
        cmd
    }

    /// Maps an ssh exit status to the error taxonomy: exit 0 succeeds,
    /// 255 is ssh's own connection/authentication failure, any other code
    /// belongs to the remote command, and death by signal is a channel
    /// failure.
    fn classify_exit(
        &self,
        status: std::process::ExitStatus,
        stdout: String,
        stderr: String,
    ) -> RigResult<(String, String)> {
        match status.code() {
            Some(0) => Ok((stdout, stderr)),
            Some(SSH_FAILURE_CODE) => Err(RigError::Transport(format!(
                "ssh to {} failed: {}",
                self.destination,
                stderr.trim()
            ))),
            Some(code) => Err(RigError::Execution { code, stderr }),
            None => Err(RigError::Transport(format!(
                "ssh to {} terminated by signal",
                self.destination
            ))),
        }
    }
}

impl Transport for SshTransport {
    fn run(&self, command: &str) -> RigResult<(String, String)> {
        tracing::debug!(host = %self.destination, command, "ssh run");
        let output = self
            .ssh_command()
            .arg(command)
            .output()
            .map_err(|e| RigError::Transport(format!("failed to spawn ssh: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        self.classify_exit(output.status, stdout, stderr)
    }

    fn spawn(
        &self,
        command: &str,
        startup_delay: Duration,
    ) -> RigResult<(u32, Box<dyn ProcessHandle>)> {
        tracing::debug!(host = %self.destination, command, "ssh spawn");
        let mut cmd = self.ssh_command();
        cmd.arg(background_command(command, startup_delay));
        spawn_with_pid_echo(cmd, startup_delay)
    }

    fn fetch(&self, remote: &Path, destination: &Path) -> RigResult<()> {
        tracing::debug!(
            host = %self.destination,
            remote = %remote.display(),
            destination = %destination.display(),
            "scp fetch"
        );
        let mut cmd = Command::new("scp");
        cmd.arg("-o").arg("BatchMode=yes");
        cmd.arg("-o").arg("StrictHostKeyChecking=no");
        if self.port != 22 {
            cmd.arg("-P").arg(self.port.to_string());
        }
        if let Some(ref key) = self.identity_file {
            cmd.arg("-i").arg(key);
        }
        cmd.arg(format!("{}:{}", self.destination, remote.display()));
        cmd.arg(destination);

        let output = cmd
            .output()
            .map_err(|e| RigError::Transport(format!("failed to spawn scp: {e}")))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(RigError::Execution {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }

    fn endpoint(&self) -> &str {
        &self.destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_command_default_port_omits_flag() {
        let transport = SshTransport::new("odroid@10.0.0.5");
        let cmd = transport.ssh_command();
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy()).collect();
        assert!(args.contains(&"BatchMode=yes".into()));
        assert!(!args.contains(&"-p".into()));
        assert_eq!(args.last().unwrap(), "odroid@10.0.0.5");
    }

    #[test]
    fn test_ssh_command_custom_port_and_key() {
        let transport = SshTransport::new("host.lab")
            .with_port(2222)
            .with_identity_file("/home/lab/.ssh/rig_ed25519");
        let cmd = transport.ssh_command();
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy()).collect();
        let p = args.iter().position(|a| a == "-p").unwrap();
        assert_eq!(args[p + 1], "2222");
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], "/home/lab/.ssh/rig_ed25519");
    }

    #[test]
    fn test_endpoint_reports_destination() {
        let transport = SshTransport::new("sampler-1");
        assert_eq!(transport.endpoint(), "sampler-1");
    }

    mod classify {
        use super::*;
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;

        // Raw wait status: exit code n is n << 8, a bare signal number is
        // death by that signal
        fn exited(code: i32) -> ExitStatus {
            ExitStatus::from_raw(code << 8)
        }

        fn transport() -> SshTransport {
            SshTransport::new("odroid@10.0.0.5")
        }

        #[test]
        fn test_zero_exit_passes_streams_through() {
            let (out, err) = transport()
                .classify_exit(exited(0), "4\n".into(), "warn\n".into())
                .unwrap();
            assert_eq!(out, "4\n");
            assert_eq!(err, "warn\n");
        }

        #[test]
        fn test_255_is_the_transport_failure_code() {
            let err = transport()
                .classify_exit(exited(255), String::new(), "Connection refused\n".into())
                .unwrap_err();
            match err {
                RigError::Transport(msg) => {
                    assert!(msg.contains("odroid@10.0.0.5"));
                    assert!(msg.contains("Connection refused"));
                }
                other => panic!("expected Transport, got {other:?}"),
            }
        }

        #[test]
        fn test_other_nonzero_exit_belongs_to_the_remote_command() {
            let err = transport()
                .classify_exit(exited(127), String::new(), "dstat: not found\n".into())
                .unwrap_err();
            match err {
                RigError::Execution { code, stderr } => {
                    assert_eq!(code, 127);
                    assert_eq!(stderr, "dstat: not found\n");
                }
                other => panic!("expected Execution, got {other:?}"),
            }
        }

        #[test]
        fn test_death_by_signal_is_a_transport_failure() {
            // SIGKILL
            let err = transport()
                .classify_exit(ExitStatus::from_raw(9), String::new(), String::new())
                .unwrap_err();
            assert!(matches!(err, RigError::Transport(_)));
        }
    }
}
