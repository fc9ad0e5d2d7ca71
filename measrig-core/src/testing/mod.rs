//! Scripted transport fakes for tests
//!
//! [`ScriptedTransport`] implements [`Transport`] without ever touching a
//! network or a shell: every call is recorded, synchronous responses are
//! scripted in FIFO order, and spawned "processes" are shared state the
//! test can terminate and pre-load with output at will. This is what makes
//! the contract tests assertable: zero-round-trip guarantees, exact stop
//! sequences, command contents.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{RigError, RigResult};
use crate::transport::{ProcessHandle, Transport};

/// One recorded transport interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// Synchronous execution of a command
    Run(String),
    /// Background spawn of a command (as handed to the transport, before
    /// the background/pid-echo wrapping a real binding would apply)
    Spawn(String),
    /// Artifact retrieval
    Fetch {
        /// Remote source path
        remote: PathBuf,
        /// Local destination path
        destination: PathBuf,
    },
}

/// Scripted response for a `run` call
enum RunResponse {
    Ok(String, String),
    Err(RigError),
}

#[derive(Default)]
struct FakeProcess {
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    drain_count: usize,
}

#[derive(Default)]
struct Inner {
    calls: Vec<TransportCall>,
    run_responses: VecDeque<RunResponse>,
    processes: HashMap<u32, Arc<Mutex<FakeProcess>>>,
    next_pid: u32,
}

/// Recording fake transport with scripted responses
///
/// Cloning shares the underlying state, so a test can keep a clone for
/// assertions after moving the transport into a device.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedTransport {
    /// Creates an empty scripted transport.
    ///
    /// Unscripted `run` calls succeed with empty output; spawns return
    /// sequential pids starting at 1000 and stay "running" until the test
    /// terminates them.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_pid: 1000,
                ..Inner::default()
            })),
        }
    }

    /// Returns every call recorded so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<TransportCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Scripts the next `run` call to succeed with `stdout`
    pub fn push_run_ok(&self, stdout: &str) {
        self.inner
            .lock()
            .unwrap()
            .run_responses
            .push_back(RunResponse::Ok(stdout.to_string(), String::new()));
    }

    /// Scripts the next `run` call to fail with a remote non-zero exit
    pub fn push_run_execution_error(&self, code: i32, stderr: &str) {
        self.inner
            .lock()
            .unwrap()
            .run_responses
            .push_back(RunResponse::Err(RigError::Execution {
                code,
                stderr: stderr.to_string(),
            }));
    }

    /// Scripts the next `run` call to fail at the transport level
    pub fn push_run_transport_error(&self, message: &str) {
        self.inner
            .lock()
            .unwrap()
            .run_responses
            .push_back(RunResponse::Err(RigError::Transport(message.to_string())));
    }

    fn process(&self, pid: u32) -> Arc<Mutex<FakeProcess>> {
        self.inner
            .lock()
            .unwrap()
            .processes
            .get(&pid)
            .cloned()
            .unwrap_or_else(|| panic!("no scripted process with pid {pid}"))
    }

    /// Marks the spawned process `pid` as terminated with `code`
    pub fn terminate(&self, pid: u32, code: i32) {
        self.process(pid).lock().unwrap().exit_code = Some(code);
    }

    /// Terminates `pid` and pre-loads the output its handle will drain
    pub fn terminate_with_output(&self, pid: u32, code: i32, stdout: &str, stderr: &str) {
        let process = self.process(pid);
        let mut process = process.lock().unwrap();
        process.exit_code = Some(code);
        process.stdout = stdout.to_string();
        process.stderr = stderr.to_string();
    }

    /// How many times the handle for `pid` has been drained
    #[must_use]
    pub fn drain_count(&self, pid: u32) -> usize {
        self.process(pid).lock().unwrap().drain_count
    }
}

impl Transport for ScriptedTransport {
    fn run(&self, command: &str) -> RigResult<(String, String)> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(TransportCall::Run(command.to_string()));
        match inner.run_responses.pop_front() {
            Some(RunResponse::Ok(stdout, stderr)) => Ok((stdout, stderr)),
            Some(RunResponse::Err(err)) => Err(err),
            None => Ok((String::new(), String::new())),
        }
    }

    fn spawn(
        &self,
        command: &str,
        _startup_delay: Duration,
    ) -> RigResult<(u32, Box<dyn ProcessHandle>)> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(TransportCall::Spawn(command.to_string()));
        let pid = inner.next_pid;
        inner.next_pid += 1;
        let process = Arc::new(Mutex::new(FakeProcess::default()));
        inner.processes.insert(pid, Arc::clone(&process));
        Ok((pid, Box::new(ScriptedHandle { process })))
    }

    fn fetch(&self, remote: &Path, destination: &Path) -> RigResult<()> {
        self.inner.lock().unwrap().calls.push(TransportCall::Fetch {
            remote: remote.to_path_buf(),
            destination: destination.to_path_buf(),
        });
        Ok(())
    }

    fn endpoint(&self) -> &str {
        "scripted"
    }
}

/// Handle over one scripted background process
pub struct ScriptedHandle {
    process: Arc<Mutex<FakeProcess>>,
}

impl ProcessHandle for ScriptedHandle {
    fn poll(&mut self) -> RigResult<Option<i32>> {
        Ok(self.process.lock().unwrap().exit_code)
    }

    fn drain(&mut self) -> RigResult<(String, String)> {
        let mut process = self.process.lock().unwrap();
        process.drain_count += 1;
        Ok((process.stdout.clone(), process.stderr.clone()))
    }
}
