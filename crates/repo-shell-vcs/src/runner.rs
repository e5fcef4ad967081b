// Copyright 2026 Oxide Computer Company

//! Running VCS commands inside a repository.

use crate::{CommandError, VcsName};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use repo_shell::strip_credentials;
use std::{
    borrow::Cow,
    io::{self, Read},
    process::{Child, Command, Output, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The captured result of a successful command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, trimmed of leading and trailing whitespace.
    pub stdout: String,
    /// Standard error, trimmed of leading and trailing whitespace.
    pub stderr: String,
    /// The exit code. This is `Some(1)` for a `status` query that hit the
    /// exit-code exemption.
    pub exit_code: Option<i32>,
}

/// Runs a VCS binary with its working directory set to a repository.
///
/// Commands are run synchronously, one at a time. Arguments are passed to
/// the binary directly, without a shell.
///
/// In debug mode, the command line and its output are logged at `info`
/// level instead of `debug`.
#[derive(Clone, Debug)]
pub struct CommandRunner {
    vcs_name: VcsName,
    binary: String,
    repo_root: Utf8PathBuf,
    debug: bool,
    timeout: Option<Duration>,
}

impl CommandRunner {
    /// Creates a runner for `binary` in `repo_root`, with debug mode off and
    /// no timeout.
    pub fn new(
        vcs_name: VcsName,
        binary: impl Into<String>,
        repo_root: impl Into<Utf8PathBuf>,
    ) -> Self {
        CommandRunner {
            vcs_name,
            binary: binary.into(),
            repo_root: repo_root.into(),
            debug: false,
            timeout: None,
        }
    }

    /// Enables or disables debug mode.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets a timeout after which the process is killed. `None` waits
    /// indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the name of the VCS.
    pub fn vcs_name(&self) -> VcsName {
        self.vcs_name
    }

    /// Returns the path to the VCS binary.
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Returns the working directory.
    pub fn repo_root(&self) -> &Utf8Path {
        &self.repo_root
    }

    /// Returns whether debug mode is on.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Returns the timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs the binary with `args`.
    ///
    /// A non-zero exit is an error, except for exit code 1 from a `status`
    /// query (see [`exit_code_is_success`]).
    pub fn run<I, S>(&self, args: I) -> Result<CommandOutput, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run_inner(args, false)
    }

    /// Like [`run`](Self::run), but never logs stdout. Used for commands
    /// whose output may contain credentials.
    pub(crate) fn run_redacted<I, S>(
        &self,
        args: I,
    ) -> Result<CommandOutput, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run_inner(args, true)
    }

    /// Formats `args` as a command line for logs and error messages, with
    /// credentials stripped from URL arguments.
    pub fn command_line<S: AsRef<str>>(&self, args: &[S]) -> String {
        std::iter::once(Cow::Borrowed(self.binary.as_str()))
            .chain(args.iter().map(|arg| display_arg(arg.as_ref())))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn run_inner<I, S>(
        &self,
        args: I,
        redact_output: bool,
    ) -> Result<CommandOutput, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> =
            args.into_iter().map(|arg| arg.as_ref().to_owned()).collect();

        match fs::metadata(&self.repo_root) {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                return Err(CommandError::InvalidDirectory {
                    vcs_name: self.vcs_name,
                    dir: self.repo_root.clone(),
                });
            }
        }

        let command = self.command_line(&args);
        if self.debug {
            info!(dir = %self.repo_root, %command, "running command");
        } else {
            debug!(dir = %self.repo_root, %command, "running command");
        }

        let child = Command::new(&self.binary)
            .current_dir(&self.repo_root)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::SpawnFailed {
                vcs_name: self.vcs_name,
                binary_path: self.binary.clone(),
                repo_root: self.repo_root.clone(),
                source,
            })?;

        let output = match self.timeout {
            Some(timeout) => wait_with_timeout(child, timeout, &command)?,
            None => child.wait_with_output().map_err(|source| {
                CommandError::Wait { command: command.clone(), source }
            })?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        let exit_code = output.status.code();

        let logged: &str = if redact_output { "<redacted>" } else { &stdout };
        if self.debug {
            info!(%command, ?exit_code, output = logged, "command finished");
        } else {
            debug!(%command, ?exit_code, output = logged, "command finished");
        }

        if exit_code_is_success(&args, exit_code) {
            Ok(CommandOutput { stdout, stderr, exit_code })
        } else {
            Err(CommandError::Failed {
                vcs_name: self.vcs_name,
                command,
                exit_status: output.status.to_string(),
                exit_code,
                stdout: if redact_output { String::new() } else { stdout },
                stderr,
            })
        }
    }
}

/// Returns true if a command with `args` that exited with `exit_code`
/// succeeded.
///
/// Exit code 0 is success. Exit code 1 from a `status` query is also
/// success: git 1.5 returns 1 from `git status` when there is nothing to
/// commit. Anything else, including termination by a signal, is failure.
///
/// ```
/// use repo_shell_vcs::exit_code_is_success;
///
/// assert!(exit_code_is_success(&["status"], Some(1)));
/// assert!(!exit_code_is_success(&["pull"], Some(1)));
/// assert!(!exit_code_is_success(&["status"], None));
/// ```
pub fn exit_code_is_success<S: AsRef<str>>(
    args: &[S],
    exit_code: Option<i32>,
) -> bool {
    match exit_code {
        Some(0) => true,
        Some(1) => args.first().is_some_and(|arg| arg.as_ref() == "status"),
        _ => false,
    }
}

fn display_arg(arg: &str) -> Cow<'_, str> {
    if arg.contains("://") && arg.contains('@') {
        Cow::Owned(strip_credentials(arg))
    } else {
        Cow::Borrowed(arg)
    }
}

/// Waits for `child`, killing it if `timeout` elapses first.
///
/// The pipes are drained on helper threads so that a child writing more
/// than a pipe buffer's worth of output does not block. The deadline also
/// covers draining: a process the child left behind holding the pipes
/// open (an ssh or credential helper, say) cannot hold the caller past the
/// timeout. Its drain thread is left to finish on its own.
fn wait_with_timeout(
    mut child: Child,
    timeout: Duration,
    command: &str,
) -> Result<Output, CommandError> {
    let stdout = spawn_drain(child.stdout.take());
    let stderr = spawn_drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let timed_out = || CommandError::TimedOut {
        command: command.to_owned(),
        timeout,
    };
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                // The process may exit between try_wait and kill; either
                // way it is reaped below.
                let _ = child.kill();
                let _ = child.wait();
                return Err(timed_out());
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                return Err(CommandError::Wait {
                    command: command.to_owned(),
                    source,
                });
            }
        }
    };

    let collect = |drained: Receiver<io::Result<Vec<u8>>>| {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match drained.recv_timeout(remaining) {
            Ok(result) => result.map_err(|source| CommandError::Wait {
                command: command.to_owned(),
                source,
            }),
            Err(RecvTimeoutError::Timeout) => Err(timed_out()),
            // The drain thread panicked.
            Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
        }
    };
    let stdout = collect(stdout)?;
    let stderr = collect(stderr)?;
    Ok(Output { status, stdout, stderr })
}

/// Reads `pipe` to the end on a new thread.
fn spawn_drain(
    pipe: Option<impl Read + Send + 'static>,
) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::sync_channel(1);
    thread::spawn(move || {
        // The receiver is gone if the caller stopped waiting.
        let _ = tx.send(drain(pipe));
    });
    rx
}

fn drain(pipe: Option<impl Read>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(buf)
}
