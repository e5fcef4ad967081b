// Copyright 2026 Oxide Computer Company

//! Error types for running VCS commands and rewriting config files.

use crate::VcsName;
use camino::Utf8PathBuf;
use repo_shell::{
    ConfigParseError, ConfigValueError, CredentialUrlError, LogParseError,
};
use std::{ffi::OsString, io, num::ParseIntError, time::Duration};
use thiserror::Error;

// ---- Configuration errors ----

/// An error from reading a VCS binary path from the environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VcsEnvError {
    /// The environment variable is set but is not valid UTF-8.
    #[error(
        "${var} environment variable is not valid \
         UTF-8: {value:?}"
    )]
    NonUtf8 {
        /// The environment variable name.
        var: &'static str,
        /// The non-UTF-8 value.
        value: OsString,
    },
}

/// An error from building [`RepositoryOptions`](crate::RepositoryOptions)
/// out of string pairs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OptionsError {
    /// The `timeout_secs` option is not a whole number of seconds.
    #[error("invalid timeout_secs option {value:?}")]
    InvalidTimeout {
        /// The value that was provided.
        value: String,
        /// The underlying parse error.
        #[source]
        error: ParseIntError,
    },
}

// ---- Command errors ----

/// An error that occurs while running a VCS command.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CommandError {
    /// The working directory does not exist or is not a directory.
    #[error("cannot run {vcs_name} in {dir}: not a directory")]
    InvalidDirectory {
        /// The name of the VCS.
        vcs_name: VcsName,
        /// The working directory that was requested.
        dir: Utf8PathBuf,
    },

    /// Failed to spawn the VCS process.
    #[error("failed to run {vcs_name} at {binary_path:?} in {repo_root}")]
    SpawnFailed {
        /// The name of the VCS.
        vcs_name: VcsName,
        /// The path to the VCS executable.
        binary_path: String,
        /// The working directory where the command was run.
        repo_root: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The command exited unsuccessfully.
    #[error("command `{command}` failed ({exit_status}): {}", output_summary(.stdout, .stderr))]
    Failed {
        /// The name of the VCS.
        vcs_name: VcsName,
        /// The command line, with credentials stripped.
        command: String,
        /// A human-readable description of the exit status (e.g.,
        /// "exit status: 128" or "signal: 9").
        exit_status: String,
        /// The exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// The trimmed stdout output.
        stdout: String,
        /// The trimmed stderr output.
        stderr: String,
    },

    /// The command did not finish within the configured timeout and was
    /// killed.
    #[error("command `{command}` timed out after {timeout:?}")]
    TimedOut {
        /// The command line, with credentials stripped.
        command: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Waiting for the process or reading its output failed.
    #[error("failed to wait for `{command}`")]
    Wait {
        /// The command line, with credentials stripped.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl CommandError {
    /// Returns the exit code if this is a [`CommandError::Failed`] error.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

fn output_summary(stdout: &str, stderr: &str) -> String {
    match (stdout.is_empty(), stderr.is_empty()) {
        (_, false) => stderr.to_owned(),
        (false, true) => stdout.to_owned(),
        (true, true) => "(no output)".to_owned(),
    }
}

// ---- Repository errors ----

/// An error that occurs while opening, creating or cloning a repository.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OpenError {
    /// The provided repository root does not exist.
    #[error("{repo_root} does not exist (expected a {vcs_name} repository)")]
    PathNotFound {
        /// The name of the VCS.
        vcs_name: VcsName,
        /// The path that was provided.
        repo_root: Utf8PathBuf,
    },

    /// The provided repository root is not a directory.
    #[error(
        "{repo_root} is not a directory (expected a {vcs_name} repository)"
    )]
    NotADirectory {
        /// The name of the VCS.
        vcs_name: VcsName,
        /// The path that was provided.
        repo_root: Utf8PathBuf,
    },

    /// An I/O error occurred while probing the repository root.
    #[error("I/O error while checking for a repository at {path}")]
    Io {
        /// The path being checked when the error occurred.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The repository marker was not found.
    #[error("{repo_root} is not a valid {vcs_name} repository ({marker} not found)")]
    NotARepository {
        /// The name of the VCS.
        vcs_name: VcsName,
        /// The repository root that was checked.
        repo_root: Utf8PathBuf,
        /// The marker path that was expected to exist.
        marker: Utf8PathBuf,
    },

    /// A VCS environment variable is not valid UTF-8.
    #[error(transparent)]
    Env(#[from] VcsEnvError),

    /// Running `init` or `clone` failed.
    #[error("failed to initialize the repository")]
    Command(#[from] CommandError),

    /// Reading the config, or injecting the credentials from the options
    /// into it, failed.
    #[error("failed to prepare the repository config")]
    Config(#[from] ConfigError),
}

/// An error that occurs while reading or rewriting a repository's config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}")]
    Read {
        /// The config file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// The config file could not be parsed.
    #[error("failed to parse config file {path}")]
    Parse {
        /// The config file path.
        path: Utf8PathBuf,
        /// Details about the parsing error.
        #[source]
        error: ConfigParseError,
    },

    /// The config file could not be written. The previous contents are
    /// left in place.
    #[error("failed to write config file {path}")]
    Write {
        /// The config file path.
        path: Utf8PathBuf,
        /// The underlying write error.
        #[source]
        error: AtomicWriteError,
    },

    /// A value cannot be stored in the config file as given.
    #[error("cannot write value to config file {path}")]
    Value {
        /// The config file path.
        path: Utf8PathBuf,
        /// Which value was rejected and why.
        #[source]
        error: ConfigValueError,
    },

    /// The `config` subcommand failed.
    #[error("config command failed")]
    Command(#[from] CommandError),

    /// Credentials could not be embedded into the remote URL.
    #[error("cannot embed credentials into the remote URL")]
    Url(#[from] CredentialUrlError),

    /// No remote URL is configured, so there is nothing to attach
    /// credentials to.
    #[error("no remote URL configured for {repo_root}")]
    NoRemoteUrl {
        /// The repository root.
        repo_root: Utf8PathBuf,
    },
}

/// An error that occurs while querying and parsing log output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LogError {
    /// The log command failed.
    #[error("log command failed")]
    Command(#[from] CommandError),

    /// The log output did not have the expected format.
    #[error("malformed log output")]
    Malformed(#[from] LogParseError),
}

/// An error that occurred during an atomic file write.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AtomicWriteError {
    /// Writing contents to the temporary file failed.
    #[error("writing file contents failed")]
    Write(#[source] io::Error),

    /// The atomic write infrastructure failed (e.g., creating the
    /// temporary file, or renaming it into place).
    #[error("atomic create or rename failed")]
    Rename(#[source] io::Error),
}
