// Copyright 2026 Oxide Computer Company

//! Thin wrappers around the `git` and `hg` command-line tools.
//!
//! [`GitRepository`] and [`HgRepository`] run the VCS binary inside a
//! working copy and parse the handful of outputs callers need: log lines,
//! branch and tag lists, modified files. Nothing is reimplemented; every
//! operation is a subprocess.
//!
//! The other half of the crate rewrites the config files that carry
//! credentials for a remote. Credentials given in [`RepositoryOptions`] are
//! injected when a repository is opened and removed again when it is
//! dropped (or on [`GitRepository::clear_credentials`]). A
//! [`CredentialGuard`] does the same for a shorter scope:
//!
//! ```no_run
//! use repo_shell_vcs::{CredentialGuard, GitRepository, RepositoryOptions};
//!
//! let options =
//!     RepositoryOptions::new().with_remote_url("https://example.com/team/app.git");
//! let mut repo = GitRepository::open("/srv/app", false, options)?;
//! let credential = repo.credential("deploy-bot", "s3cret")?;
//!
//! {
//!     let repo = CredentialGuard::acquire(&mut repo, &credential)?;
//!     repo.pull(&["--ff-only"])?;
//! }
//! // remote.origin.url no longer contains the password here.
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Injection is idempotent, and removal restores the file to what it was
//! before injection. For `.hg/hgrc`, lines the rewriter does not touch keep
//! their exact bytes.
//!
//! # Binaries
//!
//! The binary is taken from the `executable` option, then from the `$GIT` or
//! `$HG` environment variable, then defaults to `/usr/bin/git` or
//! `/usr/bin/hg`.
//!
//! # Logging
//!
//! Commands and config changes are logged through [`tracing`]. Passwords are
//! stripped from logged URLs, and the output of `git config --get` is never
//! logged.

#![deny(missing_docs)]

mod config_file;
mod credential;
mod errors;
mod git;
mod git_config;
mod hg;
mod hg_config;
mod options;
mod outputs;
mod runner;
mod vcs;

pub use credential::{CredentialChange, CredentialGuard, CredentialStore};
pub use errors::{
    AtomicWriteError, CommandError, ConfigError, LogError, OpenError,
    OptionsError, VcsEnvError,
};
pub use git::GitRepository;
pub use git_config::{GitConfig, ORIGIN_URL_KEY, USER_EMAIL, USER_NAME};
pub use hg::HgRepository;
pub use hg_config::{AUTH_SECTION, DEFAULT_PATH_KEY, HgConfig, PATHS_SECTION};
pub use options::RepositoryOptions;
pub use outputs::{ModifiedFiles, PullOutcome};
pub use runner::{CommandOutput, CommandRunner, exit_code_is_success};
pub use vcs::VcsName;
