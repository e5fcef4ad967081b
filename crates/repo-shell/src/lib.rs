// Copyright 2026 Oxide Computer Company

//! Config documents, remote credentials and log records for wrapping the
//! `git` and `hg` command-line tools.
//!
//! This crate does not run any processes. It provides the pieces that the
//! command wrappers in
//! [`repo-shell-vcs`](https://crates.io/crates/repo-shell-vcs) build on:
//!
//! - [`ConfigDocument`], an ordered model of INI-style config files
//!   (`.hg/hgrc`, `.git/config`) that preserves comments and the bytes of
//!   unmodified lines.
//! - [`RemotePrefix`] and [`RemoteCredential`], which name the credentials
//!   that get injected into a repository's config for a given remote.
//! - [`CommitRecord`], parsed from `|`-separated log output.
//!
//! # Examples
//!
//! ```
//! use repo_shell::{ConfigDocument, RemotePrefix};
//!
//! let hgrc: ConfigDocument =
//!     "[paths]\ndefault = https://hg.example.com/project\n".parse().unwrap();
//!
//! // Credentials are keyed by the host of the default path.
//! let prefix = RemotePrefix::from_remote_url(
//!     hgrc.get("paths", "default").unwrap(),
//! )
//! .unwrap();
//! assert_eq!(prefix.as_str(), "hg.example.com");
//! assert_eq!(prefix.alias(), "hg_example_com");
//! ```

#![deny(missing_docs)]

mod commit;
mod config_document;
mod errors;
mod remote;

pub use commit::{
    CommitRecord, LOG_FIELD_COUNT, LOG_FIELD_SEPARATOR, Signature, parse_log,
};
pub use config_document::{ConfigDocument, Section};
pub use errors::{
    ConfigParseError, ConfigValueError, CredentialUrlError, LogParseError,
};
pub use remote::{
    RemoteCredential, RemotePrefix, embed_credentials, strip_credentials,
};
