// Copyright 2026 Oxide Computer Company

//! VCS names, binary resolution and repository detection.

use crate::{OpenError, VcsEnvError};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::{fmt, io};

/// Reads a VCS binary path from an environment variable, falling back
/// to `default` if the variable is unset or empty.
///
/// The value is trimmed of leading and trailing whitespace.
///
/// Returns an error if the variable is set but is not valid UTF-8.
fn read_vcs_env(
    var: &'static str,
    default: &str,
) -> Result<String, VcsEnvError> {
    match std::env::var(var) {
        Ok(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(default.to_string())
            } else {
                Ok(trimmed.to_string())
            }
        }
        Err(std::env::VarError::NotPresent) => Ok(default.to_string()),
        Err(std::env::VarError::NotUnicode(value)) => {
            Err(VcsEnvError::NonUtf8 { var, value })
        }
    }
}

/// The name of a version control system.
///
/// Used in error messages and for identifying which VCS is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum VcsName {
    /// Git version control.
    Git,
    /// Mercurial (hg) version control.
    Hg,
}

impl fmt::Display for VcsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsName::Git => write!(f, "git"),
            VcsName::Hg => write!(f, "hg"),
        }
    }
}

impl VcsName {
    /// The environment variable that overrides the binary path.
    pub fn env_var(self) -> &'static str {
        match self {
            VcsName::Git => "GIT",
            VcsName::Hg => "HG",
        }
    }

    /// The binary path used when neither an option nor the environment
    /// names one.
    pub fn default_binary(self) -> &'static str {
        match self {
            VcsName::Git => "/usr/bin/git",
            VcsName::Hg => "/usr/bin/hg",
        }
    }

    /// The default metadata directory, relative to the repository root.
    pub fn default_config_dir(self) -> &'static str {
        match self {
            VcsName::Git => ".git",
            VcsName::Hg => ".hg",
        }
    }

    /// The name of the config file inside the metadata directory.
    pub fn config_file_name(self) -> &'static str {
        match self {
            VcsName::Git => "config",
            VcsName::Hg => "hgrc",
        }
    }

    /// Returns the path whose existence marks a repository of this kind.
    ///
    /// For git this is `HEAD` inside the metadata directory; for hg it is
    /// the metadata directory itself.
    pub fn marker(self, config_dir: &Utf8Path) -> Utf8PathBuf {
        match self {
            VcsName::Git => config_dir.join("HEAD"),
            VcsName::Hg => config_dir.to_owned(),
        }
    }

    /// Resolves the binary to run.
    ///
    /// Uses `explicit` if it is non-empty, then the environment variable
    /// from [`env_var`](Self::env_var), then
    /// [`default_binary`](Self::default_binary).
    pub fn resolve_binary(
        self,
        explicit: Option<&str>,
    ) -> Result<String, VcsEnvError> {
        match explicit.map(str::trim) {
            Some(binary) if !binary.is_empty() => Ok(binary.to_owned()),
            _ => read_vcs_env(self.env_var(), self.default_binary()),
        }
    }

    /// Detects which VCS manages `repo_root`.
    ///
    /// Detection order:
    /// 1. If `.hg` exists, returns hg.
    /// 2. If `.git/HEAD` exists, returns git.
    /// 3. Otherwise, returns [`OpenError::NotARepository`] naming the git
    ///    marker.
    pub fn detect(repo_root: &Utf8Path) -> Result<Self, OpenError> {
        check_root(VcsName::Git, repo_root)?;
        for vcs_name in [VcsName::Hg, VcsName::Git] {
            let marker =
                vcs_name.marker(&repo_root.join(vcs_name.default_config_dir()));
            if exists(&marker)? {
                return Ok(vcs_name);
            }
        }
        Err(OpenError::NotARepository {
            vcs_name: VcsName::Git,
            repo_root: repo_root.to_owned(),
            marker: VcsName::Git.marker(&repo_root.join(".git")),
        })
    }

    /// Checks that `repo_root` is a repository of this kind, with metadata
    /// in `config_dir` (relative to `repo_root`).
    ///
    /// Performs no filesystem mutation.
    pub(crate) fn check_repository(
        self,
        repo_root: &Utf8Path,
        config_dir: &Utf8Path,
    ) -> Result<(), OpenError> {
        check_root(self, repo_root)?;
        let marker = self.marker(&repo_root.join(config_dir));
        if exists(&marker)? {
            Ok(())
        } else {
            Err(OpenError::NotARepository {
                vcs_name: self,
                repo_root: repo_root.to_owned(),
                marker,
            })
        }
    }
}

fn check_root(vcs_name: VcsName, repo_root: &Utf8Path) -> Result<(), OpenError> {
    // Use metadata() to distinguish "not a directory" from I/O
    // errors (e.g., permission denied).
    match fs::metadata(repo_root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(OpenError::NotADirectory {
            vcs_name,
            repo_root: repo_root.to_owned(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(OpenError::PathNotFound {
                vcs_name,
                repo_root: repo_root.to_owned(),
            })
        }
        Err(err) => {
            Err(OpenError::Io { path: repo_root.to_owned(), source: err })
        }
    }
}

fn exists(path: &Utf8Path) -> Result<bool, OpenError> {
    path.try_exists()
        .map_err(|source| OpenError::Io { path: path.to_owned(), source })
}
