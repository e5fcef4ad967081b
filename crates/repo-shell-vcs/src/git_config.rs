// Copyright 2026 Oxide Computer Company

//! Reading and rewriting `.git/config` through `git config`.

use crate::{
    CommandRunner, ConfigError, CredentialChange,
    CredentialStore,
    config_file::{read_document, write_document},
    credential::ChangeKind,
};
use camino::{Utf8Path, Utf8PathBuf};
use repo_shell::{RemoteCredential, embed_credentials, strip_credentials};
use std::collections::HashMap;
use tracing::debug;

/// The key holding the committer name.
pub const USER_NAME: &str = "user.name";

/// The key holding the committer email.
pub const USER_EMAIL: &str = "user.email";

/// The key holding the URL of the `origin` remote.
pub const ORIGIN_URL_KEY: &str = "remote.origin.url";

/// The section `remote.origin.*` keys live in.
pub(crate) const ORIGIN_SECTION: &str = "remote \"origin\"";

/// `git config --get` exits with 1 when the key is not set.
const EXIT_KEY_NOT_FOUND: i32 = 1;

/// `git config --unset` exits with 5 when the key is not set.
const EXIT_NOTHING_TO_UNSET: i32 = 5;

/// A repository's git config.
///
/// Keys are read and written by running `git config`, so git's own quoting
/// and locking apply. Values read with [`get`](Self::get) are cached for the
/// lifetime of this instance; [`set`](Self::set) and [`unset`](Self::unset)
/// invalidate the cache.
///
/// Credentials are injected by embedding them in `remote.origin.url`.
#[derive(Clone, Debug)]
pub struct GitConfig {
    runner: CommandRunner,
    path: Utf8PathBuf,
    remote_url: Option<String>,
    cache: HashMap<String, Option<String>>,
}

impl GitConfig {
    /// Creates a config backed by `runner`'s repository.
    ///
    /// `path` is the config file, used for structural cleanup after keys
    /// are unset. `remote_url` is the URL credentials are embedded into;
    /// if it is `None`, the current `remote.origin.url` is used.
    pub fn new(
        runner: CommandRunner,
        path: impl Into<Utf8PathBuf>,
        remote_url: Option<String>,
    ) -> Self {
        GitConfig {
            runner,
            path: path.into(),
            remote_url,
            cache: HashMap::new(),
        }
    }

    /// Returns the path to the config file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the value of `key`, or `None` if it is not set.
    pub fn get(&mut self, key: &str) -> Result<Option<String>, ConfigError> {
        if let Some(value) = self.cache.get(key) {
            return Ok(value.clone());
        }
        let value = match self.runner.run_redacted(["config", "--get", key]) {
            Ok(output) => Some(output.stdout),
            Err(error) if error.exit_code() == Some(EXIT_KEY_NOT_FOUND) => None,
            Err(error) => return Err(error.into()),
        };
        self.cache.insert(key.to_owned(), value.clone());
        Ok(value)
    }

    /// Sets `key` to `value` in the repository's local config.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.cache.remove(key);
        self.runner.run(["config", "--local", key, value])?;
        Ok(())
    }

    /// Removes `key` from the repository's local config, returning whether
    /// it was set.
    pub fn unset(&mut self, key: &str) -> Result<bool, ConfigError> {
        self.cache.remove(key);
        match self.runner.run(["config", "--local", "--unset", key]) {
            Ok(_) => Ok(true),
            Err(error) if error.exit_code() == Some(EXIT_NOTHING_TO_UNSET) => {
                Ok(false)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Returns the URL of the `origin` remote, if set.
    pub fn origin_url(&mut self) -> Result<Option<String>, ConfigError> {
        self.get(ORIGIN_URL_KEY)
    }

    /// Removes `remote.origin.url`, and the `[remote "origin"]` section if
    /// nothing else is left in it.
    pub fn remove_origin(&mut self) -> Result<(), ConfigError> {
        self.unset(ORIGIN_URL_KEY)?;

        let mut doc = read_document(&self.path)?;
        if doc.section(ORIGIN_SECTION).is_some_and(|s| s.is_empty()) {
            doc.remove_section(ORIGIN_SECTION);
            write_document(&self.path, &doc)?;
            debug!(path = %self.path, "removed empty origin section");
        }
        self.cache.clear();
        Ok(())
    }

    fn base_url(&mut self) -> Result<String, ConfigError> {
        if let Some(url) = self.remote_url.clone() {
            return Ok(url);
        }
        self.origin_url()?.ok_or_else(|| ConfigError::NoRemoteUrl {
            repo_root: self.runner.repo_root().to_owned(),
        })
    }
}

impl CredentialStore for GitConfig {
    /// Embeds `credential` in `remote.origin.url`.
    ///
    /// The credential's prefix is not used: git holds a single origin URL.
    /// An empty username or password keeps the one already in the origin
    /// URL, so a credential that matches on its non-empty fields changes
    /// nothing.
    fn set_credential(
        &mut self,
        credential: &RemoteCredential,
    ) -> Result<CredentialChange, ConfigError> {
        if credential.is_empty() {
            return Ok(CredentialChange::unchanged());
        }

        let previous = self.origin_url()?;
        let base = match (self.base_url()?, &previous) {
            // Empty fields keep the origin's existing credentials.
            (base, Some(origin))
                if strip_credentials(origin) == strip_credentials(&base) =>
            {
                origin.clone()
            }
            (base, _) => base,
        };
        let url = embed_credentials(
            &base,
            credential.username(),
            credential.password(),
        )?;
        if previous.as_deref() == Some(url.as_str()) {
            debug!(url = %strip_credentials(&url), "credential already present");
            return Ok(CredentialChange::unchanged());
        }

        self.set(ORIGIN_URL_KEY, &url)?;
        debug!(url = %strip_credentials(&url), "injected credential");
        Ok(CredentialChange(ChangeKind::OriginUrl { previous }))
    }

    fn revert_credential(
        &mut self,
        change: CredentialChange,
    ) -> Result<(), ConfigError> {
        match change.0 {
            ChangeKind::OriginUrl { previous: Some(previous) } => {
                self.set(ORIGIN_URL_KEY, &previous)?;
                debug!(
                    url = %strip_credentials(&previous),
                    "restored origin url"
                );
                Ok(())
            }
            ChangeKind::OriginUrl { previous: None } => self.remove_origin(),
            ChangeKind::Unchanged
            | ChangeKind::Overwrote { .. }
            | ChangeKind::Inserted { .. } => Ok(()),
        }
    }
}
