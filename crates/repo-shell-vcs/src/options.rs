// Copyright 2026 Oxide Computer Company

//! Options for opening a repository.

use crate::OptionsError;
use camino::{Utf8Path, Utf8PathBuf};
use repo_shell::{RemoteCredential, RemotePrefix};
use std::{fmt, time::Duration};

/// Options for opening, creating or cloning a repository.
///
/// All options are optional. A repository opened with a non-empty login or
/// password has those credentials injected into its config file until
/// [`clear_credentials`](crate::GitRepository::clear_credentials) is called
/// or the repository is dropped.
///
/// The `Debug` implementation does not print the password.
///
/// # Examples
///
/// ```
/// use repo_shell_vcs::RepositoryOptions;
/// use std::time::Duration;
///
/// let options = RepositoryOptions::new()
///     .with_executable("/usr/local/bin/git")
///     .with_login("deploy-bot")
///     .with_password("s3cret")
///     .with_remote_url("https://example.com/team/project.git")
///     .with_timeout(Duration::from_secs(60));
/// assert_eq!(options.login(), "deploy-bot");
/// ```
#[derive(Clone, Default)]
pub struct RepositoryOptions {
    executable: Option<String>,
    login: String,
    password: String,
    remote_url: Option<String>,
    config_dir: Option<Utf8PathBuf>,
    timeout: Option<Duration>,
}

impl RepositoryOptions {
    /// Creates options with every value unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds options from string key/value pairs.
    ///
    /// Recognized keys are `executable`, `login`, `password`, `repository`
    /// (the remote URL), `config_dir` and `timeout_secs`. Unknown keys are
    /// ignored, and empty values leave the option unset. Keys and values
    /// are trimmed, except the password, which is taken as given.
    ///
    /// ```
    /// use repo_shell_vcs::RepositoryOptions;
    ///
    /// let options = RepositoryOptions::from_pairs([
    ///     ("login", "alice"),
    ///     ("repository", "hg.example.com/project"),
    ///     ("color", "always"),
    /// ])
    /// .unwrap();
    /// assert_eq!(options.remote_url(), Some("hg.example.com/project"));
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref().trim();
            if key == "password" {
                options.password = value.as_ref().to_owned();
                continue;
            }
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            match key {
                "executable" => options.executable = Some(value.to_owned()),
                "login" => options.login = value.to_owned(),
                "repository" => options.remote_url = Some(value.to_owned()),
                "config_dir" => options.config_dir = Some(value.into()),
                "timeout_secs" => {
                    let secs = value.parse().map_err(|error| {
                        OptionsError::InvalidTimeout {
                            value: value.to_owned(),
                            error,
                        }
                    })?;
                    options.timeout = Some(Duration::from_secs(secs));
                }
                _ => {}
            }
        }
        Ok(options)
    }

    /// Sets the path to the VCS executable.
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    /// Sets the login to inject.
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = login.into();
        self
    }

    /// Sets the password to inject.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Sets the remote repository URL.
    pub fn with_remote_url(mut self, remote_url: impl Into<String>) -> Self {
        self.remote_url = Some(remote_url.into());
        self
    }

    /// Sets the metadata directory, relative to the repository root.
    pub fn with_config_dir(mut self, config_dir: impl Into<Utf8PathBuf>) -> Self {
        self.config_dir = Some(config_dir.into());
        self
    }

    /// Sets a timeout after which VCS commands are killed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the executable option, if set.
    pub fn executable(&self) -> Option<&str> {
        self.executable.as_deref()
    }

    /// Returns the login, or an empty string.
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Returns the password, or an empty string.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns the remote URL, if set.
    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url.as_deref()
    }

    /// Returns the metadata directory option, if set.
    pub fn config_dir(&self) -> Option<&Utf8Path> {
        self.config_dir.as_deref()
    }

    /// Returns the command timeout, if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the credential to inject under `prefix`, or `None` if both
    /// the login and password are empty.
    pub(crate) fn credential(
        &self,
        prefix: RemotePrefix,
    ) -> Option<RemoteCredential> {
        let credential =
            RemoteCredential::new(prefix, &self.login, &self.password);
        (!credential.is_empty()).then_some(credential)
    }
}

impl fmt::Debug for RepositoryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryOptions")
            .field("executable", &self.executable)
            .field("login", &self.login)
            .field(
                "password",
                &if self.password.is_empty() { "" } else { "<redacted>" },
            )
            .field(
                "remote_url",
                &self.remote_url.as_deref().map(repo_shell::strip_credentials),
            )
            .field("config_dir", &self.config_dir)
            .field("timeout", &self.timeout)
            .finish()
    }
}
