// Copyright 2026 Oxide Computer Company

//! The git repository facade.

use crate::{
    CommandError, CommandOutput, CommandRunner, ConfigError, CredentialChange,
    CredentialStore, GitConfig, LogError, ModifiedFiles, ORIGIN_URL_KEY,
    OpenError, RepositoryOptions, VcsName,
    config_file::{read_document, write_document},
    git_config::ORIGIN_SECTION,
    outputs::{parse_git_branches, parse_git_current, parse_git_tags},
};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use repo_shell::{
    CommitRecord, RemoteCredential, RemotePrefix, embed_credentials, parse_log,
};
use tracing::{debug, warn};

/// The `--format` argument producing one [`CommitRecord`] line per commit.
const LOG_FORMAT: &str = "--format=format:%H|%T|%an|%ae|%ad|%cn|%ce|%cd|%s";

/// A git working copy.
///
/// If the [`RepositoryOptions`] it was opened with carry a login or
/// password, they are embedded in `remote.origin.url` when the repository
/// is opened and removed again by
/// [`clear_credentials`](Self::clear_credentials) or on drop.
#[derive(Debug)]
pub struct GitRepository {
    runner: CommandRunner,
    config: GitConfig,
    injected: Option<CredentialChange>,
}

impl GitRepository {
    /// Opens the git repository at `repo_root`.
    ///
    /// Fails with [`OpenError::NotARepository`] if `<config_dir>/HEAD` does
    /// not exist; nothing is written in that case.
    pub fn open(
        repo_root: impl Into<Utf8PathBuf>,
        debug: bool,
        options: RepositoryOptions,
    ) -> Result<Self, OpenError> {
        let repo_root = repo_root.into();
        let config_dir = config_dir(&options);
        VcsName::Git.check_repository(&repo_root, &config_dir)?;

        let binary = VcsName::Git.resolve_binary(options.executable())?;
        let runner = CommandRunner::new(VcsName::Git, binary, repo_root.clone())
            .with_debug(debug)
            .with_timeout(options.timeout());
        let config = GitConfig::new(
            runner.clone(),
            repo_root
                .join(&config_dir)
                .join(VcsName::Git.config_file_name()),
            options.remote_url().map(str::to_owned),
        );
        let mut repo = GitRepository { runner, config, injected: None };

        if !options.login().is_empty() || !options.password().is_empty() {
            let remote_url = match options.remote_url() {
                Some(url) => Some(url.to_owned()),
                None => repo.config.origin_url()?,
            };
            let prefix = RemotePrefix::compute(remote_url.as_deref(), &repo_root);
            if let Some(credential) = options.credential(prefix) {
                let change = repo.config.set_credential(&credential)?;
                repo.injected = Some(change);
            }
        }

        debug!(%repo_root, "opened git repository");
        Ok(repo)
    }

    /// Runs `git init` in `repo_root`, creating the directory if needed,
    /// and opens the result.
    pub fn create(
        repo_root: impl Into<Utf8PathBuf>,
        debug: bool,
        options: RepositoryOptions,
    ) -> Result<Self, OpenError> {
        let repo_root = repo_root.into();
        fs::create_dir_all(&repo_root).map_err(|source| OpenError::Io {
            path: repo_root.clone(),
            source,
        })?;
        bare_runner(&repo_root, debug, &options)?.run(["init"])?;
        Self::open(repo_root, debug, options)
    }

    /// Clones `url` into `repo_root` and opens the result.
    ///
    /// The clone runs in the parent of `repo_root`, which must exist. If the
    /// options carry credentials, they are used for the clone and then
    /// stored the same way [`open`](Self::open) stores them, so they are
    /// removed again on [`clear_credentials`](Self::clear_credentials).
    pub fn clone_url(
        url: &str,
        repo_root: impl Into<Utf8PathBuf>,
        debug: bool,
        options: RepositoryOptions,
    ) -> Result<Self, OpenError> {
        let repo_root = repo_root.into();
        let parent = match repo_root.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_owned(),
            _ => Utf8PathBuf::from("."),
        };
        let target = repo_root.file_name().unwrap_or(repo_root.as_str());

        let clone_source =
            if options.login().is_empty() && options.password().is_empty() {
                url.to_owned()
            } else {
                embed_credentials(url, options.login(), options.password())
                    .map_err(ConfigError::from)?
            };
        let cloned = bare_runner(&parent, debug, &options)?
            .run(["clone", clone_source.as_str(), target])
            .map_err(OpenError::from)
            .and_then(|_| {
                if clone_source != url {
                    // Put the plain URL back so that open() records the
                    // injection.
                    bare_runner(&repo_root, debug, &options)?
                        .run(["config", "--local", ORIGIN_URL_KEY, url])?;
                }
                Ok(())
            });
        if let Err(error) = cloned {
            if clone_source != url {
                let path = repo_root
                    .join(config_dir(&options))
                    .join(VcsName::Git.config_file_name());
                scrub_origin_url(&path, &clone_source, url);
            }
            return Err(error);
        }

        let options = if options.remote_url().is_some() {
            options
        } else {
            options.with_remote_url(url)
        };
        Self::open(repo_root, debug, options)
    }

    /// Returns the repository root.
    pub fn repo_root(&self) -> &Utf8Path {
        self.runner.repo_root()
    }

    /// Returns the runner used for commands in this repository.
    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// Returns the repository's config.
    pub fn config(&self) -> &GitConfig {
        &self.config
    }

    /// Returns the repository's config for modification.
    pub fn config_mut(&mut self) -> &mut GitConfig {
        &mut self.config
    }

    /// Returns the change made by credential injection at open time, if any.
    pub fn injected_credential(&self) -> Option<&CredentialChange> {
        self.injected.as_ref()
    }

    /// Builds a credential for this repository's remote.
    pub fn credential(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<RemoteCredential, ConfigError> {
        let remote_url = self.config.origin_url()?;
        let prefix = RemotePrefix::compute(remote_url.as_deref(), self.repo_root());
        Ok(RemoteCredential::new(prefix, username, password))
    }

    /// Removes the credentials injected at open time. Does nothing if none
    /// were injected.
    pub fn clear_credentials(&mut self) -> Result<(), ConfigError> {
        match self.injected.take() {
            Some(change) => self.config.revert_credential(change),
            None => Ok(()),
        }
    }

    /// Lists branches, passing `flags` (e.g. `-a`, `-r`) to `git branch`.
    pub fn branches<S: AsRef<str>>(
        &self,
        flags: &[S],
    ) -> Result<Vec<String>, CommandError> {
        let args = std::iter::once("branch")
            .chain(flags.iter().map(|flag| flag.as_ref()));
        Ok(parse_git_branches(&self.runner.run(args)?.stdout))
    }

    /// Returns the checked-out branch, or `None` in a repository without
    /// commits or with a detached HEAD.
    pub fn current_branch(&self) -> Result<Option<String>, CommandError> {
        Ok(parse_git_current(&self.runner.run(["branch"])?.stdout))
    }

    /// Returns true if a local branch named `name` exists.
    pub fn has_branch(&self, name: &str) -> Result<bool, CommandError> {
        let branches = self.branches::<&str>(&[])?;
        Ok(branches.iter().any(|branch| branch == name))
    }

    /// Lists tags.
    pub fn tags(&self) -> Result<Vec<String>, CommandError> {
        Ok(parse_git_tags(&self.runner.run(["tag"])?.stdout))
    }

    /// Returns the last `n` commits reachable from `HEAD`, newest first.
    pub fn commits(&self, n: usize) -> Result<Vec<CommitRecord>, LogError> {
        let n = n.to_string();
        self.log(["-n", n.as_str()])
    }

    /// Returns the commits on `source` that are not on `target`.
    pub fn difference_between_branches(
        &self,
        target: &str,
        source: &str,
    ) -> Result<Vec<CommitRecord>, LogError> {
        let range = format!("{target}..{source}");
        self.log([range.as_str()])
    }

    /// Force-checks out `rev`, discarding local changes.
    pub fn checkout(&self, rev: &str) -> Result<(), CommandError> {
        self.runner.run(["checkout", rev, "-f"])?;
        Ok(())
    }

    /// Checks out `rev`.
    pub fn update(&self, rev: &str) -> Result<(), CommandError> {
        self.runner.run(["checkout", rev])?;
        Ok(())
    }

    /// Runs `git pull` with `args`.
    pub fn pull<S: AsRef<str>>(
        &self,
        args: &[S],
    ) -> Result<CommandOutput, CommandError> {
        let args =
            std::iter::once("pull").chain(args.iter().map(|arg| arg.as_ref()));
        self.runner.run(args)
    }

    /// Returns the output of `git status`.
    pub fn status(&self) -> Result<String, CommandError> {
        Ok(self.runner.run(["status"])?.stdout)
    }

    /// Returns the hash of the most recent commit on any ref.
    pub fn latest_revision(&self) -> Result<String, CommandError> {
        Ok(self.runner.run(["rev-list", "--max-count=1", "--all"])?.stdout)
    }

    /// Lists tracked files with unstaged modifications.
    pub fn modified_files(&self) -> Result<ModifiedFiles, CommandError> {
        let output = self.runner.run(["ls-files", "-m"])?;
        Ok(ModifiedFiles::from_git(&output.stdout))
    }

    /// Resets the index and working tree to `HEAD`.
    pub fn reset_hard(&self) -> Result<(), CommandError> {
        self.runner.run(["reset", "--hard"])?;
        Ok(())
    }

    /// Runs an arbitrary git command. A leading `git` argument is ignored.
    pub fn run<S: AsRef<str>>(
        &self,
        args: &[S],
    ) -> Result<CommandOutput, CommandError> {
        let args = match args.split_first() {
            Some((first, rest)) if first.as_ref() == "git" => rest,
            _ => args,
        };
        self.runner.run(args)
    }

    fn log<'a>(
        &self,
        args: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<CommitRecord>, LogError> {
        let args = ["log", "--date=iso", LOG_FORMAT].into_iter().chain(args);
        let output = self.runner.run(args)?;
        Ok(parse_log(&output.stdout)?)
    }
}

impl CredentialStore for GitRepository {
    fn set_credential(
        &mut self,
        credential: &RemoteCredential,
    ) -> Result<CredentialChange, ConfigError> {
        self.config.set_credential(credential)
    }

    fn revert_credential(
        &mut self,
        change: CredentialChange,
    ) -> Result<(), ConfigError> {
        self.config.revert_credential(change)
    }
}

impl Drop for GitRepository {
    fn drop(&mut self) {
        if let Err(error) = self.clear_credentials() {
            warn!(
                repo_root = %self.runner.repo_root(),
                %error,
                "failed to remove injected credentials"
            );
        }
    }
}

fn config_dir(options: &RepositoryOptions) -> Utf8PathBuf {
    options.config_dir().map_or_else(
        || Utf8PathBuf::from(VcsName::Git.default_config_dir()),
        Utf8Path::to_owned,
    )
}

/// Replaces `remote.origin.url` in the config file at `path` with `url` if
/// it is still `credentialed`, without running git.
///
/// Failures are logged, not returned: this runs while another error is
/// being reported.
fn scrub_origin_url(path: &Utf8Path, credentialed: &str, url: &str) {
    let result = read_document(path).and_then(|mut doc| {
        if doc.get(ORIGIN_SECTION, "url") != Some(credentialed) {
            return Ok(false);
        }
        if doc.set(ORIGIN_SECTION, "url", url.trim()).is_err() {
            doc.remove(ORIGIN_SECTION, "url");
        }
        write_document(path, &doc)?;
        Ok(true)
    });
    match result {
        Ok(true) => debug!(%path, "removed clone credentials from origin url"),
        Ok(false) => {}
        Err(error) => warn!(
            %path,
            %error,
            "failed to remove clone credentials from origin url"
        ),
    }
}

/// A runner for commands that precede [`GitRepository::open`].
fn bare_runner(
    dir: &Utf8Path,
    debug: bool,
    options: &RepositoryOptions,
) -> Result<CommandRunner, OpenError> {
    let binary = VcsName::Git.resolve_binary(options.executable())?;
    Ok(CommandRunner::new(VcsName::Git, binary, dir)
        .with_debug(debug)
        .with_timeout(options.timeout()))
}
