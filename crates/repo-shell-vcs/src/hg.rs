// Copyright 2026 Oxide Computer Company

//! The hg repository facade.

use crate::{
    CommandError, CommandOutput, CommandRunner, ConfigError, CredentialChange,
    CredentialStore, HgConfig, LogError, ModifiedFiles, OpenError,
    PullOutcome, RepositoryOptions, VcsName, outputs::parse_hg_names,
};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use repo_shell::{CommitRecord, RemoteCredential, RemotePrefix, parse_log};
use tracing::{debug, warn};

/// The `--template` producing one [`CommitRecord`] line per changeset.
///
/// hg records a single user per changeset, so the author fills both the
/// author and committer fields. The manifest node stands in for the tree.
const LOG_TEMPLATE: &str = "{node}|{manifest}|{author|person}|{author|email}|\
                            {date|isodate}|{author|person}|{author|email}|\
                            {date|isodate}|{desc|firstline}\\n";

/// An hg working copy.
///
/// If the [`RepositoryOptions`] it was opened with carry a login or
/// password, they are written to `[auth]` in `.hg/hgrc` when the repository
/// is opened and removed again by
/// [`clear_credentials`](Self::clear_credentials) or on drop.
#[derive(Debug)]
pub struct HgRepository {
    runner: CommandRunner,
    config: HgConfig,
    remote_url: Option<String>,
    injected: Option<CredentialChange>,
}

impl HgRepository {
    /// Opens the hg repository at `repo_root`.
    ///
    /// Fails with [`OpenError::NotARepository`] if `<config_dir>` does not
    /// exist; nothing is written in that case.
    pub fn open(
        repo_root: impl Into<Utf8PathBuf>,
        debug: bool,
        options: RepositoryOptions,
    ) -> Result<Self, OpenError> {
        let repo_root = repo_root.into();
        let config_dir = config_dir(&options);
        VcsName::Hg.check_repository(&repo_root, &config_dir)?;

        let binary = VcsName::Hg.resolve_binary(options.executable())?;
        let runner = CommandRunner::new(VcsName::Hg, binary, repo_root.clone())
            .with_debug(debug)
            .with_timeout(options.timeout());
        let config = HgConfig::load(
            repo_root.join(&config_dir).join(VcsName::Hg.config_file_name()),
        )?;
        let mut repo = HgRepository {
            runner,
            config,
            remote_url: options.remote_url().map(str::to_owned),
            injected: None,
        };

        if let Some(credential) = options.credential(repo.prefix()) {
            let change = repo.config.set_credential(&credential)?;
            repo.injected = Some(change);
        }

        debug!(%repo_root, "opened hg repository");
        Ok(repo)
    }

    /// Runs `hg init` in `repo_root`, creating the directory if needed,
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
        let binary = VcsName::Hg.resolve_binary(options.executable())?;
        CommandRunner::new(VcsName::Hg, binary, repo_root.clone())
            .with_debug(debug)
            .with_timeout(options.timeout())
            .run(["init"])?;
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

    /// Returns the repository's `hgrc`.
    pub fn config(&self) -> &HgConfig {
        &self.config
    }

    /// Returns the repository's `hgrc` for modification.
    pub fn config_mut(&mut self) -> &mut HgConfig {
        &mut self.config
    }

    /// Returns the remote URL: the `repository` option if it was given,
    /// otherwise `[paths] default`.
    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url.as_deref().or_else(|| self.config.remote_url())
    }

    /// Returns the change made by credential injection at open time, if any.
    pub fn injected_credential(&self) -> Option<&CredentialChange> {
        self.injected.as_ref()
    }

    /// Builds a credential for this repository's remote prefix.
    pub fn credential(&self, username: &str, password: &str) -> RemoteCredential {
        RemoteCredential::new(self.prefix(), username, password)
    }

    /// Removes the credentials injected at open time. Does nothing if none
    /// were injected.
    pub fn clear_credentials(&mut self) -> Result<(), ConfigError> {
        match self.injected.take() {
            Some(change) => self.config.revert_credential(change),
            None => Ok(()),
        }
    }

    /// Returns the last `n` changesets, newest first.
    pub fn commits(&self, n: usize) -> Result<Vec<CommitRecord>, LogError> {
        let n = n.to_string();
        let output = self.runner.run([
            "log",
            "-l",
            n.as_str(),
            "--template",
            LOG_TEMPLATE,
        ])?;
        Ok(parse_log(&output.stdout)?)
    }

    /// Runs `hg pull` with `args`, pulling from the `repository` option if
    /// one was given.
    ///
    /// A pull with `-u` that stops on merge conflicts is not an error: the
    /// returned outcome reports [`needs_resolve`](PullOutcome::needs_resolve).
    pub fn pull<S: AsRef<str>>(
        &self,
        args: &[S],
    ) -> Result<PullOutcome, CommandError> {
        let args = std::iter::once("pull")
            .chain(args.iter().map(|arg| arg.as_ref()))
            .chain(self.remote_url.as_deref());
        match self.runner.run(args) {
            Ok(output) => Ok(PullOutcome::new(output.stdout)),
            Err(CommandError::Failed { stdout, stderr, .. })
                if stdout.contains("hg resolve")
                    || stderr.contains("hg resolve") =>
            {
                Ok(PullOutcome::new(format!("{stdout}\n{stderr}")))
            }
            Err(error) => Err(error),
        }
    }

    /// Updates the working copy to `rev`.
    pub fn update(&self, rev: &str) -> Result<(), CommandError> {
        self.runner.run(["update", rev])?;
        Ok(())
    }

    /// Updates to the tip of the current branch, discarding local changes.
    pub fn update_clean(&self) -> Result<(), CommandError> {
        self.runner.run(["update", "-C"])?;
        Ok(())
    }

    /// Updates the working copy to revision `rev`.
    pub fn revert_to(&self, rev: &str) -> Result<(), CommandError> {
        self.runner.run(["update", "-r", rev])?;
        Ok(())
    }

    /// Updates the working copy to the head of branch `name`.
    pub fn set_branch(&self, name: &str) -> Result<(), CommandError> {
        self.runner.run(["update", name])?;
        Ok(())
    }

    /// Returns the short node id of the working copy's parent.
    pub fn current_revision(&self) -> Result<String, CommandError> {
        Ok(self.runner.run(["identify", "-i"])?.stdout)
    }

    /// Lists files with uncommitted modifications.
    pub fn modified_files(&self) -> Result<ModifiedFiles, CommandError> {
        let output = self.runner.run(["status", "-m"])?;
        Ok(ModifiedFiles::from_hg(&output.stdout))
    }

    /// Lists open named branches, including inactive ones.
    pub fn branches(&self) -> Result<Vec<String>, CommandError> {
        Ok(parse_hg_names(&self.runner.run(["branches"])?.stdout))
    }

    /// Returns the working copy's branch.
    pub fn current_branch(&self) -> Result<String, CommandError> {
        Ok(self.runner.run(["branch"])?.stdout)
    }

    /// Lists tags, including `tip`.
    pub fn tags(&self) -> Result<Vec<String>, CommandError> {
        Ok(parse_hg_names(&self.runner.run(["tags"])?.stdout))
    }

    /// Returns the output of `hg status`.
    pub fn status(&self) -> Result<String, CommandError> {
        Ok(self.runner.run(["status"])?.stdout)
    }

    /// Runs an arbitrary hg command. A leading `hg` argument is ignored.
    pub fn run<S: AsRef<str>>(
        &self,
        args: &[S],
    ) -> Result<CommandOutput, CommandError> {
        let args = match args.split_first() {
            Some((first, rest)) if first.as_ref() == "hg" => rest,
            _ => args,
        };
        self.runner.run(args)
    }

    fn prefix(&self) -> RemotePrefix {
        RemotePrefix::compute(self.remote_url(), self.repo_root())
    }
}

impl CredentialStore for HgRepository {
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

impl Drop for HgRepository {
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
        || Utf8PathBuf::from(VcsName::Hg.default_config_dir()),
        Utf8Path::to_owned,
    )
}
