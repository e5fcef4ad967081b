// Copyright 2026 Oxide Computer Company

//! Scoped credential injection.

use crate::ConfigError;
use repo_shell::RemoteCredential;
use std::{
    fmt,
    ops::{Deref, DerefMut},
};
use tracing::warn;

/// A record of what injecting a credential changed in a config file.
///
/// Passing it back to [`CredentialStore::revert_credential`] undoes exactly
/// that change and nothing else.
#[derive(Clone, PartialEq, Eq)]
#[must_use]
pub struct CredentialChange(pub(crate) ChangeKind);

#[derive(Clone, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    /// The config already held matching credentials.
    Unchanged,
    /// An existing hg alias had some of its fields replaced.
    Overwrote { alias: String, fields: Vec<FieldChange> },
    /// A new hg alias was written.
    Inserted { alias: String, created_section: bool },
    /// git's `remote.origin.url` was replaced.
    OriginUrl { previous: Option<String> },
}

/// A single key that was overwritten, and the value it had before.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct FieldChange {
    pub(crate) key: String,
    pub(crate) previous: Option<String>,
}

impl CredentialChange {
    pub(crate) fn unchanged() -> Self {
        CredentialChange(ChangeKind::Unchanged)
    }

    /// Returns true if injecting the credential left the config untouched.
    pub fn is_unchanged(&self) -> bool {
        matches!(self.0, ChangeKind::Unchanged)
    }

    /// Returns the hg credential alias that was written or overwritten.
    pub fn alias(&self) -> Option<&str> {
        match &self.0 {
            ChangeKind::Overwrote { alias, .. }
            | ChangeKind::Inserted { alias, .. } => Some(alias),
            ChangeKind::Unchanged | ChangeKind::OriginUrl { .. } => None,
        }
    }
}

// Previous values are credentials, so only the shape of the change is
// printed.
impl fmt::Debug for CredentialChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ChangeKind::Unchanged => f.write_str("Unchanged"),
            ChangeKind::Overwrote { alias, fields } => f
                .debug_struct("Overwrote")
                .field("alias", alias)
                .field(
                    "keys",
                    &fields.iter().map(|c| c.key.as_str()).collect::<Vec<_>>(),
                )
                .finish(),
            ChangeKind::Inserted { alias, created_section } => f
                .debug_struct("Inserted")
                .field("alias", alias)
                .field("created_section", created_section)
                .finish(),
            ChangeKind::OriginUrl { previous } => f
                .debug_struct("OriginUrl")
                .field("had_previous", &previous.is_some())
                .finish(),
        }
    }
}

/// A place where credentials for a remote can be injected and removed.
///
/// Implemented by the config rewriters ([`GitConfig`](crate::GitConfig),
/// [`HgConfig`](crate::HgConfig)) and by the repository facades, which
/// delegate to their rewriter.
pub trait CredentialStore {
    /// Injects `credential`, returning a record of the change.
    ///
    /// Injecting the same credential twice leaves the config file exactly
    /// as a single injection does.
    fn set_credential(
        &mut self,
        credential: &RemoteCredential,
    ) -> Result<CredentialChange, ConfigError>;

    /// Undoes a change returned by [`set_credential`](Self::set_credential).
    fn revert_credential(
        &mut self,
        change: CredentialChange,
    ) -> Result<(), ConfigError>;
}

/// Keeps a credential injected for as long as the guard is alive.
///
/// The guard dereferences to the store, so a repository's operations can
/// be called through it. The credential is removed when the guard is
/// dropped, including during unwinding; call [`clear`](Self::clear) to
/// observe removal errors instead of having them logged.
///
/// # Examples
///
/// ```no_run
/// use repo_shell_vcs::{CredentialGuard, HgRepository, RepositoryOptions};
///
/// let mut repo =
///     HgRepository::open("/srv/checkout", false, RepositoryOptions::new())?;
/// let credential = repo.credential("deploy-bot", "s3cret");
///
/// let repo = CredentialGuard::acquire(&mut repo, &credential)?;
/// let outcome = repo.pull(&["-u"])?;
/// assert!(!outcome.needs_resolve());
/// repo.clear()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct CredentialGuard<'a, S: CredentialStore + ?Sized> {
    store: &'a mut S,
    change: Option<CredentialChange>,
}

impl<'a, S: CredentialStore + ?Sized> CredentialGuard<'a, S> {
    /// Injects `credential` into `store`.
    pub fn acquire(
        store: &'a mut S,
        credential: &RemoteCredential,
    ) -> Result<Self, ConfigError> {
        let change = store.set_credential(credential)?;
        Ok(CredentialGuard { store, change: Some(change) })
    }

    /// Returns the change this guard will revert.
    pub fn change(&self) -> Option<&CredentialChange> {
        self.change.as_ref()
    }

    /// Removes the credential now, returning any error.
    pub fn clear(mut self) -> Result<(), ConfigError> {
        match self.change.take() {
            Some(change) => self.store.revert_credential(change),
            None => Ok(()),
        }
    }
}

impl<S: CredentialStore + ?Sized> Deref for CredentialGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.store
    }
}

impl<S: CredentialStore + ?Sized> DerefMut for CredentialGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.store
    }
}

impl<S: CredentialStore + ?Sized> Drop for CredentialGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(change) = self.change.take() {
            if let Err(error) = self.store.revert_credential(change) {
                warn!(%error, "failed to remove injected credential");
            }
        }
    }
}
