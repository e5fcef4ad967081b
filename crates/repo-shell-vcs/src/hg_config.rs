// Copyright 2026 Oxide Computer Company

//! Credential-aware rewriting of `.hg/hgrc`.

use crate::{
    ConfigError, CredentialChange, CredentialStore,
    config_file::{read_document, write_document},
    credential::{ChangeKind, FieldChange},
};
use camino::{Utf8Path, Utf8PathBuf};
use repo_shell::{
    ConfigDocument, ConfigValueError, RemoteCredential, RemotePrefix,
};
use tracing::{debug, warn};

/// The section holding credential aliases.
pub const AUTH_SECTION: &str = "auth";

/// The section holding remote paths.
pub const PATHS_SECTION: &str = "paths";

/// The key of the default remote path in [`PATHS_SECTION`].
pub const DEFAULT_PATH_KEY: &str = "default";

/// The credential fields written for each alias.
const ALIAS_FIELDS: [&str; 3] = ["prefix", "username", "password"];

/// A repository's `hgrc`, parsed into a [`ConfigDocument`].
///
/// Credentials live in the `[auth]` section as groups of keys sharing an
/// alias:
///
/// ```ini
/// [auth]
/// example_com.prefix = example.com
/// example_com.username = alice
/// example_com.password = s3cret
/// ```
///
/// Every mutation re-reads the file, edits the document and writes the
/// whole file back through a temporary file and rename. Lines that are not
/// touched keep their exact bytes. No lock is taken: a concurrent writer
/// outside this process can lose its update.
#[derive(Clone, Debug)]
pub struct HgConfig {
    path: Utf8PathBuf,
    document: ConfigDocument,
}

impl HgConfig {
    /// Loads the config file at `path`. A missing file loads as an empty
    /// document.
    pub fn load(path: impl Into<Utf8PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let document = read_document(&path)?;
        Ok(HgConfig { path, document })
    }

    /// Re-reads the config file.
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        self.document = read_document(&self.path)?;
        Ok(())
    }

    /// Returns the path to the config file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the document as of the last read or write.
    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    /// Returns the value of `key` in `section`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.document.get(section, key)
    }

    /// Returns the default remote path (`[paths] default`), if set.
    pub fn remote_url(&self) -> Option<&str> {
        self.get(PATHS_SECTION, DEFAULT_PATH_KEY).filter(|url| !url.is_empty())
    }

    /// Sets the default remote path.
    pub fn set_path(&mut self, url: &str) -> Result<(), ConfigError> {
        self.update(|doc| {
            doc.set(PATHS_SECTION, DEFAULT_PATH_KEY, url)?;
            Ok(())
        })
    }

    /// Returns the alias whose `prefix` entry equals `prefix`.
    pub fn find_alias(&self, prefix: &RemotePrefix) -> Option<String> {
        find_alias(&self.document, prefix)
    }

    /// Removes every alias whose `prefix` entry equals `prefix`, returning
    /// how many were removed.
    ///
    /// Only the `prefix`, `username` and `password` keys of each alias are
    /// removed. Keys are matched by name; values elsewhere in the file are
    /// never touched.
    pub fn remove_credentials_for(
        &mut self,
        prefix: &RemotePrefix,
    ) -> Result<usize, ConfigError> {
        let mut doc = read_document(&self.path)?;
        let mut removed = 0;
        while let Some(alias) = find_alias(&doc, prefix) {
            for field in ALIAS_FIELDS {
                doc.remove(AUTH_SECTION, &alias_key(&alias, field));
            }
            removed += 1;
        }
        if removed > 0 {
            write_document(&self.path, &doc)?;
            debug!(path = %self.path, %prefix, removed, "removed credentials");
        }
        self.document = doc;
        Ok(removed)
    }

    /// Reads the file, applies `f`, and writes the result back.
    ///
    /// Nothing is written if `f` fails. The in-memory document is only
    /// replaced once the write succeeds.
    fn update<T>(
        &mut self,
        f: impl FnOnce(&mut ConfigDocument) -> Result<T, ConfigValueError>,
    ) -> Result<T, ConfigError> {
        let mut doc = read_document(&self.path)?;
        let result = f(&mut doc).map_err(|error| ConfigError::Value {
            path: self.path.clone(),
            error,
        })?;
        write_document(&self.path, &doc)?;
        self.document = doc;
        Ok(result)
    }
}

impl CredentialStore for HgConfig {
    /// Injects `credential` under the alias for its prefix.
    ///
    /// - If an alias for the prefix exists and its username and password
    ///   match (empty fields in `credential` match anything), nothing is
    ///   written.
    /// - If an alias exists with different values, its non-empty fields are
    ///   overwritten in place.
    /// - Otherwise a new alias is allocated and written, creating `[auth]`
    ///   if needed.
    fn set_credential(
        &mut self,
        credential: &RemoteCredential,
    ) -> Result<CredentialChange, ConfigError> {
        let doc = read_document(&self.path)?;
        let prefix = credential.prefix();
        let wanted = [
            ("username", credential.username()),
            ("password", credential.password()),
        ];

        let kind = match find_alias(&doc, prefix) {
            Some(alias) => {
                let stale: Vec<_> = wanted
                    .into_iter()
                    .filter(|(field, value)| {
                        !value.is_empty()
                            && doc.get(AUTH_SECTION, &alias_key(&alias, field))
                                != Some(*value)
                    })
                    .collect();
                if stale.is_empty() {
                    self.document = doc;
                    debug!(%prefix, %alias, "credential already present");
                    return Ok(CredentialChange::unchanged());
                }
                let fields = self.update(|doc| {
                    stale
                        .into_iter()
                        .map(|(field, value)| -> Result<_, ConfigValueError> {
                            let key = alias_key(&alias, field);
                            let previous = doc.set(AUTH_SECTION, &key, value)?;
                            Ok(FieldChange { key, previous })
                        })
                        .collect::<Result<Vec<_>, _>>()
                })?;
                ChangeKind::Overwrote { alias, fields }
            }
            None if credential.is_empty() => {
                self.document = doc;
                return Ok(CredentialChange::unchanged());
            }
            None => {
                let created_section = doc.section(AUTH_SECTION).is_none();
                let alias = allocate_alias(&doc, prefix);
                self.update(|doc| {
                    doc.set(
                        AUTH_SECTION,
                        &alias_key(&alias, "prefix"),
                        prefix.as_str(),
                    )?;
                    for (field, value) in wanted {
                        if !value.is_empty() {
                            doc.set(AUTH_SECTION, &alias_key(&alias, field), value)?;
                        }
                    }
                    Ok(())
                })?;
                ChangeKind::Inserted { alias, created_section }
            }
        };

        let change = CredentialChange(kind);
        debug!(path = %self.path, %prefix, ?change, "injected credential");
        Ok(change)
    }

    fn revert_credential(
        &mut self,
        change: CredentialChange,
    ) -> Result<(), ConfigError> {
        match change.0 {
            ChangeKind::Unchanged => Ok(()),
            ChangeKind::Overwrote { alias, fields } => {
                self.update(|doc| {
                    for FieldChange { key, previous } in fields {
                        match previous {
                            Some(value) => {
                                doc.set(AUTH_SECTION, &key, value)?;
                            }
                            None => {
                                doc.remove(AUTH_SECTION, &key);
                            }
                        }
                    }
                    Ok(())
                })?;
                debug!(path = %self.path, %alias, "restored credential");
                Ok(())
            }
            ChangeKind::Inserted { alias, created_section } => {
                self.update(|doc| {
                    for field in ALIAS_FIELDS {
                        doc.remove(AUTH_SECTION, &alias_key(&alias, field));
                    }
                    if created_section
                        && doc.section(AUTH_SECTION).is_some_and(|s| s.is_empty())
                    {
                        doc.remove_section(AUTH_SECTION);
                    }
                    Ok(())
                })?;
                debug!(path = %self.path, %alias, "removed credential");
                Ok(())
            }
            ChangeKind::OriginUrl { .. } => {
                warn!(
                    path = %self.path,
                    "ignoring a git credential change passed to an hg config"
                );
                Ok(())
            }
        }
    }
}

fn alias_key(alias: &str, field: &str) -> String {
    format!("{alias}.{field}")
}

fn find_alias(doc: &ConfigDocument, prefix: &RemotePrefix) -> Option<String> {
    doc.sections()
        .filter(|s| s.name() == AUTH_SECTION)
        .flat_map(|s| s.iter())
        .filter_map(|(key, _)| key.strip_suffix(".prefix"))
        .find(|alias| {
            doc.get(AUTH_SECTION, &alias_key(alias, "prefix"))
                == Some(prefix.as_str())
        })
        .map(str::to_owned)
}

/// Picks an alias for `prefix` that no existing `[auth]` key uses.
fn allocate_alias(doc: &ConfigDocument, prefix: &RemotePrefix) -> String {
    let base = prefix.alias();
    let in_use = |alias: &str| {
        let group = format!("{alias}.");
        doc.sections()
            .filter(|s| s.name() == AUTH_SECTION)
            .flat_map(|s| s.iter())
            .any(|(key, _)| key.starts_with(&group))
    };
    if !in_use(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let alias = format!("{base}_{n}");
        if !in_use(&alias) {
            return alias;
        }
        n += 1;
    }
}
