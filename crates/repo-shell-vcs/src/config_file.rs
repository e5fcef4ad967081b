// Copyright 2026 Oxide Computer Company

//! Reading and atomically rewriting config files.

use crate::{AtomicWriteError, ConfigError};
use atomicwrites::AtomicFile;
use camino::Utf8Path;
use fs_err as fs;
use repo_shell::ConfigDocument;
use std::io::{self, Write};

/// Reads and parses the config file at `path`.
///
/// A missing file reads as an empty document: hg repositories have no
/// `hgrc` until something writes one.
pub(crate) fn read_document(
    path: &Utf8Path,
) -> Result<ConfigDocument, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => String::new(),
        Err(error) => {
            return Err(ConfigError::Read { path: path.to_owned(), error });
        }
    };
    contents
        .parse()
        .map_err(|error| ConfigError::Parse { path: path.to_owned(), error })
}

/// Writes `document` to `path` through a temporary file that is renamed
/// into place, so a failed write leaves the previous contents intact.
pub(crate) fn write_document(
    path: &Utf8Path,
    document: &ConfigDocument,
) -> Result<(), ConfigError> {
    let contents = document.to_file_contents();
    AtomicFile::new(path, atomicwrites::OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(contents.as_bytes()))
        .map_err(|error| {
            let error = match error {
                atomicwrites::Error::Internal(e) => AtomicWriteError::Rename(e),
                atomicwrites::Error::User(e) => AtomicWriteError::Write(e),
            };
            ConfigError::Write { path: path.to_owned(), error }
        })
}
