// Copyright 2026 Oxide Computer Company

//! Error types for config documents, remote URLs and log records.

use thiserror::Error;

/// An error that occurs while parsing a
/// [`ConfigDocument`](crate::ConfigDocument).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigParseError {
    /// A section header was opened with `[` but never closed.
    #[error("line {line_number}: unterminated section header {line:?}")]
    UnterminatedSection {
        /// The 1-based line number of the header.
        line_number: usize,
        /// The offending line.
        line: String,
    },

    /// A section header has no name (e.g., `[]` or `[  ]`).
    #[error("line {line_number}: section header has an empty name")]
    EmptySectionName {
        /// The 1-based line number of the header.
        line_number: usize,
    },
}

/// An error returned when a value cannot be written to a
/// [`ConfigDocument`](crate::ConfigDocument) without changing on re-read.
///
/// The value itself is not included, since it may be a password.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigValueError {
    /// The value starts or ends with whitespace, which INI parsers strip.
    #[error("value for {section}.{key} has leading or trailing whitespace")]
    SurroundingWhitespace {
        /// The section the value was written to.
        section: String,
        /// The key the value was written to.
        key: String,
    },

    /// A line after the first would not read back as a continuation line:
    /// it is empty, has surrounding whitespace, contains `=`, or starts
    /// with a comment, directive or section marker.
    #[error("value for {section}.{key} has an invalid continuation line")]
    InvalidContinuation {
        /// The section the value was written to.
        section: String,
        /// The key the value was written to.
        key: String,
    },
}

/// An error that occurs while parsing a
/// [`CommitRecord`](crate::CommitRecord) from log output.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum LogParseError {
    /// The line did not contain the expected number of `|`-separated
    /// fields.
    #[error(
        "malformed log record: expected {expected} '|'-separated fields, \
         found {found} in {line:?}"
    )]
    WrongFieldCount {
        /// The line that failed to parse.
        line: String,
        /// The number of fields a record must have.
        expected: usize,
        /// The number of fields actually present.
        found: usize,
    },
}

/// An error that occurs while embedding credentials into a remote URL.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CredentialUrlError {
    /// The remote URL could not be parsed.
    #[error("invalid remote URL {url:?}")]
    Invalid {
        /// The remote URL, with any credentials stripped.
        url: String,
        /// The underlying parse error.
        #[source]
        error: url::ParseError,
    },

    /// The remote URL has no host, so it cannot carry a username or
    /// password (e.g., `file:///srv/repo`).
    #[error("remote URL {url:?} cannot carry credentials")]
    CannotCarryCredentials {
        /// The remote URL, with any credentials stripped.
        url: String,
    },
}
