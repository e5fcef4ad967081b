// Copyright 2026 Oxide Computer Company

//! Commit records parsed from formatted log output.

use crate::LogParseError;
use std::str::FromStr;

/// The separator between fields of a formatted log line.
pub const LOG_FIELD_SEPARATOR: char = '|';

/// The number of fields in a formatted log line.
pub const LOG_FIELD_COUNT: usize = 9;

/// A name and email pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// The person's name.
    pub name: String,
    /// The person's email address.
    pub email: String,
}

/// A single commit, as printed by a log query.
///
/// A log line has [`LOG_FIELD_COUNT`] fields separated by
/// [`LOG_FIELD_SEPARATOR`]: hash, tree, author name, author email, authored
/// date, committer name, committer email, committed date and message. The
/// message is the last field, so it may itself contain the separator.
///
/// # Examples
///
/// ```
/// use repo_shell::CommitRecord;
///
/// let record: CommitRecord =
///     "abc123|tree1|Alice|a@x.com|2024-01-01|Bob|b@x.com|2024-01-02|Fix bug"
///         .parse()
///         .unwrap();
/// assert_eq!(record.hash, "abc123");
/// assert_eq!(record.committer.name, "Bob");
/// assert_eq!(record.message, "Fix bug");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRecord {
    /// The commit (or changeset) hash.
    pub hash: String,
    /// The tree (git) or manifest (hg) identifier.
    pub tree: String,
    /// The author.
    pub author: Signature,
    /// The authored date, in ISO 8601 form.
    pub authored_date: String,
    /// The committer. For hg, this is the same as the author.
    pub committer: Signature,
    /// The committed date, in ISO 8601 form.
    pub committed_date: String,
    /// The first line of the commit message.
    pub message: String,
}

impl FromStr for CommitRecord {
    type Err = LogParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> =
            line.splitn(LOG_FIELD_COUNT, LOG_FIELD_SEPARATOR).collect();
        let [
            hash,
            tree,
            author_name,
            author_email,
            authored_date,
            committer_name,
            committer_email,
            committed_date,
            message,
        ] = fields[..]
        else {
            return Err(LogParseError::WrongFieldCount {
                line: line.to_owned(),
                expected: LOG_FIELD_COUNT,
                found: fields.len(),
            });
        };

        Ok(CommitRecord {
            hash: hash.to_owned(),
            tree: tree.to_owned(),
            author: Signature {
                name: author_name.to_owned(),
                email: author_email.to_owned(),
            },
            authored_date: authored_date.to_owned(),
            committer: Signature {
                name: committer_name.to_owned(),
                email: committer_email.to_owned(),
            },
            committed_date: committed_date.to_owned(),
            message: message.to_owned(),
        })
    }
}

/// Parses formatted log output into commit records, one per non-empty line.
///
/// Empty output yields no records.
pub fn parse_log(output: &str) -> Result<Vec<CommitRecord>, LogParseError> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::parse)
        .collect()
}
