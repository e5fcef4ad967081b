// Copyright 2026 Oxide Computer Company

//! An ordered, comment-preserving model of INI-style config files.

use crate::{ConfigParseError, ConfigValueError};
use std::{borrow::Cow, fmt, str::FromStr};

/// An INI-style config document such as `.hg/hgrc` or `.git/config`.
///
/// The document is an ordered list of sections, each an ordered list of
/// `key = value` entries. Everything that is not a key/value pair inside a
/// section (comments, blank lines, `%include` and `%unset` directives, lines
/// before the first section) is kept verbatim.
///
/// Lines that are never modified serialize back byte-for-byte. Lines
/// written through [`set`](Self::set) are formatted as `key = value`.
/// Line endings are normalized to `\n`.
///
/// Section names are compared exactly. For git, a subsection header such as
/// `[remote "origin"]` has the name `remote "origin"`.
///
/// Repeated sections are allowed. Lookups follow INI semantics where the
/// last occurrence of a key wins.
///
/// # Examples
///
/// ```
/// use repo_shell::ConfigDocument;
///
/// let mut doc: ConfigDocument =
///     "# managed by hand\n[paths]\ndefault = https://example.com/repo\n"
///         .parse()
///         .unwrap();
/// assert_eq!(doc.get("paths", "default"), Some("https://example.com/repo"));
///
/// doc.set("auth", "example_com.prefix", "example.com").unwrap();
/// assert_eq!(
///     doc.to_file_contents(),
///     "# managed by hand\n[paths]\ndefault = https://example.com/repo\n\
///      [auth]\nexample_com.prefix = example.com\n",
/// );
///
/// doc.remove_section("auth");
/// assert_eq!(
///     doc.to_file_contents(),
///     "# managed by hand\n[paths]\ndefault = https://example.com/repo\n",
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigDocument {
    /// Lines before the first section header.
    preamble: Vec<String>,
    sections: Vec<Section>,
    trailing_newline: bool,
}

/// A single `[name]` section of a [`ConfigDocument`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    name: String,
    /// The header line as read from disk. `None` for sections created in
    /// memory.
    header: Option<String>,
    entries: Vec<Entry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Entry {
    Value {
        key: String,
        value: String,
        /// The source line(s), kept until the value is modified.
        raw: Option<String>,
    },
    Verbatim(String),
}

impl Entry {
    fn line(&self) -> Cow<'_, str> {
        match self {
            Entry::Value { raw: Some(raw), .. } => Cow::Borrowed(raw),
            Entry::Value { key, value, raw: None } => {
                Cow::Owned(format!("{key} = {}", value.replace('\n', "\n  ")))
            }
            Entry::Verbatim(line) => Cow::Borrowed(line),
        }
    }

    fn key(&self) -> Option<&str> {
        match self {
            Entry::Value { key, .. } => Some(key),
            Entry::Verbatim(_) => None,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Entry::Verbatim(line) if line.trim().is_empty())
    }
}

impl Section {
    fn new(name: &str) -> Self {
        Section { name: name.to_owned(), header: None, entries: Vec::new() }
    }

    /// Returns the section name, without brackets.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value of `key` in this section, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().rev().find_map(|entry| match entry {
            Entry::Value { key: k, value, .. } if k == key => {
                Some(value.as_str())
            }
            _ => None,
        })
    }

    /// Iterates over the `(key, value)` pairs of this section in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Value { key, value, .. } => {
                Some((key.as_str(), value.as_str()))
            }
            Entry::Verbatim(_) => None,
        })
    }

    /// Returns true if the section has no entries other than blank lines.
    ///
    /// A section holding only comments is not empty.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Entry::is_blank)
    }

    fn header_line(&self) -> Cow<'_, str> {
        match &self.header {
            Some(header) => Cow::Borrowed(header),
            None => Cow::Owned(format!("[{}]", self.name)),
        }
    }

    fn push_value(&mut self, key: &str, value: String) {
        // Insert after the last non-blank line, so that blank separators
        // stay between this section and the next one.
        let at = self
            .entries
            .iter()
            .rposition(|entry| !entry.is_blank())
            .map_or(0, |i| i + 1);
        self.entries.insert(
            at,
            Entry::Value { key: key.to_owned(), value, raw: None },
        );
    }
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        ConfigDocument {
            preamble: Vec::new(),
            sections: Vec::new(),
            trailing_newline: true,
        }
    }

    /// Returns true if the document has no lines at all.
    pub fn is_empty(&self) -> bool {
        self.preamble.is_empty() && self.sections.is_empty()
    }

    /// Iterates over the sections in file order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Returns the last section named `name`, if any.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().rev().find(|s| s.name == name)
    }

    /// Returns the value of `key` in `section`.
    ///
    /// If the key appears more than once (possibly across repeated
    /// sections), the last occurrence wins.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .rev()
            .filter(|s| s.name == section)
            .find_map(|s| s.get(key))
    }

    /// Sets `key` in `section` to `value`, returning the previous value.
    ///
    /// An existing entry is updated in place. Otherwise the key is appended
    /// to the last section with that name, and the section is created at
    /// the end of the document if it does not exist.
    ///
    /// Setting a key to its current value leaves the line untouched.
    ///
    /// Values must read back unchanged after the document is written. A
    /// value with leading or trailing whitespace is rejected, as are
    /// multi-line values whose later lines would not parse as continuation
    /// lines. Nothing is modified in that case.
    pub fn set(
        &mut self,
        section: &str,
        key: &str,
        value: impl Into<String>,
    ) -> Result<Option<String>, ConfigValueError> {
        let value = value.into();
        check_value(section, key, &value)?;

        let existing = self
            .sections
            .iter_mut()
            .rev()
            .filter(|s| s.name == section)
            .flat_map(|s| s.entries.iter_mut().rev())
            .find(|entry| entry.key() == Some(key));
        if let Some(Entry::Value { value: current, raw, .. }) = existing {
            if *current != value {
                *raw = None;
            }
            return Ok(Some(std::mem::replace(current, value)));
        }

        let index = match self.sections.iter().rposition(|s| s.name == section)
        {
            Some(index) => index,
            None => {
                self.sections.push(Section::new(section));
                self.sections.len() - 1
            }
        };
        self.sections[index].push_value(key, value);
        Ok(None)
    }

    /// Removes every occurrence of `key` from `section`, returning the
    /// value that was in effect.
    ///
    /// Removal is by section and key only; values are never matched.
    pub fn remove(&mut self, section: &str, key: &str) -> Option<String> {
        let mut removed = None;
        for s in self.sections.iter_mut().filter(|s| s.name == section) {
            s.entries.retain(|entry| match entry {
                Entry::Value { key: k, value, .. } if k == key => {
                    removed = Some(value.clone());
                    false
                }
                _ => true,
            });
        }
        removed
    }

    /// Removes every section named `name`, including its comments.
    ///
    /// Returns true if anything was removed.
    pub fn remove_section(&mut self, name: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.name != name);
        self.sections.len() != before
    }

    /// Returns the file contents for this document.
    pub fn to_file_contents(&self) -> String {
        self.to_string()
    }

    fn lines(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.preamble.iter().map(|line| Cow::Borrowed(line.as_str())).chain(
            self.sections.iter().flat_map(|s| {
                std::iter::once(s.header_line())
                    .chain(s.entries.iter().map(Entry::line))
            }),
        )
    }
}

/// Checks that `value` parses back to itself once written as
/// `key = value`.
fn check_value(
    section: &str,
    key: &str,
    value: &str,
) -> Result<(), ConfigValueError> {
    if value.trim() != value {
        return Err(ConfigValueError::SurroundingWhitespace {
            section: section.to_owned(),
            key: key.to_owned(),
        });
    }
    let continuation_ok = |line: &str| {
        !line.is_empty()
            && line.trim() == line
            && !line.contains('=')
            && !line.starts_with(['#', ';', '%', '['])
    };
    if !value.split('\n').skip(1).all(continuation_ok) {
        return Err(ConfigValueError::InvalidContinuation {
            section: section.to_owned(),
            key: key.to_owned(),
        });
    }
    Ok(())
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = self.lines().peekable();
        while let Some(line) = lines.next() {
            f.write_str(&line)?;
            if lines.peek().is_some() || self.trailing_newline {
                f.write_str("\n")?;
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigDocument {
    type Err = ConfigParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut doc = ConfigDocument {
            preamble: Vec::new(),
            sections: Vec::new(),
            trailing_newline: s.is_empty() || s.ends_with('\n'),
        };

        for (index, line) in s.lines().enumerate() {
            let line_number = index + 1;
            let trimmed = line.trim();

            if trimmed.starts_with('[') {
                let end = trimmed.find(']').ok_or_else(|| {
                    ConfigParseError::UnterminatedSection {
                        line_number,
                        line: line.to_owned(),
                    }
                })?;
                let name = trimmed[1..end].trim();
                if name.is_empty() {
                    return Err(ConfigParseError::EmptySectionName {
                        line_number,
                    });
                }
                doc.sections.push(Section {
                    name: name.to_owned(),
                    header: Some(line.to_owned()),
                    entries: Vec::new(),
                });
                continue;
            }

            let Some(section) = doc.sections.last_mut() else {
                doc.preamble.push(line.to_owned());
                continue;
            };

            if trimmed.is_empty() || trimmed.starts_with(['#', ';', '%']) {
                section.entries.push(Entry::Verbatim(line.to_owned()));
                continue;
            }

            // An indented line without `=` continues the previous value.
            // Indented `key = value` lines are their own entries, as git
            // writes them.
            let indented = line.starts_with([' ', '\t']);
            if indented && !trimmed.contains('=') {
                if let Some(Entry::Value { value, raw: Some(raw), .. }) =
                    section.entries.last_mut()
                {
                    value.push('\n');
                    value.push_str(trimmed);
                    raw.push('\n');
                    raw.push_str(line);
                    continue;
                }
            }

            match trimmed.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    section.entries.push(Entry::Value {
                        key: key.trim().to_owned(),
                        value: value.trim().to_owned(),
                        raw: Some(line.to_owned()),
                    });
                }
                // Bare keys (git booleans) and anything else are kept
                // as-is.
                _ => section.entries.push(Entry::Verbatim(line.to_owned())),
            }
        }

        Ok(doc)
    }
}
