// Copyright 2026 Oxide Computer Company

//! Parsed results of VCS queries.

/// Files with uncommitted modifications, relative to the repository root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModifiedFiles {
    files: Vec<String>,
}

impl ModifiedFiles {
    /// Parses `git ls-files -m` output: one path per line.
    pub(crate) fn from_git(output: &str) -> Self {
        let files = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        ModifiedFiles { files }
    }

    /// Parses `hg status -m` output: `M <path>` per line.
    pub(crate) fn from_hg(output: &str) -> Self {
        let files = output
            .lines()
            .filter_map(|line| {
                let path = line.strip_prefix("M ").unwrap_or(line).trim();
                (!path.is_empty()).then(|| path.to_owned())
            })
            .collect();
        ModifiedFiles { files }
    }

    /// Returns the modified paths in the order the VCS listed them.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Returns true if nothing is modified.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns true if `path` is modified.
    pub fn is_modified(&self, path: &str) -> bool {
        self.files.iter().any(|file| file == path)
    }
}

impl IntoIterator for ModifiedFiles {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

/// The result of `hg pull`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullOutcome {
    output: String,
    needs_resolve: bool,
}

impl PullOutcome {
    pub(crate) fn new(output: String) -> Self {
        let needs_resolve = output.contains("hg resolve");
        PullOutcome { output, needs_resolve }
    }

    /// Returns the trimmed output of the pull.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns true if the pull left merge conflicts that need
    /// `hg resolve`.
    pub fn needs_resolve(&self) -> bool {
        self.needs_resolve
    }
}

/// Parses `git branch` output into branch names.
///
/// Lines that do not name a branch, such as `(HEAD detached at abc123)`,
/// are skipped, and symbolic refs listed with `-a` are reported by their
/// own name.
pub(crate) fn parse_git_branches(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(parse_git_branch_line)
        .map(|(_, name)| name.to_owned())
        .collect()
}

/// Returns the branch marked with `* ` in `git branch` output, or `None`
/// if HEAD is detached.
pub(crate) fn parse_git_current(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(parse_git_branch_line)
        .find_map(|(current, name)| current.then(|| name.to_owned()))
}

/// Parses `git tag` output, one name per line.
pub(crate) fn parse_git_tags(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Splits one `git branch` line into whether it is the current branch and
/// the branch name.
fn parse_git_branch_line(line: &str) -> Option<(bool, &str)> {
    let (current, rest) = match line.get(..2) {
        Some("* ") => (true, &line[2..]),
        // Checked out in another worktree.
        Some("+ ") => (false, &line[2..]),
        _ => (false, line),
    };
    let name = rest.trim();
    // `remotes/origin/HEAD -> origin/main`
    let name = name.split_once(" -> ").map_or(name, |(name, _)| name);
    (!name.is_empty() && !name.starts_with('(')).then_some((current, name))
}

/// Parses `hg branches` or `hg tags` output, where each line is
/// `<name> <rev>:<node>` optionally followed by ` (inactive)` or
/// ` (closed)`. Names may contain spaces.
pub(crate) fn parse_hg_names(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let line = line
                .trim_end()
                .trim_end_matches(" (inactive)")
                .trim_end_matches(" (closed)");
            let (name, _rev) = line.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            (!name.is_empty()).then(|| name.to_owned())
        })
        .collect()
}
