// Copyright 2026 Oxide Computer Company

//! Integration tests for repo-shell-vcs.

use anyhow::Result;
use camino::Utf8Path;
use std::{fs, process::Command};

mod git;
mod hg;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Returns the git binary, respecting the `$GIT` environment variable.
fn git_bin() -> String {
    std::env::var("GIT").unwrap_or_else(|_| "git".to_string())
}

/// Returns the hg binary, respecting the `$HG` environment variable.
fn hg_bin() -> String {
    std::env::var("HG").unwrap_or_else(|_| "hg".to_string())
}

/// Runs git in `dir`, returning trimmed stdout.
fn git(dir: &Utf8Path, args: &[&str]) -> Result<String> {
    run(Command::new(git_bin()), dir, args)
}

/// Runs hg in `dir`, returning trimmed stdout.
fn hg(dir: &Utf8Path, args: &[&str]) -> Result<String> {
    let mut command = Command::new(hg_bin());
    // Keep the user's hgrc out of the tests.
    command.env("HGPLAIN", "1").env("HGRCPATH", "");
    run(command, dir, args)
}

fn run(mut command: Command, dir: &Utf8Path, args: &[&str]) -> Result<String> {
    let output = command.args(args).current_dir(dir).output()?;
    anyhow::ensure!(
        output.status.success(),
        "{args:?} failed ({}): {}",
        output.status,
        String::from_utf8_lossy(&output.stderr).trim(),
    );
    Ok(String::from_utf8(output.stdout)?.trim().to_string())
}

/// Returns `false` if hg is not installed or `SKIP_HG_TESTS` is set.
fn hg_available() -> bool {
    if std::env::var("SKIP_HG_TESTS").is_ok() {
        return false;
    }
    match Command::new(hg_bin()).arg("--version").output() {
        Ok(o) if o.status.success() => true,
        _ => {
            eprintln!("hg not found, skipping test");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Repository setup helpers
// ---------------------------------------------------------------------------

/// Initializes a git repository and configures the user.
fn init_git_repo(repo_root: &Utf8Path) -> Result<()> {
    git(repo_root, &["init"])?;
    git(repo_root, &["config", "user.email", "test@example.com"])?;
    git(repo_root, &["config", "user.name", "Test User"])?;
    Ok(())
}

/// Writes `path` and commits it via git with `message`. Returns the commit
/// hash.
fn commit_via_git(
    repo_root: &Utf8Path,
    path: &str,
    contents: &str,
    message: &str,
) -> Result<String> {
    let file = repo_root.join(path);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file, contents)?;
    git(repo_root, &["add", "."])?;
    git(repo_root, &["commit", "-m", message])?;
    git(repo_root, &["rev-parse", "HEAD"])
}

/// Writes `path` and commits it via hg with `message`.
fn commit_via_hg(
    repo_root: &Utf8Path,
    path: &str,
    contents: &str,
    message: &str,
) -> Result<()> {
    fs::write(repo_root.join(path), contents)?;
    hg(
        repo_root,
        &["commit", "-A", "-m", message, "-u", "Test User <test@example.com>"],
    )?;
    Ok(())
}
