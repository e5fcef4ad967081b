// Copyright 2026 Oxide Computer Company

//! Tests for hg repositories.
//!
//! Config rewriting only needs an `.hg` directory, so those tests run
//! everywhere. Tests that run hg itself are skipped when it is not
//! installed.

use crate::{commit_via_hg, hg, hg_available, hg_bin};
use anyhow::Result;
use camino::Utf8Path;
use camino_tempfile::Utf8TempDir;
use repo_shell::RemotePrefix;
use repo_shell_vcs::{
    CredentialGuard, CredentialStore, HgRepository, OpenError,
    RepositoryOptions,
};
use std::fs;

const HGRC: &str = "\
# Written by hand; keep this comment.
[paths]
default = https://hg.example.com/team/project

[ui]
username = Test User <test@example.com>
merge = internal:merge
ignore = .hgignore
  .hgignore-local

%include ../shared.rc
";

fn options() -> RepositoryOptions {
    RepositoryOptions::new().with_executable(hg_bin())
}

/// Creates a directory that looks like an hg repository, with `hgrc`.
fn fake_repo(hgrc: &str) -> Result<Utf8TempDir> {
    let temp = Utf8TempDir::with_prefix("repo-shell-hg-")?;
    fs::create_dir(temp.path().join(".hg"))?;
    fs::write(temp.path().join(".hg/hgrc"), hgrc)?;
    Ok(temp)
}

fn read_hgrc(repo_root: &Utf8Path) -> Result<String> {
    Ok(fs::read_to_string(repo_root.join(".hg/hgrc"))?)
}

#[test]
fn test_inject_is_idempotent_and_reversible() -> Result<()> {
    let temp = fake_repo(HGRC)?;

    let credentialed = options().with_login("bot").with_password("hunter2");
    let mut repo = HgRepository::open(temp.path(), false, credentialed.clone())?;
    let once = read_hgrc(temp.path())?;
    assert!(once.starts_with(HGRC), "existing lines are untouched:\n{once}");
    assert!(once.contains("hg_example_com.password = hunter2"), "{once}");

    // Injecting again, directly or by opening a second handle, changes
    // nothing.
    let credential = repo.credential("bot", "hunter2");
    assert!(repo.set_credential(&credential)?.is_unchanged());
    {
        let second = HgRepository::open(temp.path(), false, credentialed)?;
        assert!(second.injected_credential().is_some_and(|c| c.is_unchanged()));
    }
    assert_eq!(read_hgrc(temp.path())?, once);

    repo.clear_credentials()?;
    assert_eq!(read_hgrc(temp.path())?, HGRC);
    Ok(())
}

#[test]
fn test_overwrite_is_restored_on_drop() -> Result<()> {
    let original = format!(
        "{HGRC}\n[auth]\n\
         team.prefix = hg.example.com\n\
         team.username = alice\n\
         team.password = old-password\n\
         team.schemes = https\n"
    );
    let temp = fake_repo(&original)?;

    {
        let options = options().with_password("new-password");
        let repo = HgRepository::open(temp.path(), false, options)?;
        assert_eq!(
            repo.config().get("auth", "team.password"),
            Some("new-password")
        );
        assert_eq!(repo.config().get("auth", "team.username"), Some("alice"));
    }
    assert_eq!(read_hgrc(temp.path())?, original);
    Ok(())
}

#[test]
fn test_guard_and_prefix_removal() -> Result<()> {
    let temp = fake_repo(HGRC)?;
    let mut repo = HgRepository::open(temp.path(), false, options())?;
    assert!(repo.injected_credential().is_none());

    let credential = repo.credential("bot", "hunter2");
    {
        let guarded = CredentialGuard::acquire(&mut repo, &credential)?;
        let alias = guarded.change().and_then(|c| c.alias()).map(str::to_owned);
        assert_eq!(alias.as_deref(), Some("hg_example_com"));
        assert!(read_hgrc(temp.path())?.contains("hunter2"));
    }
    assert_eq!(read_hgrc(temp.path())?, HGRC);

    // Credentials left behind by someone else are removed by prefix.
    let change = repo.set_credential(&credential)?;
    assert!(!change.is_unchanged());
    let prefix = RemotePrefix::new("hg.example.com");
    assert_eq!(repo.config_mut().remove_credentials_for(&prefix)?, 1);
    assert!(!read_hgrc(temp.path())?.contains("hunter2"));
    Ok(())
}

#[test]
fn test_missing_hgrc() -> Result<()> {
    let temp = Utf8TempDir::with_prefix("repo-shell-hg-")?;
    fs::create_dir(temp.path().join(".hg"))?;

    let options = options()
        .with_remote_url("ssh://hg@code.example.org//srv/project")
        .with_login("bot");
    let mut repo = HgRepository::open(temp.path(), false, options)?;
    assert_eq!(
        repo.config().get("auth", "code_example_org.prefix"),
        Some("code.example.org")
    );
    repo.clear_credentials()?;
    assert_eq!(read_hgrc(temp.path())?, "");

    repo.config_mut().set_path("ssh://hg@code.example.org//srv/project")?;
    assert_eq!(
        read_hgrc(temp.path())?,
        "[paths]\ndefault = ssh://hg@code.example.org//srv/project\n"
    );
    Ok(())
}

#[test]
fn test_open_not_a_repository() -> Result<()> {
    let temp = Utf8TempDir::with_prefix("repo-shell-hg-")?;
    fs::write(temp.path().join("hgrc"), HGRC)?;

    let options = options().with_login("bot").with_password("hunter2");
    let err = HgRepository::open(temp.path(), false, options).unwrap_err();
    assert!(matches!(err, OpenError::NotARepository { .. }), "{err:?}");
    assert_eq!(fs::read_to_string(temp.path().join("hgrc"))?, HGRC);
    assert!(!temp.path().join(".hg").exists());
    Ok(())
}

#[test]
fn test_hg_operations() -> Result<()> {
    if !hg_available() {
        return Ok(());
    }

    let temp = Utf8TempDir::with_prefix("repo-shell-hg-")?;
    let repo_root = temp.path().join("project");
    let repo = HgRepository::create(&repo_root, false, options())?;
    commit_via_hg(&repo_root, "a.txt", "a\n", "Add a")?;
    commit_via_hg(&repo_root, "b.txt", "b\n", "Parse a|b pairs\n\nDetails.")?;

    let commits = repo.commits(5)?;
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].message, "Parse a|b pairs");
    assert_eq!(commits[0].author.name, "Test User");
    assert_eq!(commits[0].author.email, "test@example.com");
    assert_eq!(commits[0].committer, commits[0].author);
    assert_eq!(commits[0].hash.len(), 40);
    assert_eq!(repo.commits(1)?.len(), 1);

    let tip = hg(&repo_root, &["identify", "-i"])?;
    assert_eq!(repo.current_revision()?, tip);
    assert_eq!(repo.current_branch()?, "default");
    assert_eq!(repo.branches()?, ["default"]);
    assert!(repo.tags()?.iter().any(|tag| tag == "tip"));

    fs::write(repo_root.join("a.txt"), "changed\n")?;
    assert_eq!(repo.modified_files()?.files(), ["a.txt"]);
    assert!(repo.status()?.starts_with("M a.txt"));
    repo.update_clean()?;
    assert!(repo.modified_files()?.is_empty());

    repo.revert_to("0")?;
    assert!(!repo_root.join("b.txt").exists());
    repo.update("tip")?;
    assert!(repo_root.join("b.txt").exists());
    repo.set_branch("default")?;

    let output = repo.run(&["hg", "log", "-l", "1", "--template", "{desc}"])?;
    assert_eq!(output.stdout, "Parse a|b pairs\n\nDetails.");
    Ok(())
}

#[test]
fn test_hg_pull() -> Result<()> {
    if !hg_available() {
        return Ok(());
    }

    let temp = Utf8TempDir::with_prefix("repo-shell-hg-")?;
    let upstream = temp.path().join("upstream");
    HgRepository::create(&upstream, false, options())?;
    commit_via_hg(&upstream, "a.txt", "a\n", "Add a")?;

    let local = temp.path().join("local");
    HgRepository::create(&local, false, options())?;
    let repo = HgRepository::open(
        &local,
        false,
        options().with_remote_url(upstream.as_str()),
    )?;
    let outcome = repo.pull(&["-u"])?;
    assert!(!outcome.needs_resolve(), "{}", outcome.output());
    assert!(local.join("a.txt").exists());
    Ok(())
}
