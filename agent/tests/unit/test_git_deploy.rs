//! Deployments against real git repositories
//!
//! Each test builds a bare remote plus a deployed clone in a temp dir. The
//! tests return early when no git executable is available.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use pushdeploy::deploy::command::GitCommandRunner;
use pushdeploy::deploy::executor::{DeployFailure, DeploymentExecutor};
use pushdeploy::deploy::journal::DeployJournal;
use pushdeploy::storage::settings::DeploymentConfig;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Deploy Test",
            "-c",
            "user.email=deploy@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn commit_file(repo: &Path, name: &str, contents: &str, message: &str) {
    std::fs::write(repo.join(name), contents).unwrap();
    git(repo, &["add", name]);
    git(repo, &["commit", "-m", message]);
}

/// A bare remote with one commit on `main`, a seed clone that pushes to it,
/// and a deployed clone
struct Fixture {
    root: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let fixture = Self { root };

        git(fixture.root.path(), &["init", "--bare", "remote.git"]);
        git(&fixture.remote(), &["symbolic-ref", "HEAD", "refs/heads/main"]);

        git(fixture.root.path(), &["init", "seed"]);
        git(&fixture.seed(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        commit_file(&fixture.seed(), "index.html", "v1\n", "Initial site");
        let remote = fixture.remote();
        git(
            &fixture.seed(),
            &["push", remote.to_str().unwrap(), "main"],
        );

        git(
            fixture.root.path(),
            &["clone", remote.to_str().unwrap(), "site"],
        );
        // Stash needs an identity in the deployed clone
        git(&fixture.site(), &["config", "user.name", "Deploy Test"]);
        git(&fixture.site(), &["config", "user.email", "deploy@example.com"]);

        fixture
    }

    fn remote(&self) -> std::path::PathBuf {
        self.root.path().join("remote.git")
    }

    fn seed(&self) -> std::path::PathBuf {
        self.root.path().join("seed")
    }

    fn site(&self) -> std::path::PathBuf {
        self.root.path().join("site")
    }

    fn push_update(&self, contents: &str, message: &str) {
        commit_file(&self.seed(), "index.html", contents, message);
        let remote = self.remote();
        git(&self.seed(), &["push", remote.to_str().unwrap(), "main"]);
    }

    fn executor(&self, branch: &str) -> DeploymentExecutor {
        let mut config = DeploymentConfig::new("secret", self.site(), branch);
        config.log_file = self.root.path().join("deploy.log");
        let journal = Arc::new(DeployJournal::new(&config.log_file));
        DeploymentExecutor::new(
            Arc::new(config),
            Arc::new(GitCommandRunner::new(Duration::from_secs(60))),
            journal,
        )
    }

    fn log(&self) -> String {
        std::fs::read_to_string(self.root.path().join("deploy.log")).unwrap_or_default()
    }
}

#[tokio::test]
async fn test_deploy_matches_remote_tip() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    fixture.push_update("v2\n", "Update opening hours");

    // Local edits and stray files in the deployed tree
    std::fs::write(fixture.site().join("index.html"), "hotfix\n").unwrap();
    std::fs::write(fixture.site().join("stray.txt"), "debug\n").unwrap();
    std::fs::create_dir(fixture.site().join("cache")).unwrap();
    std::fs::write(fixture.site().join("cache").join("page"), "old\n").unwrap();

    let report = fixture.executor("main").run().await.unwrap();

    let latest = report.latest_commit.unwrap();
    assert!(latest.contains("Update opening hours"), "{}", latest);
    assert!(latest.contains("Deploy Test"), "{}", latest);

    assert_eq!(
        std::fs::read_to_string(fixture.site().join("index.html")).unwrap(),
        "v2\n"
    );
    assert!(!fixture.site().join("stray.txt").exists());
    assert!(!fixture.site().join("cache").exists());
    assert_eq!(
        git(&fixture.site(), &["rev-parse", "HEAD"]),
        git(&fixture.remote(), &["rev-parse", "main"])
    );

    // The local edit was kept as a stash entry rather than discarded
    let stashes = git(&fixture.site(), &["stash", "list"]);
    assert!(stashes.contains("Auto-stash before webhook deployment"), "{}", stashes);

    let log = fixture.log();
    assert!(log.contains("INFO: Working directory has changes:"));
    assert!(log.contains("Git stash result: SUCCESS"));
    assert!(log.contains("Performing hard reset to origin/main..."));
}

#[tokio::test]
async fn test_repeated_deploy_is_idempotent() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    fixture.push_update("v2\n", "Second release");
    let executor = fixture.executor("main");

    let first = tokio_test::assert_ok!(executor.run().await);
    let second = tokio_test::assert_ok!(executor.run().await);

    assert_eq!(first.latest_commit, second.latest_commit);
    assert_eq!(
        git(&fixture.site(), &["rev-parse", "HEAD"]),
        git(&fixture.remote(), &["rev-parse", "main"])
    );
    // Nothing to stash on a clean tree: advisory only
    assert!(fixture.log().contains("Working directory is clean"));
}

#[tokio::test]
async fn test_missing_branch_leaves_tree_untouched() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    std::fs::write(fixture.site().join("index.html"), "hotfix\n").unwrap();

    let result = fixture.executor("release").run().await;

    assert_eq!(result.unwrap_err(), DeployFailure::FetchError);
    assert_eq!(
        std::fs::read_to_string(fixture.site().join("index.html")).unwrap(),
        "hotfix\n"
    );
    assert!(fixture.log().contains("ERROR: Git fetch failed:"));
}
