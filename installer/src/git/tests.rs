//! Tests for source synchronisation against a scripted git.

use super::*;
use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, stdout_output, success_output};
use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use std::fs;
use tempfile::TempDir;

const URL: &str = "https://example.invalid/skatos.git";

struct Sandbox {
    _temp: TempDir,
    config: InstallConfig,
}

impl Sandbox {
    fn cache_dir(&self) -> Utf8PathBuf {
        self.config.cache_dir()
    }
}

#[fixture]
fn sandbox() -> Sandbox {
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("non-UTF8 temp path");
    let config = InstallConfig::new(URL, root.join("bin"), root.join("cache"), "skatos")
        .expect("config");
    Sandbox {
        _temp: temp,
        config,
    }
}

impl Sandbox {
    fn staging_dir(&self) -> Utf8PathBuf {
        self.config.clone_staging_dir()
    }
}

fn clone_args(sandbox: &Sandbox) -> Vec<String> {
    ["clone", "--", URL, sandbox.staging_dir().as_str()]
        .map(str::to_owned)
        .to_vec()
}

fn clone_with(sandbox: &Sandbox, result: Result<std::process::Output>) -> ExpectedCall {
    let args = clone_args(sandbox);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    ExpectedCall::new("git", &args, result)
}

fn clone_call(sandbox: &Sandbox) -> ExpectedCall {
    let git_dir = sandbox.staging_dir().join(".git");
    clone_with(sandbox, Ok(success_output()))
        .with_effect(move || fs::create_dir_all(git_dir).expect("fake clone"))
}

fn origin_call(url: &str) -> ExpectedCall {
    ExpectedCall::new(
        "git",
        &["remote", "get-url", "origin"],
        Ok(stdout_output(&format!("{url}\n"))),
    )
}

#[rstest]
fn absent_cache_is_cloned(sandbox: Sandbox) {
    let executor = StubExecutor::new(vec![clone_call(&sandbox)]);

    let outcome = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&CancellationToken::new())
        .expect("sync");

    assert_eq!(outcome, SyncOutcome::Cloned);
    assert_eq!(inspect(&sandbox.cache_dir()), RepositoryState::Versioned);
    executor.assert_finished();
}

#[rstest]
fn versioned_cache_without_changes_is_up_to_date(sandbox: Sandbox) {
    fs::create_dir_all(sandbox.cache_dir().join(".git")).expect("mkdir");
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("git", &["rev-parse", "HEAD"], Ok(stdout_output("abc123\n"))),
        origin_call(URL),
        ExpectedCall::new("git", &["pull", "--ff-only"], Ok(stdout_output("Already up to date.\n"))),
        ExpectedCall::new("git", &["rev-parse", "HEAD"], Ok(stdout_output("abc123\n"))),
    ]);

    let outcome = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&CancellationToken::new())
        .expect("sync");

    assert_eq!(
        outcome,
        SyncOutcome::UpToDate {
            head: "abc123".to_owned()
        }
    );
    assert!(outcome.to_string().contains("already up to date"));
    executor.assert_finished();
}

#[rstest]
fn versioned_cache_with_upstream_changes_is_updated(sandbox: Sandbox) {
    fs::create_dir_all(sandbox.cache_dir().join(".git")).expect("mkdir");
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("git", &["rev-parse", "HEAD"], Ok(stdout_output("aaa\n"))),
        origin_call(URL),
        ExpectedCall::new("git", &["pull", "--ff-only"], Ok(success_output())),
        ExpectedCall::new("git", &["rev-parse", "HEAD"], Ok(stdout_output("bbb\n"))),
    ]);

    let outcome = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&CancellationToken::new())
        .expect("sync");

    assert_eq!(
        outcome,
        SyncOutcome::Updated {
            from: "aaa".to_owned(),
            to: "bbb".to_owned()
        }
    );
}

#[rstest]
fn diverged_history_fails_without_reset(sandbox: Sandbox) {
    fs::create_dir_all(sandbox.cache_dir().join(".git")).expect("mkdir");
    fs::write(sandbox.cache_dir().join("local-change.txt"), "keep me").expect("write");
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("git", &["rev-parse", "HEAD"], Ok(stdout_output("aaa\n"))),
        origin_call(&format!("{URL}/")),
        ExpectedCall::new(
            "git",
            &["pull", "--ff-only"],
            Ok(failure_output("fatal: Not possible to fast-forward, aborting.\n")),
        ),
    ]);

    let err = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&CancellationToken::new())
        .expect_err("expected sync failure");

    assert!(matches!(
        err,
        InstallerError::SourceSync { operation: "pull", ref message }
            if message == "fatal: Not possible to fast-forward, aborting."
    ));
    assert!(sandbox.cache_dir().join("local-change.txt").exists());
    executor.assert_finished();
}

#[rstest]
fn corrupted_cache_is_deleted_and_recloned(sandbox: Sandbox) {
    fs::create_dir_all(sandbox.cache_dir()).expect("mkdir");
    fs::write(sandbox.cache_dir().join("partial"), "half a clone").expect("write");
    let executor = StubExecutor::new(vec![clone_call(&sandbox)]);

    let outcome = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&CancellationToken::new())
        .expect("sync");

    assert_eq!(outcome, SyncOutcome::Recloned);
    assert!(!sandbox.cache_dir().join("partial").exists());
    assert_eq!(inspect(&sandbox.cache_dir()), RepositoryState::Versioned);
    executor.assert_finished();
}

#[rstest]
fn checkout_without_head_is_recloned(sandbox: Sandbox) {
    fs::create_dir_all(sandbox.cache_dir().join(".git")).expect("mkdir");
    fs::write(sandbox.cache_dir().join("stale"), "").expect("write");
    let executor = StubExecutor::new(vec![
        ExpectedCall::new(
            "git",
            &["rev-parse", "HEAD"],
            Ok(failure_output("fatal: ambiguous argument 'HEAD'")),
        ),
        clone_call(&sandbox),
    ]);

    let outcome = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&CancellationToken::new())
        .expect("sync");

    assert_eq!(outcome, SyncOutcome::Recloned);
    assert!(!sandbox.cache_dir().join("stale").exists());
    executor.assert_finished();
}

#[rstest]
fn clone_failure_reports_git_stderr(sandbox: Sandbox) {
    let executor = StubExecutor::new(vec![clone_with(
        &sandbox,
        Ok(failure_output("fatal: unable to access: Could not resolve host\n")),
    )]);

    let err = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&CancellationToken::new())
        .expect_err("expected clone failure");

    assert!(matches!(
        err,
        InstallerError::SourceSync { operation: "clone", ref message }
            if message.contains("Could not resolve host")
    ));
}

#[rstest]
fn interrupted_clone_leaves_no_checkout_behind(sandbox: Sandbox) {
    let staging = sandbox.staging_dir();
    let executor = StubExecutor::new(vec![
        clone_with(&sandbox, Err(InstallerError::Interrupted)).with_effect(move || {
            fs::create_dir_all(staging.join(".git")).expect("partial clone");
            fs::write(staging.join("README.md"), "half").expect("partial file");
        }),
    ]);

    let err = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&CancellationToken::new())
        .expect_err("expected interruption");

    assert!(err.is_interrupted());
    assert_eq!(inspect(&sandbox.cache_dir()), RepositoryState::Absent);
    assert!(!sandbox.staging_dir().exists());
}

#[rstest]
fn leftover_partial_clone_is_cleared_before_cloning(sandbox: Sandbox) {
    let leftover = sandbox.staging_dir().join("left-by-a-killed-clone");
    fs::create_dir_all(sandbox.staging_dir().join(".git")).expect("mkdir");
    fs::write(&leftover, "").expect("write");
    let observed = leftover.clone();
    let git_dir = sandbox.staging_dir().join(".git");
    let executor = StubExecutor::new(vec![clone_with(&sandbox, Ok(success_output())).with_effect(
        move || {
            assert!(!observed.exists(), "leftover clone was not cleared");
            fs::create_dir_all(git_dir).expect("fake clone");
        },
    )]);

    let outcome = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&CancellationToken::new())
        .expect("sync");

    assert_eq!(outcome, SyncOutcome::Cloned);
    assert!(!sandbox.staging_dir().exists());
    assert!(!sandbox.cache_dir().join("left-by-a-killed-clone").exists());
}

#[rstest]
#[case::other_repository(Ok(stdout_output("https://example.invalid/fork.git\n")))]
#[case::no_origin(Ok(failure_output("error: No such remote 'origin'")))]
fn checkout_of_another_origin_is_recloned(
    sandbox: Sandbox,
    #[case] origin: Result<std::process::Output>,
) {
    fs::create_dir_all(sandbox.cache_dir().join(".git")).expect("mkdir");
    fs::write(sandbox.cache_dir().join("FORK.md"), "").expect("write");
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("git", &["rev-parse", "HEAD"], Ok(stdout_output("aaa\n"))),
        ExpectedCall::new("git", &["remote", "get-url", "origin"], origin),
        clone_call(&sandbox),
    ]);

    let outcome = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&CancellationToken::new())
        .expect("sync");

    assert_eq!(outcome, SyncOutcome::Recloned);
    assert!(!sandbox.cache_dir().join("FORK.md").exists());
    assert_eq!(inspect(&sandbox.cache_dir()), RepositoryState::Versioned);
    executor.assert_finished();
}

#[rstest]
fn failed_reclone_keeps_the_previous_checkout(sandbox: Sandbox) {
    fs::create_dir_all(sandbox.cache_dir().join(".git")).expect("mkdir");
    fs::write(sandbox.cache_dir().join("Cargo.toml"), "").expect("write");
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("git", &["rev-parse", "HEAD"], Ok(stdout_output("aaa\n"))),
        origin_call("https://example.invalid/fork.git"),
        clone_with(&sandbox, Ok(failure_output("fatal: repository not found"))),
    ]);

    let err = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&CancellationToken::new())
        .expect_err("expected clone failure");

    assert!(matches!(err, InstallerError::SourceSync { operation: "clone", .. }));
    assert!(sandbox.cache_dir().join("Cargo.toml").exists());
}

#[rstest]
fn unusable_cache_root_is_a_clone_error(sandbox: Sandbox) {
    fs::write(sandbox.config.cache_root(), "not a directory").expect("write");
    let executor = StubExecutor::new(Vec::new());

    let err = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&CancellationToken::new())
        .expect_err("expected failure");

    assert!(matches!(
        err,
        InstallerError::SourceSync { operation: "clone", ref message } if message.contains("prepare")
    ));
    assert!(executor.invocations().is_empty());
}

#[rstest]
fn option_like_url_is_passed_after_separator(sandbox: Sandbox) {
    let url = "--upload-pack=touch /tmp/owned";
    let config = InstallConfig::new(
        url,
        sandbox.config.install_dir().to_owned(),
        sandbox.config.cache_root().to_owned(),
        "skatos",
    )
    .expect("config");
    let staging = config.clone_staging_dir();
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "git",
        &["clone", "--", url, staging.as_str()],
        Ok(failure_output("fatal: repository '--upload-pack=touch /tmp/owned' does not exist")),
    )]);

    let err = SourceSynchronizer::new(&config, &executor)
        .sync(&CancellationToken::new())
        .expect_err("expected clone failure");

    assert!(matches!(err, InstallerError::SourceSync { operation: "clone", .. }));
    executor.assert_finished();
}

#[rstest]
fn cancellation_is_not_wrapped_as_sync_error(sandbox: Sandbox) {
    let executor = StubExecutor::new(Vec::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = SourceSynchronizer::new(&sandbox.config, &executor)
        .sync(&cancel)
        .expect_err("expected interruption");

    assert!(err.is_interrupted());
}

#[test]
fn sync_outcome_display_shortens_commits() {
    let outcome = SyncOutcome::Updated {
        from: "0123456789abcdef0123".to_owned(),
        to: "fedcba9876543210fedc".to_owned(),
    };
    assert_eq!(outcome.to_string(), "updated 0123456789ab..fedcba987654");
}
