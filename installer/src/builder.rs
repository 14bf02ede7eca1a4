//! Cargo build orchestration for the cached checkout.
//!
//! The build always writes into the fixed `target/` directory under the cache
//! so the installer can find the artifact at a stable path, and incremental
//! compilation is forced on so that repeat installs only rebuild what the
//! last pull changed. Compiler output is passed straight through.

use crate::cancel::CancellationToken;
use crate::config::InstallConfig;
use crate::error::{InstallerError, Result};
use crate::process::{CommandExecutor, CommandSpec};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};

/// Configuration for the build process.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory containing the package's `Cargo.toml`.
    pub source_dir: Utf8PathBuf,
    /// Directory for build artifacts.
    pub target_dir: Utf8PathBuf,
    /// Package name expected in the manifest.
    pub package: String,
    /// Cargo verbosity level (number of `-v` flags).
    pub verbosity: u8,
}

impl BuildConfig {
    /// Derive the build configuration from the installer configuration.
    #[must_use]
    pub fn from_install_config(config: &InstallConfig, verbosity: u8) -> Self {
        Self {
            source_dir: config.cache_dir(),
            target_dir: config.target_dir(),
            package: config.project_name().to_owned(),
            verbosity,
        }
    }
}

/// Builder for compiling the cached checkout.
pub struct Builder<'a> {
    config: BuildConfig,
    executor: &'a dyn CommandExecutor,
}

impl<'a> Builder<'a> {
    /// Create a new builder with the given configuration.
    #[must_use]
    pub fn new(config: BuildConfig, executor: &'a dyn CommandExecutor) -> Self {
        Self { config, executor }
    }

    /// Run `cargo build --release` in the source directory.
    ///
    /// A non-zero exit is fatal and never retried.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Build`] if the manifest is missing or
    /// unparsable or cargo fails, or [`InstallerError::Interrupted`] on cancellation.
    pub fn build(&self, cancel: &CancellationToken) -> Result<()> {
        self.check_manifest()?;

        let command = self.command();
        let output = match self.executor.run(&command, cancel) {
            Ok(output) => output,
            Err(InstallerError::Interrupted) => return Err(InstallerError::Interrupted),
            Err(err) => {
                return Err(InstallerError::Build {
                    reason: format!("could not run `{command}`: {err}"),
                });
            }
        };

        if !output.status.success() {
            return Err(InstallerError::Build {
                reason: format!(
                    "cargo exited with {}; see the compiler output above",
                    output.status
                ),
            });
        }

        debug!("build finished; artifacts in {}", self.config.target_dir);
        Ok(())
    }

    /// The cargo invocation this builder runs.
    #[must_use]
    pub fn command(&self) -> CommandSpec {
        let mut args = vec!["build".to_owned(), "--release".to_owned()];
        args.extend((0..self.config.verbosity).map(|_| "-v".to_owned()));

        CommandSpec::new("cargo")
            .args(args)
            .current_dir(self.config.source_dir.clone())
            .env("CARGO_TARGET_DIR", self.config.target_dir.as_str())
            .env("CARGO_INCREMENTAL", "1")
            .inherit_stdio()
    }

    /// Confirm the checkout is a cargo package before invoking cargo.
    ///
    /// A package name that differs from the expected one only warns: the
    /// artifact lookup afterwards decides whether the build is usable.
    fn check_manifest(&self) -> Result<()> {
        let manifest_path = self.config.source_dir.join("Cargo.toml");
        let name =
            read_package_name(&manifest_path).map_err(|reason| InstallerError::Build { reason })?;

        match name {
            Some(name) if name == self.config.package => {}
            Some(name) => warn!(
                "{manifest_path} declares package `{name}`, expected `{}`",
                self.config.package
            ),
            None => debug!("{manifest_path} has no [package] name; assuming a workspace"),
        }
        Ok(())
    }
}

/// Read `package.name` from a manifest.
fn read_package_name(manifest_path: &Utf8Path) -> std::result::Result<Option<String>, String> {
    let contents = std::fs::read_to_string(manifest_path)
        .map_err(|e| format!("no readable Cargo.toml at {manifest_path}: {e}"))?;
    let manifest = contents
        .parse::<toml::Table>()
        .map_err(|e| format!("invalid Cargo.toml at {manifest_path}: {e}"))?;

    Ok(manifest
        .get("package")
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .map(str::to_owned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::StdioMode;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, success_output};
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    struct Checkout {
        _temp: TempDir,
        config: BuildConfig,
    }

    #[fixture]
    fn checkout() -> Checkout {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("non-UTF8 temp path");
        let config = BuildConfig {
            source_dir: root.clone(),
            target_dir: root.join("target"),
            package: "skatos".to_owned(),
            verbosity: 0,
        };
        Checkout {
            _temp: temp,
            config,
        }
    }

    fn write_manifest(dir: &Utf8Path, package_name: &str) {
        fs::write(
            dir.join("Cargo.toml"),
            format!("[package]\nname = \"{package_name}\"\nversion = \"0.1.0\"\n"),
        )
        .expect("failed to write Cargo.toml");
    }

    #[rstest]
    fn command_redirects_target_and_enables_incremental(checkout: Checkout) {
        let executor = StubExecutor::new(Vec::new());
        let command = Builder::new(checkout.config.clone(), &executor).command();

        assert_eq!(command.program, "cargo");
        assert_eq!(command.args, vec!["build", "--release"]);
        assert_eq!(command.current_dir.as_ref(), Some(&checkout.config.source_dir));
        assert!(command.envs.contains(&(
            "CARGO_TARGET_DIR".to_owned(),
            checkout.config.target_dir.to_string()
        )));
        assert!(
            command
                .envs
                .contains(&("CARGO_INCREMENTAL".to_owned(), "1".to_owned()))
        );
        assert_eq!(command.stdio, StdioMode::Inherit);
    }

    #[rstest]
    fn verbosity_is_forwarded_to_cargo(mut checkout: Checkout) {
        checkout.config.verbosity = 2;
        let executor = StubExecutor::new(Vec::new());
        let command = Builder::new(checkout.config.clone(), &executor).command();

        assert_eq!(command.args, vec!["build", "--release", "-v", "-v"]);
    }

    #[rstest]
    fn successful_build_returns_ok(checkout: Checkout) {
        write_manifest(&checkout.config.source_dir, "skatos");
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "cargo",
            &["build", "--release"],
            Ok(success_output()),
        )]);

        Builder::new(checkout.config.clone(), &executor)
            .build(&CancellationToken::new())
            .expect("build");

        executor.assert_finished();
    }

    #[rstest]
    fn failing_build_is_fatal(checkout: Checkout) {
        write_manifest(&checkout.config.source_dir, "skatos");
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "cargo",
            &["build", "--release"],
            Ok(failure_output("error[E0425]: cannot find value")),
        )]);

        let err = Builder::new(checkout.config.clone(), &executor)
            .build(&CancellationToken::new())
            .expect_err("expected build failure");

        assert!(matches!(err, InstallerError::Build { ref reason } if reason.contains("exit")));
        executor.assert_finished();
    }

    #[rstest]
    fn missing_manifest_stops_before_cargo(checkout: Checkout) {
        let executor = StubExecutor::new(Vec::new());

        let err = Builder::new(checkout.config.clone(), &executor)
            .build(&CancellationToken::new())
            .expect_err("expected manifest failure");

        assert!(
            matches!(err, InstallerError::Build { ref reason } if reason.contains("Cargo.toml"))
        );
        assert!(executor.invocations().is_empty());
    }

    #[rstest]
    fn unexpected_package_name_still_builds(checkout: Checkout) {
        write_manifest(&checkout.config.source_dir, "something-else");
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "cargo",
            &["build", "--release"],
            Ok(success_output()),
        )]);

        Builder::new(checkout.config.clone(), &executor)
            .build(&CancellationToken::new())
            .expect("build");
    }

    #[rstest]
    fn cargo_that_cannot_start_is_a_build_error(checkout: Checkout) {
        write_manifest(&checkout.config.source_dir, "skatos");
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "cargo",
            &["build", "--release"],
            Err(std::io::Error::from(std::io::ErrorKind::NotFound).into()),
        )]);

        let err = Builder::new(checkout.config.clone(), &executor)
            .build(&CancellationToken::new())
            .expect_err("expected build failure");

        assert!(
            matches!(err, InstallerError::Build { ref reason } if reason.contains("could not run"))
        );
    }

    #[rstest]
    fn interruption_is_not_reported_as_a_build_failure(checkout: Checkout) {
        write_manifest(&checkout.config.source_dir, "skatos");
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "cargo",
            &["build", "--release"],
            Err(InstallerError::Interrupted),
        )]);

        let err = Builder::new(checkout.config.clone(), &executor)
            .build(&CancellationToken::new())
            .expect_err("expected interruption");

        assert!(err.is_interrupted());
    }

    #[test]
    fn read_package_name_handles_workspace_manifests() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("non-UTF8 temp path");
        fs::write(root.join("Cargo.toml"), "[workspace]\nmembers = [\"cli\"]\n").expect("write");

        assert_eq!(read_package_name(&root.join("Cargo.toml")), Ok(None));
    }
}
