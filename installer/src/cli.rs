//! CLI argument definitions for the skatos installer.
//!
//! Every flag is optional: with no arguments the installer uses the fixed
//! default repository, install directory, and cache location.

use camino::Utf8PathBuf;
use clap::Parser;

/// Build and install the skatos CLI from source.
#[derive(Parser, Debug, Clone)]
#[command(name = "skatos-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build and install the skatos CLI from source.\n\n",
    "The installer clones the skatos repository into a persistent cache on the ",
    "first run and fast-forwards it on later runs, builds it in release mode ",
    "with incremental compilation, and copies the binary into ~/.local/bin.\n\n",
    "The cache is never deleted, so repeat installs only rebuild what changed.",
))]
#[command(after_help = concat!(
    "REQUIREMENTS:\n",
    "  git      Required to fetch the source\n",
    "  cargo    Required to build the source\n",
    "  skate    Needed by skatos at run time (warning only)\n\n",
    "EXAMPLES:\n",
    "  Install or update skatos:\n",
    "    $ skatos-installer\n\n",
    "  Preview the plan without touching anything:\n",
    "    $ skatos-installer --dry-run\n\n",
    "  Install into a custom directory:\n",
    "    $ skatos-installer --install-dir /opt/tools/bin",
))]
pub struct Cli {
    /// Git URL of the skatos repository.
    #[arg(long, value_name = "URL")]
    pub repo_url: Option<String>,

    /// Directory receiving the installed binary [default: ~/.local/bin].
    #[arg(short, long, value_name = "DIR")]
    pub install_dir: Option<Utf8PathBuf>,

    /// Cache root holding the source checkout and build output
    /// [default: platform cache directory].
    #[arg(short, long, value_name = "DIR")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Show the resolved configuration and planned actions, then exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase output verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Default for Cli {
    /// Creates a `Cli` equivalent to running with no arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use skatos_installer::cli::Cli;
    ///
    /// let cli = Cli::default();
    /// assert!(cli.repo_url.is_none());
    /// assert!(!cli.dry_run);
    /// ```
    fn default() -> Self {
        Self {
            repo_url: None,
            install_dir: None,
            cache_dir: None,
            dry_run: false,
            verbosity: 0,
            quiet: false,
        }
    }
}
