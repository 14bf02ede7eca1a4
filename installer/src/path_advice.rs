//! Search-path advice for the install directory.
//!
//! Purely advisory: nothing here writes to a shell profile or fails the run.

use camino::Utf8Path;
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;

/// Shells with known profile snippets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    /// GNU Bash.
    Bash,
    /// Z shell.
    Zsh,
    /// Friendly interactive shell.
    Fish,
}

impl Shell {
    const ALL: [Self; 3] = [Self::Bash, Self::Zsh, Self::Fish];

    /// Recognise a shell from the value of `$SHELL` (e.g. `/usr/bin/zsh`).
    #[must_use]
    pub fn from_shell_var(value: &OsStr) -> Option<Self> {
        let name = Path::new(value).file_name()?.to_str()?;
        match name {
            "bash" => Some(Self::Bash),
            "zsh" => Some(Self::Zsh),
            "fish" => Some(Self::Fish),
            _ => None,
        }
    }

    /// Profile file the snippet belongs in.
    #[must_use]
    pub fn profile(self) -> &'static str {
        match self {
            Self::Bash => "~/.bashrc",
            Self::Zsh => "~/.zshrc",
            Self::Fish => "~/.config/fish/config.fish",
        }
    }

    fn snippet(self, dir: &Utf8Path) -> String {
        match self {
            Self::Bash | Self::Zsh => format!("export PATH=\"{dir}:$PATH\""),
            Self::Fish => format!("fish_add_path {dir}"),
        }
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bash => "bash",
            Self::Zsh => "zsh",
            Self::Fish => "fish",
        };
        f.write_str(name)
    }
}

/// Whether the install directory is reachable through `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathAdvice {
    /// The directory is already on the search path.
    OnPath,
    /// The directory is missing; `guidance` explains how to add it.
    Missing {
        /// Multi-line instructions for the user.
        guidance: String,
    },
}

impl PathAdvice {
    /// Returns `true` when no action is needed.
    #[must_use]
    pub fn is_on_path(&self) -> bool {
        matches!(self, Self::OnPath)
    }
}

/// Decide whether `install_dir` is on `search_path`.
///
/// `search_path` is the raw `PATH` value and `shell` the raw `$SHELL` value.
/// A recognised shell has its snippet listed first.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use skatos_installer::path_advice::{PathAdvice, advise};
/// use std::ffi::OsStr;
///
/// let advice = advise(
///     Utf8Path::new("/home/me/.local/bin"),
///     Some(OsStr::new("/usr/bin:/home/me/.local/bin/")),
///     None,
/// );
/// assert_eq!(advice, PathAdvice::OnPath);
/// ```
#[must_use]
pub fn advise(install_dir: &Utf8Path, search_path: Option<&OsStr>, shell: Option<&OsStr>) -> PathAdvice {
    if is_directory_in_path(install_dir.as_std_path(), search_path) {
        return PathAdvice::OnPath;
    }

    let preferred = shell.and_then(Shell::from_shell_var);
    PathAdvice::Missing {
        guidance: path_instructions(install_dir, preferred),
    }
}

/// `Path` equality compares components, so trailing separators are ignored.
fn is_directory_in_path(dir: &Path, search_path: Option<&OsStr>) -> bool {
    search_path
        .map(|path| std::env::split_paths(path).any(|entry| entry == dir))
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn path_instructions(dir: &Utf8Path, preferred: Option<Shell>) -> String {
    let mut shells: Vec<Shell> = preferred.into_iter().collect();
    shells.extend(Shell::ALL.into_iter().filter(|s| Some(*s) != preferred));

    let mut text = format!("{dir} is not on your PATH. To run skatos by name, add it:");
    for shell in shells {
        text.push_str(&format!(
            "\n  {shell} ({}):\n    {}",
            shell.profile(),
            shell.snippet(dir)
        ));
    }
    text.push_str("\nThen open a new terminal.");
    text
}

#[cfg(windows)]
fn path_instructions(dir: &Utf8Path, _preferred: Option<Shell>) -> String {
    format!(
        concat!(
            "{dir} is not on your PATH. Run in PowerShell:\n",
            "  [Environment]::SetEnvironmentVariable(",
            "\"PATH\", \"$env:PATH;{dir}\", \"User\")"
        ),
        dir = dir
    )
}
