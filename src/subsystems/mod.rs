//! Subsystem installers.
//!
//! Every subsystem follows the same contract: a side-effect-free
//! [`is_available`](Subsystem::is_available) probe, then an idempotent
//! [`install`](Subsystem::install) that short-circuits (after benign PATH
//! fix-ups) when the subsystem is already present.
//!
//! - [`brew`] - Homebrew bootstrap
//! - [`shell`] - the user's preferred shell
//! - [`gpg`] - GnuPG and signing key provisioning
//! - [`dotfiles`] - the dotfiles engine (chezmoi)

pub mod brew;
pub mod dotfiles;
pub mod gpg;
pub mod shell;

pub use brew::{BrewBootstrap, BrewLayout};
pub use dotfiles::{DotfilesEngine, DotfilesUserData};
pub use gpg::{GpgInstaller, GpgKey, GpgKeys};
pub use shell::ShellInstaller;

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::PackageMap;
use crate::error::{DotstrapError, Result};
use crate::host::HostInfo;
use crate::net::Fetcher;
use crate::packages::{
    create_manager, ManagerKind, ManagerRuntime, PackageRequest, PackageResolver,
};
use crate::shell::{CommandOutput, CommandSpec, PathEnv};
use crate::ui::UserInterface;

/// Lifecycle of one subsystem within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubsystemState {
    #[default]
    Unknown,
    Available,
    Missing,
    Installing,
    Installed,
    Failed,
}

impl SubsystemState {
    /// `Installed` and `Failed` never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Installed | Self::Failed)
    }

    /// Move to `next` unless already terminal. Returns whether the state changed.
    pub fn advance(&mut self, next: SubsystemState) -> bool {
        if self.is_terminal() {
            tracing::debug!("Ignoring {:?} -> {:?}: state is terminal", self, next);
            return false;
        }
        *self = next;
        true
    }

    /// Settle into `Installed` or `Failed` from an install outcome.
    pub fn settle<T>(&mut self, outcome: &Result<T>) {
        let next = if outcome.is_ok() {
            Self::Installed
        } else {
            Self::Failed
        };
        self.advance(next);
    }
}

impl fmt::Display for SubsystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Available => "available",
            Self::Missing => "missing",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The check-then-install contract shared by every subsystem.
pub trait Subsystem {
    /// Short name used in messages and errors.
    fn name(&self) -> &'static str;

    /// Current lifecycle state.
    fn state(&self) -> SubsystemState;

    /// Probe without side effects on the host.
    fn is_available(&self) -> Result<bool>;

    /// Install when missing. Safe to call when already available.
    fn install(&mut self, ui: &mut dyn UserInterface) -> Result<()>;
}

/// User directories the installers write under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDirs {
    pub home: PathBuf,
}

impl UserDirs {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// The current user's home directory.
    pub fn detect() -> Result<Self> {
        dirs::home_dir().map(Self::new).ok_or_else(|| DotstrapError::Detection {
            message: "cannot determine the home directory".to_string(),
        })
    }

    /// `$HOME/.local/bin`.
    pub fn local_bin(&self) -> PathBuf {
        self.home.join(".local").join("bin")
    }

    /// `$HOME/.config`, regardless of `XDG_CONFIG_HOME`.
    pub fn config_home(&self) -> PathBuf {
        self.home.join(".config")
    }

    /// `$HOME/.local/share`.
    pub fn data_home(&self) -> PathBuf {
        self.home.join(".local").join("share")
    }
}

/// Collaborators shared by the installers of one run.
#[derive(Clone)]
pub struct SubsystemContext<'a> {
    pub host: &'a HostInfo,
    pub map: &'a PackageMap,
    pub runtime: ManagerRuntime,
    pub path: Arc<dyn PathEnv>,
    pub fetcher: Arc<dyn Fetcher>,
    pub dirs: UserDirs,
}

impl<'a> SubsystemContext<'a> {
    /// The system package manager for this host, if supported.
    pub fn manager_kind(&self) -> Option<ManagerKind> {
        ManagerKind::for_host(self.host)
    }

    /// Resolve `code` for this host's package manager.
    pub fn resolve(&self, subsystem: &str, code: &str) -> Result<(ManagerKind, PackageRequest)> {
        let kind = self.manager_kind().ok_or_else(|| {
            DotstrapError::subsystem(
                subsystem,
                format!("no package manager available on {}", self.host.describe()),
            )
        })?;
        let request = PackageResolver::new(self.map, kind, &self.host.distro).resolve(code, "")?;
        Ok((kind, request))
    }

    /// Install a resolved request with the manager `kind`.
    pub fn install_request(&self, kind: ManagerKind, request: &PackageRequest) -> Result<()> {
        tracing::info!("Installing {} via {}", request.name, kind);
        create_manager(kind, self.runtime.clone()).install_package(request)
    }

    /// Resolve `code` and install it with the system package manager.
    pub fn install_package(&self, subsystem: &str, code: &str) -> Result<()> {
        let (kind, request) = self.resolve(subsystem, code)?;
        self.install_request(kind, &request)
    }

    /// Run a command with the run's display mode and timeout, failing on non-zero exit.
    pub fn run(&self, spec: CommandSpec) -> Result<CommandOutput> {
        let spec = self.with_timeout(spec.display(self.runtime.display));
        self.runtime.commander.run_checked(&spec)
    }

    /// Run a command capturing stdout. A non-zero exit is not an error.
    pub fn capture(&self, spec: CommandSpec) -> Result<CommandOutput> {
        let spec = self.with_timeout(spec.captured());
        self.runtime.commander.run(&spec)
    }

    fn with_timeout(&self, spec: CommandSpec) -> CommandSpec {
        match self.runtime.timeout {
            Some(timeout) => spec.timeout(timeout),
            None => spec,
        }
    }

    /// Resolve a binary on PATH.
    pub fn which(&self, tool: &str) -> Option<PathBuf> {
        self.path.which(tool)
    }

    /// Prepend `dir` to PATH (deduplicated).
    pub fn prepend_path(&self, dir: &Path) -> bool {
        self.path.prepend(dir)
    }
}

/// Turn a failed external command into a subsystem error. Other errors pass through.
pub(crate) fn command_failure(subsystem: &str, err: DotstrapError) -> DotstrapError {
    match err {
        DotstrapError::PackageManager { .. } => DotstrapError::subsystem(subsystem, err.to_string()),
        other => other,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by installer tests.

    use super::*;
    use crate::host::Os;
    use crate::net::MemoryFetcher;
    use crate::shell::{DisplayMode, Escalation, MemoryPath, RecordingCommander};

    pub const MAP: &str = r#"
packages:
  gpg:
    apt:
      name: gnupg2
    brew:
      name: gnupg
    dnf:
      name: gnupg2
  zsh:
    apt:
      name: zsh
    brew:
      name: zsh
  chezmoi:
    apt:
      name: chezmoi
    brew:
      name: chezmoi
"#;

    pub struct Fixture {
        pub host: HostInfo,
        pub map: PackageMap,
        pub commander: Arc<RecordingCommander>,
        pub path: Arc<MemoryPath>,
        pub fetcher: Arc<MemoryFetcher>,
        pub home: tempfile::TempDir,
    }

    impl Fixture {
        pub fn new(os: Os, distro: &str) -> Self {
            Self {
                host: HostInfo::new(os, distro, "amd64"),
                map: PackageMap::from_yaml(MAP).unwrap(),
                commander: Arc::new(RecordingCommander::new()),
                path: Arc::new(MemoryPath::new(["/nonexistent/usr/bin", "/nonexistent/bin"])),
                fetcher: Arc::new(MemoryFetcher::new()),
                home: tempfile::TempDir::new().unwrap(),
            }
        }

        pub fn context(&self) -> SubsystemContext<'_> {
            SubsystemContext {
                host: &self.host,
                map: &self.map,
                runtime: ManagerRuntime::new(
                    self.commander.clone(),
                    Escalation::Sudo,
                    DisplayMode::Plain,
                ),
                path: self.path.clone(),
                fetcher: self.fetcher.clone(),
                dirs: UserDirs::new(self.home.path()),
            }
        }

        /// Put an executable named `name` in a PATH directory.
        pub fn install_binary(&self, name: &str) -> PathBuf {
            let dir = self.home.path().join("bin");
            let path = write_executable(&dir, name);
            self.path.prepend(&dir);
            path
        }
    }

    pub fn write_executable(dir: &Path, name: &str) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_do_not_change() {
        let mut state = SubsystemState::Unknown;
        assert!(state.advance(SubsystemState::Missing));
        assert!(state.advance(SubsystemState::Installing));
        assert!(state.advance(SubsystemState::Installed));
        assert!(!state.advance(SubsystemState::Failed));
        assert_eq!(state, SubsystemState::Installed);
    }

    #[test]
    fn settle_maps_outcomes() {
        let mut ok = SubsystemState::Installing;
        ok.settle(&Ok::<(), DotstrapError>(()));
        assert_eq!(ok, SubsystemState::Installed);

        let mut failed = SubsystemState::Installing;
        failed.settle(&Err::<(), _>(DotstrapError::UserCancelled));
        assert_eq!(failed, SubsystemState::Failed);
    }

    #[test]
    fn user_dirs_layout() {
        let dirs = UserDirs::new("/home/jane");
        assert_eq!(dirs.local_bin(), PathBuf::from("/home/jane/.local/bin"));
        assert_eq!(dirs.config_home(), PathBuf::from("/home/jane/.config"));
        assert_eq!(dirs.data_home(), PathBuf::from("/home/jane/.local/share"));
    }
}
