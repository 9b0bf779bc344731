//! Package managers and package resolution.
//!
//! - [`resolver`] - package code → [`PackageRequest`]
//! - [`constraint`] - semver range parsing
//! - [`apt`], [`brew`], [`dnf`] - [`PackageManager`] adapters
//!
//! Adapters own their command construction. Apt and dnf escalate with
//! `sudo` when not already root; brew never does. Version constraints are
//! not enforced: a constrained request logs a warning and installs the
//! latest version.

pub mod apt;
pub mod brew;
pub mod constraint;
pub mod dnf;
pub mod resolver;

pub use apt::AptManager;
pub use brew::BrewManager;
pub use constraint::VersionConstraint;
pub use dnf::DnfManager;
pub use resolver::PackageResolver;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PackageKind;
use crate::error::Result;
use crate::host::HostInfo;
use crate::shell::{CommandSpec, Commander, DisplayMode, Escalation};

/// A concrete package to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    pub name: String,
    pub kind: PackageKind,
    /// None means "latest acceptable".
    pub constraint: Option<VersionConstraint>,
}

impl PackageRequest {
    /// A regular package with no constraint.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: PackageKind::Regular,
            constraint: None,
        }
    }
}

/// An installed package as reported by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
}

/// Self-description of a package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerInfo {
    pub name: String,
    pub version: String,
}

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerKind {
    Apt,
    Brew,
    Dnf,
}

impl ManagerKind {
    /// Key used in the package map.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Brew => "brew",
            Self::Dnf => "dnf",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "apt" => Some(Self::Apt),
            "brew" => Some(Self::Brew),
            "dnf" => Some(Self::Dnf),
            _ => None,
        }
    }

    /// The system package manager for a host, if supported.
    pub fn for_host(host: &HostInfo) -> Option<Self> {
        if host.is_darwin() {
            return Some(Self::Brew);
        }
        if !host.is_linux() {
            return None;
        }
        match host.distro.as_str() {
            "ubuntu" | "debian" => Some(Self::Apt),
            "fedora" | "centos" | "rhel" => Some(Self::Dnf),
            _ => None,
        }
    }
}

impl fmt::Display for ManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform interface over system package managers.
pub trait PackageManager {
    fn kind(&self) -> ManagerKind;

    /// Name and version of the manager itself.
    fn info(&self) -> Result<ManagerInfo>;

    fn install_package(&self, request: &PackageRequest) -> Result<()>;

    fn uninstall_package(&self, request: &PackageRequest) -> Result<()>;

    fn is_package_installed(&self, request: &PackageRequest) -> Result<bool>;

    fn list_installed_packages(&self) -> Result<Vec<InstalledPackage>>;

    /// Installed version of a package, None if not installed.
    fn package_version(&self, name: &str) -> Result<Option<String>>;
}

/// Collaborators shared by every adapter.
#[derive(Clone)]
pub struct ManagerRuntime {
    pub commander: Arc<dyn Commander>,
    pub escalation: Escalation,
    pub display: DisplayMode,
    pub timeout: Option<Duration>,
}

impl ManagerRuntime {
    pub fn new(commander: Arc<dyn Commander>, escalation: Escalation, display: DisplayMode) -> Self {
        Self {
            commander,
            escalation,
            display,
            timeout: None,
        }
    }

    /// Run a mutating command (install/uninstall) honoring display and timeout.
    fn run_mutation(&self, spec: CommandSpec, escalate: bool) -> Result<()> {
        let mut spec = spec.display(self.display);
        if let Some(timeout) = self.timeout {
            spec = spec.timeout(timeout);
        }
        if escalate {
            spec = self.escalation.apply(spec);
        }
        self.commander.run_checked(&spec).map(|_| ())
    }

    /// Run a read-only query with captured stdout.
    fn query(&self, spec: CommandSpec) -> Result<crate::shell::CommandOutput> {
        let mut spec = spec.captured();
        if let Some(timeout) = self.timeout {
            spec = spec.timeout(timeout);
        }
        self.commander.run(&spec)
    }

    /// `<binary> --version`, first line.
    fn version_of(&self, kind: ManagerKind, binary: &str) -> Result<ManagerInfo> {
        let spec = CommandSpec::new(binary, ["--version"]);
        let output = self.query(spec.clone())?.into_checked(&spec)?;
        Ok(ManagerInfo {
            name: kind.as_str().to_string(),
            version: output.stdout.lines().next().unwrap_or("").trim().to_string(),
        })
    }
}

/// Log that a constraint cannot be honored; the latest version is installed.
fn warn_unenforced(kind: ManagerKind, request: &PackageRequest) {
    if let Some(constraint) = &request.constraint {
        tracing::warn!(
            "{} cannot pin versions; installing latest {} (requested {})",
            kind,
            request.name,
            constraint
        );
    }
}

/// Parse `name version` lines.
fn parse_name_version_lines(stdout: &str) -> Vec<InstalledPackage> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let version = parts.next().unwrap_or("");
            Some(InstalledPackage {
                name: name.to_string(),
                version: version.to_string(),
            })
        })
        .collect()
}

/// Build the adapter for `kind`.
pub fn create_manager(kind: ManagerKind, runtime: ManagerRuntime) -> Box<dyn PackageManager> {
    match kind {
        ManagerKind::Apt => Box::new(AptManager::new(runtime)),
        ManagerKind::Brew => Box::new(BrewManager::new(runtime)),
        ManagerKind::Dnf => Box::new(DnfManager::new(runtime)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Os;

    #[test]
    fn selects_manager_per_host() {
        let cases = [
            (Os::Linux, "ubuntu", Some(ManagerKind::Apt)),
            (Os::Linux, "debian", Some(ManagerKind::Apt)),
            (Os::Linux, "fedora", Some(ManagerKind::Dnf)),
            (Os::Linux, "centos", Some(ManagerKind::Dnf)),
            (Os::Linux, "rhel", Some(ManagerKind::Dnf)),
            (Os::Linux, "arch", None),
            (Os::Darwin, "", Some(ManagerKind::Brew)),
            (Os::Other("windows".into()), "", None),
        ];
        for (os, distro, expected) in cases {
            let host = HostInfo::new(os, distro, "amd64");
            assert_eq!(ManagerKind::for_host(&host), expected, "{}", host.describe());
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in [ManagerKind::Apt, ManagerKind::Brew, ManagerKind::Dnf] {
            assert_eq!(ManagerKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ManagerKind::from_name("pacman"), None);
    }

    #[test]
    fn parses_name_version_lines() {
        let parsed = parse_name_version_lines("git 1:2.43.0-1\nzsh 5.9\n\nlonely\n");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].version, "1:2.43.0-1");
        assert_eq!(parsed[2].name, "lonely");
        assert_eq!(parsed[2].version, "");
    }
}
