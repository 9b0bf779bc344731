//! Host detection.
//!
//! [`HostProbe`] builds the [`HostInfo`] record once per run: operating
//! system, distribution, architecture and the availability of every
//! prerequisite declared in the compatibility policy. Later steps only read
//! it; a fresh probe is taken when the host changes.

pub mod distro;
pub mod probe;

pub use probe::{Detector, HostProbe, SequenceDetector};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Operating system family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Os {
    Linux,
    Darwin,
    Other(String),
}

impl Os {
    /// Map a Rust `target_os` name to the policy key.
    pub fn from_target(os: &str) -> Self {
        match os {
            "linux" => Self::Linux,
            "macos" | "darwin" => Self::Darwin,
            other => Self::Other(other.to_string()),
        }
    }

    /// Key used in the compatibility policy.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Os> for String {
    fn from(os: Os) -> Self {
        os.as_str().to_string()
    }
}

/// Map a Rust `target_arch` name to the conventional short name.
pub fn normalize_arch(arch: &str) -> String {
    match arch {
        "x86_64" | "amd64" => "amd64".to_string(),
        "aarch64" | "arm64" => "arm64".to_string(),
        other => other.to_string(),
    }
}

/// Availability of one prerequisite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrerequisiteStatus {
    pub available: bool,
    pub description: String,
    pub install_hint: String,
    pub probe_command: String,
}

/// Prerequisite probe results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrerequisiteReport {
    /// Status per prerequisite code.
    pub statuses: BTreeMap<String, PrerequisiteStatus>,
    /// Codes with `available = false`, in declared order.
    pub missing: Vec<String>,
}

impl PrerequisiteReport {
    /// Record a probe result, keeping `missing` in insertion order.
    pub fn record(&mut self, code: &str, status: PrerequisiteStatus) {
        if !status.available && !self.missing.iter().any(|m| m == code) {
            self.missing.push(code.to_string());
        }
        self.statuses.insert(code.to_string(), status);
    }

    /// Whether every prerequisite is available.
    pub fn all_available(&self) -> bool {
        self.missing.is_empty()
    }

    /// Install hints for the missing prerequisites, one per line.
    pub fn missing_hints(&self) -> String {
        self.missing
            .iter()
            .map(|code| match self.statuses.get(code) {
                Some(status) if !status.install_hint.is_empty() => {
                    format!("{}: {}", code, status.install_hint)
                }
                _ => code.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The detection record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostInfo {
    pub os: Os,
    /// Lowercase distribution id; empty on darwin.
    pub distro: String,
    /// Distribution version when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distro_version: Option<String>,
    pub arch: String,
    pub prerequisites: PrerequisiteReport,
}

impl HostInfo {
    /// Build a host record without prerequisites.
    pub fn new(os: Os, distro: &str, arch: &str) -> Self {
        Self {
            os,
            distro: distro.to_lowercase(),
            distro_version: None,
            arch: normalize_arch(arch),
            prerequisites: PrerequisiteReport::default(),
        }
    }

    pub fn is_linux(&self) -> bool {
        self.os == Os::Linux
    }

    pub fn is_darwin(&self) -> bool {
        self.os == Os::Darwin
    }

    /// One-line description, e.g. `linux/ubuntu (amd64)`.
    pub fn describe(&self) -> String {
        if self.distro.is_empty() {
            format!("{} ({})", self.os, self.arch)
        } else {
            format!("{}/{} ({})", self.os, self.distro, self.arch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(available: bool, hint: &str) -> PrerequisiteStatus {
        PrerequisiteStatus {
            available,
            description: String::new(),
            install_hint: hint.to_string(),
            probe_command: "x".to_string(),
        }
    }

    #[test]
    fn os_from_target() {
        assert_eq!(Os::from_target("macos"), Os::Darwin);
        assert_eq!(Os::from_target("linux"), Os::Linux);
        assert_eq!(Os::from_target("windows").as_str(), "windows");
    }

    #[test]
    fn arch_is_normalized() {
        assert_eq!(normalize_arch("x86_64"), "amd64");
        assert_eq!(normalize_arch("aarch64"), "arm64");
        assert_eq!(normalize_arch("riscv64"), "riscv64");
    }

    #[test]
    fn report_tracks_missing_in_order() {
        let mut report = PrerequisiteReport::default();
        report.record("git", status(false, "install git"));
        report.record("curl", status(true, ""));
        report.record("development-tools", status(false, ""));

        assert_eq!(report.missing, ["git", "development-tools"]);
        assert!(!report.all_available());
        assert_eq!(
            report.missing_hints(),
            "git: install git\ndevelopment-tools"
        );
    }

    #[test]
    fn describe_omits_empty_distro() {
        let host = HostInfo::new(Os::Darwin, "", "aarch64");
        assert_eq!(host.describe(), "darwin (arm64)");
        let host = HostInfo::new(Os::Linux, "Ubuntu", "x86_64");
        assert_eq!(host.describe(), "linux/ubuntu (amd64)");
    }
}
