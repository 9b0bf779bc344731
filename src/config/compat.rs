//! Compatibility policy schema.
//!
//! The policy is a declarative tree: operating system → distribution, each
//! with a `supported` flag and notes shown to the user when unsupported.
//! It also declares the prerequisite programs probed on every run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root of the compatibility config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityPolicy {
    /// Policy per operating system (`linux`, `darwin`).
    #[serde(rename = "operatingSystems", default)]
    pub operating_systems: BTreeMap<String, OsPolicy>,

    /// Prerequisite programs, in install order.
    #[serde(default)]
    pub prerequisites: Vec<PrerequisiteSpec>,
}

/// Policy for one operating system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsPolicy {
    #[serde(default)]
    pub supported: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    /// Distribution policies keyed by lowercase distro id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub distributions: BTreeMap<String, DistroPolicy>,
}

/// Policy for one Linux distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroPolicy {
    #[serde(default)]
    pub supported: bool,

    /// Semver range the distro version should satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_constraint: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// A prerequisite program and how to probe for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteSpec {
    /// Prerequisite code, e.g. `curl`.
    pub code: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Binary name to look up on PATH, or a full command when it contains spaces.
    pub command: String,

    /// Hint shown when the prerequisite is missing.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub install_hint: String,

    /// Package code to resolve for remediation; defaults to `code`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl PrerequisiteSpec {
    /// The package code used to install this prerequisite.
    pub fn package_code(&self) -> &str {
        self.package.as_deref().unwrap_or(&self.code)
    }
}

impl CompatibilityPolicy {
    /// Parse a policy from YAML.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Serialize the policy back to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Look up the policy for an operating system.
    pub fn os(&self, os: &str) -> Option<&OsPolicy> {
        self.operating_systems.get(os)
    }

    /// Look up a prerequisite by code.
    pub fn prerequisite(&self, code: &str) -> Option<&PrerequisiteSpec> {
        self.prerequisites.iter().find(|p| p.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = r#"
operatingSystems:
  linux:
    supported: true
    distributions:
      ubuntu:
        supported: true
        version_constraint: ">=20.4.0"
      arch:
        supported: false
        notes: "Use the AUR package instead"
  windows:
    supported: false
    notes: "Use WSL"
prerequisites:
  - code: curl
    description: Transfer tool
    command: curl
    install_hint: Install curl with your package manager
  - code: development-tools
    command: gcc
    package: development-tools
"#;

    #[test]
    fn parses_nested_policy() {
        let policy = CompatibilityPolicy::from_yaml(POLICY).unwrap();

        let linux = policy.os("linux").unwrap();
        assert!(linux.supported);
        assert_eq!(
            linux.distributions["ubuntu"].version_constraint.as_deref(),
            Some(">=20.4.0")
        );
        assert!(!linux.distributions["arch"].supported);
        assert_eq!(policy.os("windows").unwrap().notes, "Use WSL");
    }

    #[test]
    fn prerequisites_keep_declared_order() {
        let policy = CompatibilityPolicy::from_yaml(POLICY).unwrap();
        let codes: Vec<_> = policy.prerequisites.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, ["curl", "development-tools"]);
    }

    #[test]
    fn package_code_defaults_to_code() {
        let policy = CompatibilityPolicy::from_yaml(POLICY).unwrap();
        assert_eq!(policy.prerequisite("curl").unwrap().package_code(), "curl");
        assert!(policy.prerequisite("wget").is_none());
    }

    #[test]
    fn yaml_round_trip_is_lossless() {
        let policy = CompatibilityPolicy::from_yaml(POLICY).unwrap();
        let yaml = policy.to_yaml().unwrap();
        let reloaded = CompatibilityPolicy::from_yaml(&yaml).unwrap();
        assert_eq!(policy, reloaded);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let policy = CompatibilityPolicy::from_yaml("{}").unwrap();
        assert!(policy.operating_systems.is_empty());
        assert!(policy.prerequisites.is_empty());
    }
}
