//! Package map schema.
//!
//! Maps a manager-agnostic package code (`gpg`) to the name each package
//! manager uses for it (`gnupg` under brew, `gnupg2` under apt). Names that
//! differ between distributions are given as a `distro → name` mapping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root of the package map config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMap {
    /// `code → (manager → entry)`.
    #[serde(default)]
    pub packages: BTreeMap<String, BTreeMap<String, ManagerEntry>>,
}

/// How one package manager names a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerEntry {
    pub name: PackageName,

    #[serde(rename = "type", default, skip_serializing_if = "PackageKind::is_regular")]
    pub kind: PackageKind,
}

/// A package name: the same everywhere, or per distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackageName {
    Literal(String),
    ByDistro(BTreeMap<String, String>),
}

/// Package type marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageKind {
    #[default]
    #[serde(rename = "")]
    Regular,
    /// A dnf package group.
    #[serde(rename = "group")]
    Group,
}

impl PackageKind {
    pub fn is_regular(&self) -> bool {
        matches!(self, Self::Regular)
    }
}

impl PackageMap {
    /// Parse a package map from YAML.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Serialize the map back to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Entries for a package code, keyed by manager.
    pub fn entries(&self, code: &str) -> Option<&BTreeMap<String, ManagerEntry>> {
        self.packages.get(code)
    }
}
