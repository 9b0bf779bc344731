//! Package code resolution.
//!
//! Turns a manager-agnostic package code plus the active manager and
//! distribution into a concrete [`PackageRequest`]. Distro-specific names
//! never fall back to another distro's name: a missing entry is an error so
//! diverging package groups cannot be silently mis-installed.

use crate::config::{PackageMap, PackageName};
use crate::error::{DotstrapError, Result};

use super::constraint::VersionConstraint;
use super::{ManagerKind, PackageRequest};

/// Resolves package codes for one manager and distribution.
///
/// Resolution is pure: the same code and constraint always yield the same
/// request for a given map and host.
#[derive(Debug, Clone)]
pub struct PackageResolver<'a> {
    map: &'a PackageMap,
    manager: ManagerKind,
    distro: String,
}

impl<'a> PackageResolver<'a> {
    pub fn new(map: &'a PackageMap, manager: ManagerKind, distro: &str) -> Self {
        Self {
            map,
            manager,
            distro: distro.to_string(),
        }
    }

    pub fn manager(&self) -> ManagerKind {
        self.manager
    }

    /// Resolve `code`, attaching the parsed constraint when `constraint` is non-empty.
    pub fn resolve(&self, code: &str, constraint: &str) -> Result<PackageRequest> {
        let entries = self.map.entries(code).ok_or_else(|| DotstrapError::NoMapping {
            code: code.to_string(),
            manager: None,
        })?;

        let manager = self.manager.as_str();
        let entry = entries.get(manager).ok_or_else(|| DotstrapError::NoMapping {
            code: code.to_string(),
            manager: Some(manager.to_string()),
        })?;

        let name = match &entry.name {
            PackageName::Literal(name) => name.clone(),
            PackageName::ByDistro(names) => names
                .get(&self.distro)
                .cloned()
                .ok_or_else(|| DotstrapError::NeedsDistroMapping {
                    code: code.to_string(),
                    distro: self.distro.clone(),
                })?,
        };

        if name.trim().is_empty() {
            return Err(DotstrapError::NoMapping {
                code: code.to_string(),
                manager: Some(manager.to_string()),
            });
        }

        Ok(PackageRequest {
            name,
            kind: entry.kind,
            constraint: VersionConstraint::parse_optional(constraint)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackageKind;

    const MAP: &str = r#"
packages:
  gpg:
    apt:
      name: gnupg2
    brew:
      name: gnupg
  development-tools:
    dnf:
      type: group
      name:
        fedora: Development Tools
        centos: development-tools
    apt:
      name:
        debian: build-essential
  blank:
    apt:
      name: ""
"#;

    fn map() -> PackageMap {
        PackageMap::from_yaml(MAP).unwrap()
    }

    #[test]
    fn resolves_literal_name() {
        let map = map();
        let resolver = PackageResolver::new(&map, ManagerKind::Brew, "");
        let request = resolver.resolve("gpg", "").unwrap();
        assert_eq!(request.name, "gnupg");
        assert_eq!(request.kind, PackageKind::Regular);
        assert!(request.constraint.is_none());
    }

    #[test]
    fn resolves_distro_name_with_type() {
        let map = map();
        let resolver = PackageResolver::new(&map, ManagerKind::Dnf, "fedora");
        let request = resolver.resolve("development-tools", "").unwrap();
        assert_eq!(request.name, "Development Tools");
        assert_eq!(request.kind, PackageKind::Group);
    }

    #[test]
    fn unknown_code_is_no_mapping() {
        let map = map();
        let resolver = PackageResolver::new(&map, ManagerKind::Apt, "ubuntu");
        let err = resolver.resolve("nonexistent", "").unwrap_err();
        assert!(matches!(err, DotstrapError::NoMapping { manager: None, .. }));
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn missing_manager_is_no_mapping() {
        let map = map();
        let resolver = PackageResolver::new(&map, ManagerKind::Dnf, "fedora");
        let err = resolver.resolve("gpg", "").unwrap_err();
        match err {
            DotstrapError::NoMapping { code, manager } => {
                assert_eq!(code, "gpg");
                assert_eq!(manager.as_deref(), Some("dnf"));
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn missing_distro_never_falls_back() {
        let map = map();
        let resolver = PackageResolver::new(&map, ManagerKind::Apt, "ubuntu");
        let err = resolver.resolve("development-tools", "").unwrap_err();
        assert!(matches!(err, DotstrapError::NeedsDistroMapping { .. }));
        assert!(err.to_string().contains("ubuntu"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let map = map();
        let resolver = PackageResolver::new(&map, ManagerKind::Apt, "ubuntu");
        assert!(resolver.resolve("blank", "").is_err());
    }

    #[test]
    fn constraint_is_parsed() {
        let map = map();
        let resolver = PackageResolver::new(&map, ManagerKind::Apt, "ubuntu");
        let request = resolver.resolve("gpg", ">=2.2, <3").unwrap();
        assert_eq!(request.constraint.unwrap().as_str(), ">=2.2, <3");

        let err = resolver.resolve("gpg", "~~2").unwrap_err();
        assert!(matches!(err, DotstrapError::BadConstraint { .. }));
    }

    #[test]
    fn every_defined_entry_resolves_to_a_name() {
        let map = map();
        for (code, entries) in &map.packages {
            for (manager, entry) in entries {
                let Some(kind) = ManagerKind::from_name(manager) else {
                    continue;
                };
                let distros: Vec<String> = match &entry.name {
                    PackageName::Literal(_) => vec!["ubuntu".to_string()],
                    PackageName::ByDistro(names) => names.keys().cloned().collect(),
                };
                for distro in distros {
                    let resolver = PackageResolver::new(&map, kind, &distro);
                    if code == "blank" {
                        continue;
                    }
                    let request = resolver.resolve(code, "").unwrap();
                    assert!(!request.name.is_empty());
                }
            }
        }
    }

    #[test]
    fn resolution_is_repeatable() {
        let map = map();
        let resolver = PackageResolver::new(&map, ManagerKind::Dnf, "centos");
        let first = resolver.resolve("development-tools", "^1").unwrap();
        let second = resolver.resolve("development-tools", "^1").unwrap();
        assert_eq!(first, second);
    }
}
