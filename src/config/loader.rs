//! Loading the compatibility policy and package map.
//!
//! Defaults are embedded from `assets/` at compile time; a path given on
//! the command line replaces the embedded file entirely.

use include_dir::{include_dir, Dir};
use std::path::{Path, PathBuf};

use crate::config::compat::CompatibilityPolicy;
use crate::config::packages::PackageMap;
use crate::error::{DotstrapError, Result};

static ASSETS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// File name of the embedded compatibility policy.
pub const COMPATIBILITY_FILE: &str = "compatibility.yaml";

/// File name of the embedded package map.
pub const PACKAGES_FILE: &str = "packages.yaml";

/// Read an embedded asset as UTF-8.
fn embedded(name: &str) -> Result<&'static str> {
    ASSETS_DIR
        .get_file(name)
        .and_then(|f| f.contents_utf8())
        .ok_or_else(|| DotstrapError::ConfigNotFound {
            path: PathBuf::from(name),
        })
}

fn read_override(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(DotstrapError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| DotstrapError::filesystem(path, e))
}

fn parse_error(path: &Path, e: serde_yaml::Error) -> DotstrapError {
    DotstrapError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Load the compatibility policy, from `path` if given.
pub fn load_policy(path: Option<&Path>) -> Result<CompatibilityPolicy> {
    match path {
        Some(path) => {
            tracing::debug!("Loading compatibility policy from {}", path.display());
            let content = read_override(path)?;
            CompatibilityPolicy::from_yaml(&content).map_err(|e| parse_error(path, e))
        }
        None => CompatibilityPolicy::from_yaml(embedded(COMPATIBILITY_FILE)?)
            .map_err(|e| parse_error(Path::new(COMPATIBILITY_FILE), e)),
    }
}

/// Load the package map, from `path` if given.
pub fn load_package_map(path: Option<&Path>) -> Result<PackageMap> {
    match path {
        Some(path) => {
            tracing::debug!("Loading package map from {}", path.display());
            let content = read_override(path)?;
            PackageMap::from_yaml(&content).map_err(|e| parse_error(path, e))
        }
        None => PackageMap::from_yaml(embedded(PACKAGES_FILE)?)
            .map_err(|e| parse_error(Path::new(PACKAGES_FILE), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn embedded_policy_supports_ubuntu_and_darwin() {
        let policy = load_policy(None).unwrap();
        assert!(policy.os("darwin").unwrap().supported);
        let linux = policy.os("linux").unwrap();
        assert!(linux.distributions["ubuntu"].supported);
        assert!(!policy.prerequisites.is_empty());
    }

    #[test]
    fn embedded_map_has_dnf_group() {
        let map = load_package_map(None).unwrap();
        let dev = &map.entries("development-tools").unwrap()["dnf"];
        assert!(!dev.kind.is_regular());
    }

    #[test]
    fn embedded_map_covers_every_prerequisite() {
        let policy = load_policy(None).unwrap();
        let map = load_package_map(None).unwrap();
        for prereq in &policy.prerequisites {
            assert!(
                map.entries(prereq.package_code()).is_some(),
                "no mapping for {}",
                prereq.code
            );
        }
    }

    #[test]
    fn override_replaces_embedded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("compat.yaml");
        std::fs::write(&path, "operatingSystems:\n  linux:\n    supported: false\n").unwrap();

        let policy = load_policy(Some(&path)).unwrap();
        assert!(!policy.os("linux").unwrap().supported);
        assert!(policy.os("darwin").is_none());
    }

    #[test]
    fn missing_override_is_not_found() {
        let err = load_policy(Some(Path::new("/nonexistent/compat.yaml"))).unwrap_err();
        assert!(matches!(err, DotstrapError::ConfigNotFound { .. }));
    }

    #[test]
    fn malformed_override_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("packages.yaml");
        std::fs::write(&path, "packages: [oops").unwrap();
        let err = load_package_map(Some(&path)).unwrap_err();
        assert!(matches!(err, DotstrapError::ConfigParse { .. }));
    }
}
