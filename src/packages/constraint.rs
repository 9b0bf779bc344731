//! Version constraints.
//!
//! Constraints use semver range syntax: comparators (`>=1.2`, `^2`, `~1.4`)
//! joined by `,` within an alternative, and alternatives joined by `||`.

use regex::Regex;
use semver::{Version, VersionReq};
use std::fmt;
use std::sync::LazyLock;

use crate::error::{DotstrapError, Result};

/// A parsed semver range with `||` alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    text: String,
    alternatives: Vec<VersionReq>,
}

impl VersionConstraint {
    /// Parse constraint text. Fails with `BadConstraint` on any invalid alternative.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let alternatives = trimmed
            .split("||")
            .map(|alt| {
                let alt = alt.trim();
                if alt.is_empty() {
                    return Err(DotstrapError::BadConstraint {
                        constraint: text.to_string(),
                        message: "empty alternative".to_string(),
                    });
                }
                VersionReq::parse(alt).map_err(|e| DotstrapError::BadConstraint {
                    constraint: text.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            text: trimmed.to_string(),
            alternatives,
        })
    }

    /// Parse optional text: empty means no constraint.
    pub fn parse_optional(text: &str) -> Result<Option<Self>> {
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Self::parse(text).map(Some)
        }
    }

    /// Whether `version` satisfies any alternative.
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// The constraint as written.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

static RE_LOOSE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").unwrap());

/// Coerce the first loose version in `text` (`22.04`, `9`, `v2.43.0`,
/// `gpg (GnuPG) 2.4.5`) into semver.
///
/// Missing components are zero; anything after the first three numeric
/// components is ignored.
pub fn coerce_version(text: &str) -> Option<Version> {
    let caps = RE_LOOSE_VERSION.captures(text)?;
    let component = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(component(1)?, component(2)?, component(3)?))
}
