//! Linux distribution identification.
//!
//! Sources are tried in a fixed order and the first hit wins:
//! `/etc/os-release`, `/etc/lsb-release`, `/etc/debian_version`,
//! `/etc/SuSe-release`, `/etc/redhat-release`, then `uname -s`.

use std::path::Path;

use crate::shell::{CommandSpec, Commander};

/// Distribution id and version as read from the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistroId {
    /// Lowercase short id, e.g. `ubuntu`.
    pub id: String,
    /// Version string when the source provides one, e.g. `22.04`.
    pub version: Option<String>,
}

/// Identify the distribution under `root` (normally `/`).
pub fn identify(root: &Path, commander: &dyn Commander) -> Option<DistroId> {
    from_os_release(root)
        .or_else(|| from_lsb_release(root))
        .or_else(|| marker_file(root, "etc/debian_version", "debian"))
        .or_else(|| marker_file(root, "etc/SuSe-release", "suse"))
        .or_else(|| from_redhat_release(root))
        .or_else(|| from_uname(commander))
        .map(|d| DistroId {
            id: d.id.to_lowercase(),
            version: d.version,
        })
}

fn read(root: &Path, relative: &str) -> Option<String> {
    std::fs::read_to_string(root.join(relative)).ok()
}

/// Parse `KEY=value` lines, stripping optional quotes.
fn key_values(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content.lines().filter_map(|line| {
        let (key, value) = line.trim().split_once('=')?;
        Some((key.trim(), value.trim().trim_matches('"').trim_matches('\'')))
    })
}

fn lookup<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    key_values(content)
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

fn from_os_release(root: &Path) -> Option<DistroId> {
    let content = read(root, "etc/os-release")?;
    let id = lookup(&content, "ID")?;
    Some(DistroId {
        id: id.to_string(),
        version: lookup(&content, "VERSION_ID").map(String::from),
    })
}

fn from_lsb_release(root: &Path) -> Option<DistroId> {
    let content = read(root, "etc/lsb-release")?;
    let id = lookup(&content, "DISTRIB_ID")?;
    Some(DistroId {
        id: id.to_string(),
        version: lookup(&content, "DISTRIB_RELEASE").map(String::from),
    })
}

fn marker_file(root: &Path, relative: &str, id: &str) -> Option<DistroId> {
    root.join(relative).exists().then(|| DistroId {
        id: id.to_string(),
        version: read(root, relative)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v.chars().next().is_some_and(|c| c.is_ascii_digit())),
    })
}

fn from_redhat_release(root: &Path) -> Option<DistroId> {
    let content = read(root, "etc/redhat-release")?;
    let lower = content.trim().to_lowercase();
    let id = if lower.starts_with("red hat") {
        "rhel".to_string()
    } else {
        lower.split_whitespace().next()?.to_string()
    };
    let version = lower
        .split_whitespace()
        .find(|word| word.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .map(String::from);
    Some(DistroId { id, version })
}

fn from_uname(commander: &dyn Commander) -> Option<DistroId> {
    let output = commander
        .run(&CommandSpec::new("uname", ["-s"]).captured())
        .ok()
        .filter(|o| o.success())?;
    let id = output.stdout.trim();
    (!id.is_empty()).then(|| DistroId {
        id: id.to_string(),
        version: None,
    })
}
