//! PATH inspection and mutation.
//!
//! Tool lookups walk PATH entries directly instead of shelling out to
//! `which`, whose behavior varies across systems and is sometimes a shell
//! builtin with inconsistent error handling.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Access to the PATH seen by this process and its children.
pub trait PathEnv: Send + Sync {
    /// Current PATH entries in order.
    fn entries(&self) -> Vec<PathBuf>;

    /// Prepend `dir` unless already present. Returns true if PATH changed.
    fn prepend(&self, dir: &Path) -> bool;

    /// Resolve a tool to its first executable match on PATH.
    fn which(&self, tool: &str) -> Option<PathBuf> {
        resolve_tool_path(tool, &self.entries())
    }
}

/// The real process PATH.
#[derive(Debug, Default)]
pub struct ProcessPath;

impl ProcessPath {
    pub fn new() -> Self {
        Self
    }
}

impl PathEnv for ProcessPath {
    fn entries(&self) -> Vec<PathBuf> {
        parse_system_path()
    }

    fn prepend(&self, dir: &Path) -> bool {
        let current = self.entries();
        let Some(updated) = prepend_dedup(&current, dir) else {
            return false;
        };
        match std::env::join_paths(updated) {
            Ok(joined) => {
                // Single-threaded orchestration; children inherit the new PATH.
                std::env::set_var("PATH", joined);
                tracing::debug!("Prepended {} to PATH", dir.display());
                true
            }
            Err(e) => {
                tracing::warn!("Cannot add {} to PATH: {}", dir.display(), e);
                false
            }
        }
    }
}

/// In-memory PATH for tests.
#[derive(Debug, Default)]
pub struct MemoryPath {
    entries: Mutex<Vec<PathBuf>>,
}

impl MemoryPath {
    /// Create a PATH from the given entries.
    pub fn new<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            entries: Mutex::new(entries.into_iter().map(Into::into).collect()),
        }
    }
}

impl PathEnv for MemoryPath {
    fn entries(&self) -> Vec<PathBuf> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn prepend(&self, dir: &Path) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };
        match prepend_dedup(&entries, dir) {
            Some(updated) => {
                *entries = updated;
                true
            }
            None => false,
        }
    }
}

/// Return the new PATH with `dir` first, or None if it is already first.
///
/// Any later occurrence of `dir` is removed so it appears exactly once.
fn prepend_dedup(entries: &[PathBuf], dir: &Path) -> Option<Vec<PathBuf>> {
    if entries.first().map(PathBuf::as_path) == Some(dir) {
        return None;
    }
    let mut updated = Vec::with_capacity(entries.len() + 1);
    updated.push(dir.to_path_buf());
    updated.extend(entries.iter().filter(|e| e.as_path() != dir).cloned());
    Some(updated)
}

/// Check whether a file has executable permission bits set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(_path: &Path) -> bool {
    true
}

/// Resolve a tool's binary path by iterating over PATH entries.
///
/// An absolute or relative path containing a separator is checked directly.
pub fn resolve_tool_path(tool: &str, path_entries: &[PathBuf]) -> Option<PathBuf> {
    if tool.contains(std::path::MAIN_SEPARATOR) {
        let candidate = PathBuf::from(tool);
        return (candidate.is_file() && is_executable(&candidate)).then_some(candidate);
    }
    path_entries
        .iter()
        .map(|dir| dir.join(tool))
        .find(|candidate| candidate.is_file() && is_executable(candidate))
}

/// Parse the system PATH environment variable into a list of directories.
pub fn parse_system_path() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_fake_binary(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[test]
    fn which_finds_first_match() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        create_fake_binary(&a.join("zsh"));
        create_fake_binary(&b.join("zsh"));

        let path = MemoryPath::new([a.clone(), b]);
        assert_eq!(path.which("zsh"), Some(a.join("zsh")));
        assert_eq!(path.which("fish"), None);
    }

    #[cfg(unix)]
    #[test]
    fn which_skips_non_executable() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("gpg");
        fs::write(&file, "data").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();

        let path = MemoryPath::new([temp.path()]);
        assert_eq!(path.which("gpg"), None);
    }

    #[test]
    fn prepend_is_deduplicated() {
        let path = MemoryPath::new(["/usr/bin", "/opt/homebrew/bin", "/bin"]);
        assert!(path.prepend(Path::new("/opt/homebrew/bin")));
        assert!(!path.prepend(Path::new("/opt/homebrew/bin")));
        assert_eq!(
            path.entries(),
            vec![
                PathBuf::from("/opt/homebrew/bin"),
                PathBuf::from("/usr/bin"),
                PathBuf::from("/bin"),
            ]
        );
    }

    #[test]
    fn resolve_tool_path_accepts_absolute_paths() {
        let temp = TempDir::new().unwrap();
        let brew = temp.path().join("bin/brew");
        create_fake_binary(&brew);
        assert_eq!(
            resolve_tool_path(brew.to_str().unwrap(), &[]),
            Some(brew.clone())
        );
    }
}
