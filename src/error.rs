//! Error types for dotstrap operations.
//!
//! This module defines [`DotstrapError`], the primary error type used throughout
//! the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Every failure surfaced to the user maps to exactly one variant
//! - Recovery happens in two places only: the compatibility re-check after
//!   prerequisite remediation, and the dotfiles engine install fallback
//! - [`DotstrapError::hint`] carries the recovery hint printed under the error

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Number of stderr lines kept when a package manager command fails.
pub const STDERR_TAIL_LINES: usize = 10;

/// Core error type for dotstrap operations.
#[derive(Debug, Error)]
pub enum DotstrapError {
    /// The host operating system or distribution could not be identified.
    #[error("Failed to detect host environment: {message}")]
    Detection { message: String },

    /// The host is not supported by the compatibility policy.
    #[error("Incompatible host: {message}")]
    Incompatible { message: String },

    /// No package mapping exists for the code (or for the code under a manager).
    #[error("{}", no_mapping_message(.code, .manager.as_deref()))]
    NoMapping {
        code: String,
        manager: Option<String>,
    },

    /// The mapping for the code differs per distribution and lacks this one.
    #[error("Package '{code}' needs an explicit mapping for distribution '{distro}'")]
    NeedsDistroMapping { code: String, distro: String },

    /// A version constraint could not be parsed.
    #[error("Invalid version constraint '{constraint}': {message}")]
    BadConstraint { constraint: String, message: String },

    /// A package manager command exited unsuccessfully.
    #[error("Package manager command failed with exit code {code:?}: {command}{}", stderr_suffix(.stderr_tail))]
    PackageManager {
        command: String,
        code: Option<i32>,
        stderr_tail: String,
    },

    /// An HTTP download failed or returned a non-200 status.
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// A filesystem operation failed.
    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external command exceeded its timeout and was killed.
    #[error("Command timed out after {}s: {command}", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    /// Installing missing prerequisites failed.
    #[error("Failed to install prerequisites: {message}")]
    PrereqRemediation {
        message: String,
        hint: Option<String>,
    },

    /// A subsystem (package manager, shell, GPG, dotfiles engine) failed to install.
    #[error("Failed to install {subsystem}: {message}")]
    SubsystemInstall { subsystem: String, message: String },

    /// The user interrupted the run (Ctrl-C or an aborted prompt).
    #[error("Operation cancelled by user")]
    UserCancelled,

    /// A prompt was required but the run is non-interactive.
    #[error("Cannot prompt for '{key}' in non-interactive mode (no default value)")]
    PromptUnavailable { key: String },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn no_mapping_message(code: &str, manager: Option<&str>) -> String {
    match manager {
        Some(manager) => format!("No mapping for package '{}' under '{}'", code, manager),
        None => format!("No mapping for package '{}'", code),
    }
}

fn stderr_suffix(tail: &str) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!("\n{}", tail)
    }
}

impl DotstrapError {
    /// Build a filesystem error for `path`.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Build a subsystem install error.
    pub fn subsystem(subsystem: &str, message: impl Into<String>) -> Self {
        Self::SubsystemInstall {
            subsystem: subsystem.to_string(),
            message: message.into(),
        }
    }

    /// User-visible recovery hint for this error, if any.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::PrereqRemediation { hint, .. } => hint.clone(),
            Self::NeedsDistroMapping { code, distro } => Some(format!(
                "Add a '{}' entry under the name of '{}' in the package map",
                distro, code
            )),
            Self::NoMapping { code, .. } => {
                Some(format!("Add '{}' to the package map", code))
            }
            Self::Timeout { .. } | Self::UserCancelled => {
                Some("Re-run dotstrap; subsystems already installed are skipped".into())
            }
            Self::Network { .. } => Some("Check your network connection and retry".into()),
            _ => None,
        }
    }
}

/// Keep the last `max` lines of command stderr.
pub fn stderr_tail(stderr: &str, max: usize) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(max);
    lines[start..].join("\n")
}

/// Result type alias for dotstrap operations.
pub type Result<T> = std::result::Result<T, DotstrapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_mapping_displays_code() {
        let err = DotstrapError::NoMapping {
            code: "nonexistent".into(),
            manager: None,
        };
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn no_mapping_with_manager_displays_both() {
        let err = DotstrapError::NoMapping {
            code: "gpg".into(),
            manager: Some("dnf".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("gpg"));
        assert!(msg.contains("dnf"));
    }

    #[test]
    fn needs_distro_mapping_displays_distro() {
        let err = DotstrapError::NeedsDistroMapping {
            code: "development-tools".into(),
            distro: "ubuntu".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("development-tools"));
        assert!(msg.contains("ubuntu"));
    }

    #[test]
    fn package_manager_error_includes_stderr_tail() {
        let err = DotstrapError::PackageManager {
            command: "apt-get install -y zsh".into(),
            code: Some(100),
            stderr_tail: "E: Unable to locate package zsh".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("Unable to locate package"));
    }

    #[test]
    fn network_error_displays_status() {
        let err = DotstrapError::Network {
            url: "https://get.chezmoi.io".into(),
            message: "HTTP 404 Not Found".into(),
        };
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn timeout_displays_seconds() {
        let err = DotstrapError::Timeout {
            command: "brew update".into(),
            timeout: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn prereq_error_exposes_hint() {
        let err = DotstrapError::PrereqRemediation {
            message: "curl still missing".into(),
            hint: Some("sudo apt-get install curl".into()),
        };
        assert_eq!(err.hint().as_deref(), Some("sudo apt-get install curl"));
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let stderr = "one\ntwo\nthree\nfour\n";
        assert_eq!(stderr_tail(stderr, 2), "three\nfour");
        assert_eq!(stderr_tail("", 3), "");
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: DotstrapError = io_err.into();
        assert!(matches!(err, DotstrapError::Io(_)));
    }
}
