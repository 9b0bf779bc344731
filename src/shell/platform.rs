//! Platform queries: privilege level and CI detection.

use super::command::CommandSpec;

/// How privileged commands are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Already root; run commands as-is.
    None,
    /// Prefix privileged commands with `sudo`.
    Sudo,
}

impl Escalation {
    /// Decide from the current process privileges.
    pub fn detect() -> Self {
        if is_elevated() {
            Self::None
        } else {
            Self::Sudo
        }
    }

    /// Apply the escalation prefix to a command.
    pub fn apply(&self, spec: CommandSpec) -> CommandSpec {
        match self {
            Self::None => spec,
            Self::Sudo => spec.prefixed("sudo"),
        }
    }
}

/// Check if running in a CI environment.
///
/// Checks common CI environment variables: `CI`, `GITHUB_ACTIONS`,
/// `GITLAB_CI`, `CIRCLECI`, `TRAVIS`, `JENKINS_URL`.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
        || std::env::var("JENKINS_URL").is_ok()
}

/// Check if running as root.
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() is a simple syscall that returns the effective user ID
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}
