//! Host probe.
//!
//! # Example
//!
//! ```no_run
//! use dotstrap::config::load_policy;
//! use dotstrap::host::HostProbe;
//!
//! let policy = load_policy(None).unwrap();
//! let host = HostProbe::system().detect(&policy).unwrap();
//! println!("{}", host.describe());
//! ```

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::distro;
use super::{normalize_arch, HostInfo, Os, PrerequisiteReport, PrerequisiteStatus};
use crate::config::{CompatibilityPolicy, PrerequisiteSpec};
use crate::error::{DotstrapError, Result};
use crate::shell::{CommandSpec, Commander, PathEnv, ProcessPath, SystemCommander};

/// Produces a detection record.
///
/// The orchestrator detects once per run and once more after prerequisite
/// remediation.
pub trait Detector {
    fn detect(&self, policy: &CompatibilityPolicy) -> Result<HostInfo>;
}

/// Detects the host OS, distribution, architecture and prerequisites.
pub struct HostProbe {
    os: Os,
    arch: String,
    root: PathBuf,
    commander: Arc<dyn Commander>,
    path: Arc<dyn PathEnv>,
}

impl HostProbe {
    /// Probe the running system.
    pub fn system() -> Self {
        Self::new(
            Os::from_target(std::env::consts::OS),
            std::env::consts::ARCH,
            Path::new("/"),
            Arc::new(SystemCommander::new()),
            Arc::new(ProcessPath::new()),
        )
    }

    /// Probe with explicit identity and collaborators.
    ///
    /// `root` is where `etc/os-release` and friends are read from.
    pub fn new(
        os: Os,
        arch: &str,
        root: &Path,
        commander: Arc<dyn Commander>,
        path: Arc<dyn PathEnv>,
    ) -> Self {
        Self {
            os,
            arch: normalize_arch(arch),
            root: root.to_path_buf(),
            commander,
            path,
        }
    }

    /// Build the detection record.
    ///
    /// Prerequisite probes never fail detection: a probe that errors marks
    /// the prerequisite unavailable.
    pub fn detect(&self, policy: &CompatibilityPolicy) -> Result<HostInfo> {
        Detector::detect(self, policy)
    }

    fn probe_prerequisites(&self, specs: &[PrerequisiteSpec]) -> PrerequisiteReport {
        let mut report = PrerequisiteReport::default();
        for spec in specs {
            let available = self.probe(&spec.command);
            tracing::debug!("Prerequisite {} available: {}", spec.code, available);
            report.record(
                &spec.code,
                PrerequisiteStatus {
                    available,
                    description: spec.description.clone(),
                    install_hint: spec.install_hint.clone(),
                    probe_command: spec.command.clone(),
                },
            );
        }
        report
    }

    /// A bare binary name is looked up on PATH; anything else runs through `sh -c`.
    fn probe(&self, command: &str) -> bool {
        let command = command.trim();
        if command.is_empty() {
            return false;
        }
        if !command.contains(char::is_whitespace) {
            return self.path.which(command).is_some();
        }
        let spec = CommandSpec::new("sh", ["-c", command]);
        match self.commander.run(&spec) {
            Ok(output) => output.success(),
            Err(e) => {
                tracing::debug!("Probe '{}' errored: {}", command, e);
                false
            }
        }
    }
}

impl Detector for HostProbe {
    fn detect(&self, policy: &CompatibilityPolicy) -> Result<HostInfo> {
        let mut host = HostInfo::new(self.os.clone(), "", &self.arch);

        if self.os == Os::Linux {
            let id = distro::identify(&self.root, self.commander.as_ref()).ok_or_else(|| {
                DotstrapError::Detection {
                    message: "could not identify the Linux distribution".to_string(),
                }
            })?;
            host.distro = id.id;
            host.distro_version = id.version;
        }

        host.prerequisites = self.probe_prerequisites(&policy.prerequisites);

        tracing::info!(
            "Detected {} with {} missing prerequisite(s)",
            host.describe(),
            host.prerequisites.missing.len()
        );
        Ok(host)
    }
}

/// Test double returning queued records in order; the last one repeats.
#[derive(Debug, Default)]
pub struct SequenceDetector {
    hosts: Mutex<VecDeque<HostInfo>>,
    calls: Mutex<usize>,
}

impl SequenceDetector {
    pub fn new<I: IntoIterator<Item = HostInfo>>(hosts: I) -> Self {
        Self {
            hosts: Mutex::new(hosts.into_iter().collect()),
            calls: Mutex::new(0),
        }
    }

    /// Number of detections so far.
    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }
}

impl Detector for SequenceDetector {
    fn detect(&self, _policy: &CompatibilityPolicy) -> Result<HostInfo> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        let mut hosts = self
            .hosts
            .lock()
            .map_err(|_| DotstrapError::Detection {
                message: "detector lock poisoned".to_string(),
            })?;
        let host = if hosts.len() > 1 {
            hosts.pop_front()
        } else {
            hosts.front().cloned()
        };
        host.ok_or_else(|| DotstrapError::Detection {
            message: "no host queued".to_string(),
        })
    }
}
