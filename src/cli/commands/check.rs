//! Check-compatibility command implementation.
//!
//! The `dotstrap check-compatibility` command detects the host, prints the
//! verdict and the state of every prerequisite. It never installs anything.

use serde::Serialize;

use crate::cli::args::CheckArgs;
use crate::config::{load_policy, CompatibilityPolicy};
use crate::error::Result;
use crate::gate::CompatibilityGate;
use crate::host::{Detector, HostInfo, HostProbe};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, Settings};

/// The check-compatibility command implementation.
pub struct CheckCommand {
    settings: Settings,
    args: CheckArgs,
}

/// Machine-readable verdict for `--json`.
#[derive(Debug, Serialize)]
pub struct CompatibilityReport<'a> {
    pub host: &'a HostInfo,
    pub compatible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CheckCommand {
    /// Create a new check command.
    pub fn new(settings: Settings, args: CheckArgs) -> Self {
        Self { settings, args }
    }

    /// Check `host` against `policy` and print the result. Returns the verdict.
    pub fn report(
        &self,
        policy: &CompatibilityPolicy,
        host: &HostInfo,
        ui: &mut dyn UserInterface,
    ) -> Result<bool> {
        let verdict = CompatibilityGate::new(policy).check(host);

        if self.args.json {
            let report = CompatibilityReport {
                host,
                compatible: verdict.is_ok(),
                reason: verdict.as_ref().err().map(ToString::to_string),
            };
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| crate::error::DotstrapError::Other(e.into()))?;
            ui.message(&json);
            return Ok(verdict.is_ok());
        }

        ui.show_header("Compatibility");
        ui.message(&format!("OS:      {}", host.os));
        if !host.distro.is_empty() {
            match &host.distro_version {
                Some(version) => ui.message(&format!("Distro:  {} {}", host.distro, version)),
                None => ui.message(&format!("Distro:  {}", host.distro)),
            }
        }
        ui.message(&format!("Arch:    {}", host.arch));
        ui.message("");

        match &verdict {
            Ok(()) => ui.success(&format!("{} is supported", host.describe())),
            Err(e) => ui.error(&e.to_string()),
        }

        if !host.prerequisites.statuses.is_empty() {
            ui.message("");
            ui.message("Prerequisites:");
            for spec in &policy.prerequisites {
                let Some(status) = host.prerequisites.statuses.get(&spec.code) else {
                    continue;
                };
                if status.available {
                    ui.message(&format!("  ✓ {}", spec.code));
                } else if status.install_hint.is_empty() {
                    ui.message(&format!("  ✗ {}", spec.code));
                } else {
                    ui.message(&format!("  ✗ {} ({})", spec.code, status.install_hint));
                }
            }
        }

        if verdict.is_ok() && !host.prerequisites.all_available() {
            ui.hint("Run 'dotstrap install --install-prerequisites' to install what is missing");
        }

        Ok(verdict.is_ok())
    }
}

impl Command for CheckCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let policy = load_policy(self.settings.compat_config.as_deref())?;
        let host = Detector::detect(&HostProbe::system(), &policy)?;

        if self.report(&policy, &host, ui)? {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(1))
        }
    }
}
