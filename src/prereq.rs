//! Prerequisite remediation.
//!
//! Installs prerequisites the host probe reported missing, through the
//! host's system package manager. The host record is never touched: the
//! caller re-probes and re-checks after a successful remediation.

use crate::config::{CompatibilityPolicy, PackageMap};
use crate::error::{DotstrapError, Result};
use crate::host::HostInfo;
use crate::packages::{create_manager, ManagerKind, ManagerRuntime, PackageResolver};
use crate::ui::{Prompt, PromptOption, PromptType, UserInterface};

/// Prompt key for choosing which prerequisites to install.
pub const SELECT_PROMPT_KEY: &str = "prerequisites";

/// Selection value meaning every missing prerequisite.
const ALL: &str = "*";

/// Installs missing prerequisites.
pub struct PrerequisiteInstaller<'a> {
    map: &'a PackageMap,
    runtime: ManagerRuntime,
}

impl<'a> PrerequisiteInstaller<'a> {
    pub fn new(map: &'a PackageMap, runtime: ManagerRuntime) -> Self {
        Self { map, runtime }
    }

    /// Install missing prerequisites.
    ///
    /// The selector is shown only when the run and the UI are both
    /// interactive; otherwise everything missing is installed. Returns
    /// `Ok(false)` when nothing was installed: nothing missing, no supported
    /// package manager, or a selection matching no missing prerequisite. Any single install
    /// failure aborts with `PrereqRemediation`.
    pub fn remediate(
        &self,
        host: &HostInfo,
        policy: &CompatibilityPolicy,
        interactive: bool,
        install_all: bool,
        ui: &mut dyn UserInterface,
    ) -> Result<bool> {
        let missing = &host.prerequisites.missing;
        if missing.is_empty() {
            return Ok(false);
        }

        let Some(kind) = ManagerKind::for_host(host) else {
            tracing::warn!("No package manager for {}", host.describe());
            ui.warning(&format!(
                "Cannot install prerequisites on {}: no supported package manager",
                host.describe()
            ));
            return Ok(false);
        };

        let selected = if interactive && ui.is_interactive() && !install_all {
            self.select(host, ui)?
        } else {
            missing.clone()
        };

        // Declared order, regardless of selection order.
        let wanted: Vec<&String> = if selected.iter().any(|code| code == ALL) {
            missing.iter().collect()
        } else {
            missing.iter().filter(|code| selected.contains(code)).collect()
        };
        if wanted.is_empty() {
            ui.message("No prerequisites selected");
            return Ok(false);
        }

        let resolver = PackageResolver::new(self.map, kind, &host.distro);
        let manager = create_manager(kind, self.runtime.clone());

        for code in wanted {
            let hint = host
                .prerequisites
                .statuses
                .get(code)
                .map(|s| s.install_hint.clone())
                .filter(|h| !h.is_empty());
            let package = policy
                .prerequisite(code)
                .map(|spec| spec.package_code().to_string())
                .unwrap_or_else(|| code.clone());

            let mut spinner = ui.start_spinner(&format!("Installing {} via {}", code, kind));
            let result = resolver
                .resolve(&package, "")
                .and_then(|request| manager.install_package(&request));

            if let Err(e) = result {
                spinner.finish_error(&format!("Failed to install {}", code));
                return Err(DotstrapError::PrereqRemediation {
                    message: format!("{}: {}", code, e),
                    hint,
                });
            }
            spinner.finish_success(&format!("Installed {}", code));
        }

        Ok(true)
    }

    fn select(&self, host: &HostInfo, ui: &mut dyn UserInterface) -> Result<Vec<String>> {
        let options = host
            .prerequisites
            .missing
            .iter()
            .map(|code| {
                let label = match host.prerequisites.statuses.get(code) {
                    Some(status) if !status.description.is_empty() => {
                        format!("{} - {}", code, status.description)
                    }
                    _ => code.clone(),
                };
                PromptOption::new(&label, code)
            })
            .collect();

        let prompt = Prompt::new(
            SELECT_PROMPT_KEY,
            "Select prerequisites to install",
            PromptType::MultiSelect { options },
        )
        .with_default(ALL);

        Ok(ui.prompt(&prompt)?.into_strings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Os, PrerequisiteStatus};
    use crate::shell::{CommandOutput, DisplayMode, Escalation, RecordingCommander};
    use crate::ui::{MockUI, NonInteractiveUI};
    use std::collections::HashMap;
    use std::sync::Arc;

    const POLICY: &str = r#"
operatingSystems:
  linux:
    supported: true
prerequisites:
  - code: curl
    command: curl
    install_hint: sudo apt-get install curl
  - code: git
    command: git
    description: Version control
  - code: development-tools
    command: cc
"#;

    const MAP: &str = r#"
packages:
  curl:
    apt:
      name: curl
    dnf:
      name: curl
  git:
    apt:
      name: git
    dnf:
      name: git
  development-tools:
    dnf:
      type: group
      name:
        fedora: Development Tools
"#;

    fn host(distro: &str, missing: &[&str]) -> HostInfo {
        let mut host = HostInfo::new(Os::Linux, distro, "amd64");
        for code in missing {
            host.prerequisites.record(
                code,
                PrerequisiteStatus {
                    available: false,
                    description: String::new(),
                    install_hint: format!("install {}", code),
                    probe_command: code.to_string(),
                },
            );
        }
        host
    }

    fn fixture() -> (CompatibilityPolicy, PackageMap, Arc<RecordingCommander>) {
        (
            CompatibilityPolicy::from_yaml(POLICY).unwrap(),
            PackageMap::from_yaml(MAP).unwrap(),
            Arc::new(RecordingCommander::new()),
        )
    }

    fn runtime(commander: &Arc<RecordingCommander>) -> ManagerRuntime {
        ManagerRuntime::new(commander.clone(), Escalation::Sudo, DisplayMode::Plain)
    }

    #[test]
    fn nothing_missing_returns_false() {
        let (policy, map, commander) = fixture();
        let installer = PrerequisiteInstaller::new(&map, runtime(&commander));
        let mut ui = MockUI::new();
        let done = installer
            .remediate(&host("ubuntu", &[]), &policy, false, false, &mut ui)
            .unwrap();
        assert!(!done);
        assert!(commander.history().is_empty());
    }

    #[test]
    fn installs_group_on_fedora() {
        let (policy, map, commander) = fixture();
        let installer = PrerequisiteInstaller::new(&map, runtime(&commander));
        let mut ui = MockUI::new();
        let done = installer
            .remediate(
                &host("fedora", &["development-tools"]),
                &policy,
                false,
                false,
                &mut ui,
            )
            .unwrap();
        assert!(done);
        assert_eq!(
            commander.history(),
            [r#"sudo dnf group install -y "Development Tools""#]
        );
    }

    #[test]
    fn unsupported_manager_warns() {
        let (policy, map, commander) = fixture();
        let installer = PrerequisiteInstaller::new(&map, runtime(&commander));
        let mut ui = MockUI::new();
        let done = installer
            .remediate(&host("arch", &["git"]), &policy, false, false, &mut ui)
            .unwrap();
        assert!(!done);
        assert!(ui.has_warning("no supported package manager"));
        assert!(commander.history().is_empty());
    }

    #[test]
    fn interactive_selection_limits_installs() {
        let (policy, map, commander) = fixture();
        let installer = PrerequisiteInstaller::new(&map, runtime(&commander));
        let mut ui = MockUI::interactive();
        ui.set_prompt_response(SELECT_PROMPT_KEY, "git");
        installer
            .remediate(&host("ubuntu", &["curl", "git"]), &policy, true, false, &mut ui)
            .unwrap();
        assert_eq!(commander.history(), ["sudo apt-get install -y git"]);
        assert_eq!(ui.prompts_shown(), [SELECT_PROMPT_KEY]);
    }

    #[test]
    fn install_all_skips_selector_and_keeps_order() {
        let (policy, map, commander) = fixture();
        let installer = PrerequisiteInstaller::new(&map, runtime(&commander));
        let mut ui = MockUI::interactive();
        installer
            .remediate(&host("ubuntu", &["curl", "git"]), &policy, true, true, &mut ui)
            .unwrap();
        assert!(ui.prompts_shown().is_empty());
        assert_eq!(
            commander.history(),
            ["sudo apt-get install -y curl", "sudo apt-get install -y git"]
        );
    }

    #[test]
    fn empty_selection_installs_nothing() {
        let (policy, map, commander) = fixture();
        let installer = PrerequisiteInstaller::new(&map, runtime(&commander));
        let mut ui = MockUI::interactive();
        ui.set_prompt_response(SELECT_PROMPT_KEY, "");
        let done = installer
            .remediate(&host("ubuntu", &["curl"]), &policy, true, false, &mut ui)
            .unwrap();
        assert!(!done);
        assert!(commander.history().is_empty());
    }

    #[test]
    fn interactive_run_without_terminal_installs_everything() {
        let (policy, map, commander) = fixture();
        let installer = PrerequisiteInstaller::new(&map, runtime(&commander));
        let mut ui = NonInteractiveUI::with_overrides(HashMap::new());
        let done = installer
            .remediate(&host("ubuntu", &["curl", "git"]), &policy, true, false, &mut ui)
            .unwrap();
        assert!(done);
        assert_eq!(
            commander.history(),
            ["sudo apt-get install -y curl", "sudo apt-get install -y git"]
        );
    }

    #[test]
    fn star_selection_installs_everything() {
        let (policy, map, commander) = fixture();
        let installer = PrerequisiteInstaller::new(&map, runtime(&commander));
        let mut ui = MockUI::interactive();
        let done = installer
            .remediate(&host("ubuntu", &["curl", "git"]), &policy, true, false, &mut ui)
            .unwrap();
        assert!(done);
        assert_eq!(ui.prompts_shown(), [SELECT_PROMPT_KEY]);
        assert_eq!(commander.history().len(), 2);
    }

    #[test]
    fn selection_matching_nothing_installs_nothing() {
        let (policy, map, commander) = fixture();
        let installer = PrerequisiteInstaller::new(&map, runtime(&commander));
        let mut ui = MockUI::interactive();
        ui.set_prompt_response(SELECT_PROMPT_KEY, "wget");
        let done = installer
            .remediate(&host("ubuntu", &["curl"]), &policy, true, false, &mut ui)
            .unwrap();
        assert!(!done);
        assert!(ui.has_message("No prerequisites selected"));
        assert!(commander.history().is_empty());
    }

    #[test]
    fn first_failure_aborts_with_hint() {
        let (policy, map, commander) = fixture();
        commander.respond(
            "sudo apt-get install -y curl",
            CommandOutput::failed(100, "E: broken"),
        );
        let installer = PrerequisiteInstaller::new(&map, runtime(&commander));
        let mut ui = MockUI::new();
        let err = installer
            .remediate(&host("ubuntu", &["curl", "git"]), &policy, false, false, &mut ui)
            .unwrap_err();
        assert!(matches!(err, DotstrapError::PrereqRemediation { .. }));
        assert_eq!(err.hint().as_deref(), Some("install curl"));
        assert!(!commander.ran("sudo apt-get install -y git"));
    }

    #[test]
    fn missing_distro_mapping_aborts() {
        let (policy, map, commander) = fixture();
        let installer = PrerequisiteInstaller::new(&map, runtime(&commander));
        let mut ui = MockUI::new();
        let err = installer
            .remediate(
                &host("centos", &["development-tools"]),
                &policy,
                false,
                false,
                &mut ui,
            )
            .unwrap_err();
        assert!(err.to_string().contains("centos"));
    }
}
