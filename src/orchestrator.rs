//! Install orchestration.
//!
//! One `install` run walks a fixed sequence of stages:
//!
//! ```text
//! Detected → [BrewReady on darwin] → Compatible → PrereqsOk
//!          → [BrewReady on linux] → ShellReady → GpgReady → DotfilesReady → Done
//! ```
//!
//! Stages run strictly in order and the first error ends the run, so no
//! subsystem is touched after an earlier one failed. The only retry is the
//! compatibility re-check after prerequisites were installed, done once.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CompatibilityPolicy, DotfilesSource, Identity, PackageMap, WorkIdentity};
use crate::error::{DotstrapError, Result};
use crate::gate::CompatibilityGate;
use crate::host::{Detector, HostInfo};
use crate::net::{Fetcher, HttpFetcher};
use crate::packages::ManagerRuntime;
use crate::prereq::PrerequisiteInstaller;
use crate::shell::{
    Commander, DisplayMode, Escalation, PathEnv, ProcessPath, SystemCommander,
};
use crate::subsystems::dotfiles::ENGINE_INSTALL_URL;
use crate::subsystems::shell::DEFAULT_SHELL;
use crate::subsystems::{
    BrewBootstrap, BrewLayout, DotfilesEngine, DotfilesUserData, GpgInstaller, GpgKeys,
    ShellInstaller, Subsystem, SubsystemContext, SubsystemState, UserDirs,
};
use crate::ui::{Prompt, PromptType, UserInterface};

/// Prompt keys used to complete the identity in interactive runs.
pub const NAME_PROMPT_KEY: &str = "name";
pub const EMAIL_PROMPT_KEY: &str = "email";
pub const REPO_PROMPT_KEY: &str = "dotfiles_repo";

/// Everything the user chose for this run.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Preferred shell binary.
    pub shell: String,
    /// Bootstrap Homebrew.
    pub install_brew: bool,
    /// Install every missing prerequisite without asking.
    pub install_prerequisites: bool,
    pub interactive: bool,
    pub display: DisplayMode,
    pub personal: Identity,
    pub work: Option<WorkIdentity>,
    pub dotfiles: DotfilesSource,
    /// Kill external commands running longer than this.
    pub command_timeout: Option<Duration>,
    /// Where the engine install script is fetched from.
    pub engine_install_url: String,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            install_brew: true,
            install_prerequisites: false,
            interactive: false,
            display: DisplayMode::default(),
            personal: Identity::default(),
            work: None,
            dotfiles: DotfilesSource::default(),
            command_timeout: None,
            engine_install_url: ENGINE_INSTALL_URL.to_string(),
        }
    }
}

/// Collaborators injected into a run.
#[derive(Clone)]
pub struct Collaborators {
    pub commander: Arc<dyn Commander>,
    pub path: Arc<dyn PathEnv>,
    pub fetcher: Arc<dyn Fetcher>,
    pub escalation: Escalation,
    pub dirs: UserDirs,
    /// Overrides the canonical Homebrew prefix.
    pub brew_layout: Option<BrewLayout>,
}

impl Collaborators {
    /// The real system: child processes, process PATH, HTTPS.
    pub fn system() -> Result<Self> {
        Ok(Self {
            commander: Arc::new(SystemCommander::new()),
            path: Arc::new(ProcessPath::new()),
            fetcher: Arc::new(HttpFetcher::new()?),
            escalation: Escalation::detect(),
            dirs: UserDirs::detect()?,
            brew_layout: None,
        })
    }
}

/// Position in the install sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Detected,
    /// Homebrew present; entered before `Compatible` on darwin, after `PrereqsOk` on linux.
    BrewReady,
    Compatible,
    PrereqsOk,
    ShellReady,
    GpgReady,
    DotfilesReady,
    Done,
}

/// Outcome of a completed or failed run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// The detection record the subsystems ran against.
    pub host: Option<HostInfo>,
    /// Whether prerequisites were installed.
    pub remediated: bool,
    /// Final state per subsystem, in run order.
    pub subsystems: Vec<(String, SubsystemState)>,
    pub signing_key: Option<String>,
    /// Engine config written by the run.
    pub config_path: Option<PathBuf>,
}

impl RunReport {
    /// Final state of a subsystem, if it ran.
    pub fn state(&self, name: &str) -> Option<SubsystemState> {
        self.subsystems
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, state)| *state)
    }

    fn record(&mut self, subsystem: &dyn Subsystem) {
        let name = subsystem.name().to_string();
        let state = subsystem.state();
        match self.subsystems.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = state,
            None => self.subsystems.push((name, state)),
        }
    }
}

/// Runs the `install` sequence.
pub struct Orchestrator<'a> {
    policy: &'a CompatibilityPolicy,
    map: &'a PackageMap,
    detector: &'a dyn Detector,
    collaborators: Collaborators,
    options: InstallOptions,
    stage: Stage,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        policy: &'a CompatibilityPolicy,
        map: &'a PackageMap,
        detector: &'a dyn Detector,
        collaborators: Collaborators,
        options: InstallOptions,
    ) -> Self {
        Self {
            policy,
            map,
            detector,
            collaborators,
            options,
            stage: Stage::Start,
        }
    }

    /// The last stage reached.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run every stage. `report` is filled as far as the run got.
    pub fn run(&mut self, ui: &mut dyn UserInterface, report: &mut RunReport) -> Result<()> {
        ui.show_header("dotstrap install");

        let host = self.detector.detect(self.policy)?;
        self.enter(Stage::Detected);
        ui.message(&format!("Detected {}", host.describe()));

        // Prerequisites on darwin install through brew.
        if self.options.install_brew && host.is_darwin() {
            self.bootstrap_brew(&host, ui, report)?;
            self.enter(Stage::BrewReady);
        }

        let host = self.ensure_compatible(host, ui, report)?;
        self.enter(Stage::Compatible);
        self.enter(Stage::PrereqsOk);
        report.host = Some(host.clone());

        if self.options.install_brew && host.is_linux() {
            self.bootstrap_brew(&host, ui, report)?;
            self.enter(Stage::BrewReady);
        }

        self.complete_identity(ui)?;

        self.install_shell(&host, ui, report)?;
        self.enter(Stage::ShellReady);

        report.signing_key = self.install_gpg(&host, ui, report)?;
        self.enter(Stage::GpgReady);

        self.install_dotfiles(&host, ui, report)?;
        self.enter(Stage::DotfilesReady);

        self.enter(Stage::Done);
        ui.success("Bootstrap complete");
        Ok(())
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!("Stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    fn runtime(&self) -> ManagerRuntime {
        let mut runtime = ManagerRuntime::new(
            self.collaborators.commander.clone(),
            self.collaborators.escalation,
            self.options.display,
        );
        runtime.timeout = self.options.command_timeout;
        runtime
    }

    fn context<'h>(&'h self, host: &'h HostInfo) -> SubsystemContext<'h> {
        SubsystemContext {
            host,
            map: self.map,
            runtime: self.runtime(),
            path: self.collaborators.path.clone(),
            fetcher: self.collaborators.fetcher.clone(),
            dirs: self.collaborators.dirs.clone(),
        }
    }

    /// Gate check, then prerequisites. An unsupported host stops here;
    /// missing prerequisites are remediated and re-checked exactly once.
    fn ensure_compatible(
        &self,
        host: HostInfo,
        ui: &mut dyn UserInterface,
        report: &mut RunReport,
    ) -> Result<HostInfo> {
        let gate = CompatibilityGate::new(self.policy);
        gate.check(&host)?;
        let err = match verdict(&gate, &host) {
            Ok(()) => {
                ui.success(&format!("{} is compatible", host.describe()));
                return Ok(host);
            }
            Err(e) => e,
        };
        ui.warning(&format!(
            "Missing prerequisites: {}",
            host.prerequisites.missing.join(", ")
        ));

        let installer = PrerequisiteInstaller::new(self.map, self.runtime());
        let remediated = installer.remediate(
            &host,
            self.policy,
            self.options.interactive,
            self.options.install_prerequisites,
            ui,
        )?;
        if !remediated {
            return Err(err);
        }
        report.remediated = true;

        let host = self.detector.detect(self.policy)?;
        verdict(&gate, &host)?;
        ui.success(&format!("{} is compatible", host.describe()));
        Ok(host)
    }

    fn bootstrap_brew(
        &self,
        host: &HostInfo,
        ui: &mut dyn UserInterface,
        report: &mut RunReport,
    ) -> Result<()> {
        let ctx = self.context(host);
        let mut brew = match &self.collaborators.brew_layout {
            Some(layout) => BrewBootstrap::with_layout(ctx, layout.clone()),
            None => BrewBootstrap::new(ctx),
        };
        let result = brew.install(ui);
        report.record(&brew);
        result
    }

    /// Ask for identity values the config and flags left empty.
    fn complete_identity(&mut self, ui: &mut dyn UserInterface) -> Result<()> {
        if !self.options.interactive || !ui.is_interactive() {
            return Ok(());
        }
        if self.options.personal.name.trim().is_empty() {
            self.options.personal.name = ask(ui, NAME_PROMPT_KEY, "Your full name")?;
        }
        if self.options.personal.email.trim().is_empty() {
            self.options.personal.email = ask(ui, EMAIL_PROMPT_KEY, "Your email address")?;
        }
        if self.options.dotfiles.repo.trim().is_empty() {
            self.options.dotfiles.repo = ask(
                ui,
                REPO_PROMPT_KEY,
                "GitHub username or dotfiles repository URL",
            )?;
        }
        Ok(())
    }

    fn install_shell(
        &self,
        host: &HostInfo,
        ui: &mut dyn UserInterface,
        report: &mut RunReport,
    ) -> Result<()> {
        let mut shell = ShellInstaller::new(self.context(host), &self.options.shell);
        let result = shell.install(ui);
        report.record(&shell);
        result
    }

    fn install_gpg(
        &self,
        host: &HostInfo,
        ui: &mut dyn UserInterface,
        report: &mut RunReport,
    ) -> Result<Option<String>> {
        let mut gpg = GpgInstaller::new(self.context(host));
        let result = gpg.install(ui);
        report.record(&gpg);
        result?;

        GpgKeys::new(self.context(host)).provision(ui, &self.options.personal)
    }

    fn install_dotfiles(
        &self,
        host: &HostInfo,
        ui: &mut dyn UserInterface,
        report: &mut RunReport,
    ) -> Result<()> {
        let mut engine = DotfilesEngine::new(self.context(host))
            .with_install_url(&self.options.engine_install_url);
        let result = engine.install(ui);
        report.record(&engine);
        result?;

        let data = DotfilesUserData::new(
            &self.options.personal,
            report.signing_key.clone(),
            &self.options.shell,
            host,
            self.options.work.clone(),
        );
        let path = engine.initialize(&data)?;
        ui.success(&format!("Wrote {}", path.display()));
        report.config_path = Some(path);

        let mut spinner = ui.start_spinner(&format!(
            "Applying dotfiles from {}",
            self.options.dotfiles.repo
        ));
        match engine.apply(&self.options.dotfiles) {
            Ok(()) => {
                spinner.finish_success("Dotfiles applied");
                Ok(())
            }
            Err(e) => {
                spinner.finish_error("Applying dotfiles failed");
                Err(e)
            }
        }
    }
}

/// Supported OS and distro, and no prerequisite missing.
fn verdict(gate: &CompatibilityGate<'_>, host: &HostInfo) -> Result<()> {
    gate.check(host)?;
    if host.prerequisites.all_available() {
        return Ok(());
    }
    Err(DotstrapError::PrereqRemediation {
        message: format!("missing {}", host.prerequisites.missing.join(", ")),
        hint: Some(host.prerequisites.missing_hints()).filter(|h| !h.is_empty()),
    })
}

fn ask(ui: &mut dyn UserInterface, key: &str, question: &str) -> Result<String> {
    let answer = ui.prompt(&Prompt::new(key, question, PromptType::Input))?;
    Ok(answer.as_string().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CloneProtocol;
    use crate::host::{Os, PrerequisiteStatus, SequenceDetector};
    use crate::net::MemoryFetcher;
    use crate::shell::{CommandOutput, MemoryPath, RecordingCommander};
    use crate::ui::MockUI;

    const POLICY: &str = r#"
operatingSystems:
  darwin:
    supported: true
  linux:
    supported: true
    distributions:
      ubuntu:
        supported: true
      arch:
        supported: false
        notes: not yet
prerequisites:
  - code: git
    command: git
    install_hint: sudo apt-get install git
"#;

    const MAP: &str = r#"
packages:
  git:
    apt:
      name: git
  gpg:
    apt:
      name: gnupg2
  zsh:
    apt:
      name: zsh
  chezmoi:
    apt:
      name: chezmoi
"#;

    struct Harness {
        policy: CompatibilityPolicy,
        map: PackageMap,
        commander: Arc<RecordingCommander>,
        fetcher: Arc<MemoryFetcher>,
        home: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                policy: CompatibilityPolicy::from_yaml(POLICY).unwrap(),
                map: PackageMap::from_yaml(MAP).unwrap(),
                commander: Arc::new(RecordingCommander::new()),
                fetcher: Arc::new(MemoryFetcher::new()),
                home: tempfile::TempDir::new().unwrap(),
            }
        }

        fn collaborators(&self) -> Collaborators {
            Collaborators {
                commander: self.commander.clone(),
                path: Arc::new(MemoryPath::new(["/nonexistent/bin"])),
                fetcher: self.fetcher.clone(),
                escalation: Escalation::Sudo,
                dirs: UserDirs::new(self.home.path()),
                brew_layout: Some(BrewLayout::new(self.home.path().join("brew"))),
            }
        }

        fn options(&self) -> InstallOptions {
            InstallOptions {
                install_brew: false,
                personal: Identity {
                    name: "Jane Doe".into(),
                    email: "jane@example.com".into(),
                },
                dotfiles: DotfilesSource {
                    repo: "janedoe".into(),
                    branch: "main".into(),
                    clone_protocol: CloneProtocol::Https,
                },
                ..InstallOptions::default()
            }
        }
    }

    fn ubuntu(missing: &[&str]) -> HostInfo {
        linux("ubuntu", missing)
    }

    fn linux(distro: &str, missing: &[&str]) -> HostInfo {
        let mut host = HostInfo::new(Os::Linux, distro, "amd64");
        for code in missing {
            host.prerequisites.record(
                code,
                PrerequisiteStatus {
                    available: false,
                    description: String::new(),
                    install_hint: format!("sudo apt-get install {}", code),
                    probe_command: code.to_string(),
                },
            );
        }
        host
    }

    #[test]
    fn default_options() {
        let options = InstallOptions::default();
        assert_eq!(options.shell, "zsh");
        assert!(options.install_brew);
        assert!(!options.install_prerequisites);
    }

    #[test]
    fn runs_every_stage_in_order() {
        let harness = Harness::new();
        let detector = SequenceDetector::new([ubuntu(&[])]);
        let mut orchestrator = Orchestrator::new(
            &harness.policy,
            &harness.map,
            &detector,
            harness.collaborators(),
            harness.options(),
        );
        let mut ui = MockUI::new();
        let mut report = RunReport::default();
        orchestrator.run(&mut ui, &mut report).unwrap();

        assert_eq!(orchestrator.stage(), Stage::Done);
        let order: Vec<&str> = report.subsystems.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(order, ["shell", "gpg", "dotfiles"]);
        let history = harness.commander.history();
        assert_eq!(history[0], "sudo apt-get install -y zsh");
        assert_eq!(history[1], "sudo apt-get install -y gnupg2");
        assert_eq!(history[2], "sudo apt-get install -y chezmoi");
        assert!(history[3].starts_with("chezmoi init --apply"));
        assert!(report.config_path.unwrap().ends_with(".config/chezmoi/chezmoi.toml"));
    }

    #[test]
    fn unsupported_distro_stops_before_any_install() {
        let harness = Harness::new();
        let detector = SequenceDetector::new([HostInfo::new(Os::Linux, "arch", "amd64")]);
        let mut orchestrator = Orchestrator::new(
            &harness.policy,
            &harness.map,
            &detector,
            harness.collaborators(),
            harness.options(),
        );
        let mut report = RunReport::default();
        let err = orchestrator
            .run(&mut MockUI::new(), &mut report)
            .unwrap_err();

        assert!(matches!(err, DotstrapError::Incompatible { .. }));
        assert_eq!(orchestrator.stage(), Stage::Detected);
        assert!(report.subsystems.is_empty());
        assert!(harness.commander.history().is_empty());
    }

    #[test]
    fn unsupported_distro_is_not_remediated() {
        let harness = Harness::new();
        let detector = SequenceDetector::new([linux("arch", &["git"])]);
        let mut orchestrator = Orchestrator::new(
            &harness.policy,
            &harness.map,
            &detector,
            harness.collaborators(),
            harness.options(),
        );
        let mut report = RunReport::default();
        let err = orchestrator
            .run(&mut MockUI::new(), &mut report)
            .unwrap_err();

        assert!(matches!(err, DotstrapError::Incompatible { .. }));
        assert!(!report.remediated);
        assert_eq!(detector.calls(), 1);
        assert!(harness.commander.history().is_empty());
    }

    #[test]
    fn interactive_run_without_terminal_installs_missing_prerequisites() {
        let harness = Harness::new();
        let detector = SequenceDetector::new([ubuntu(&["git"]), ubuntu(&[])]);
        let mut options = harness.options();
        options.interactive = true;
        let mut orchestrator = Orchestrator::new(
            &harness.policy,
            &harness.map,
            &detector,
            harness.collaborators(),
            options,
        );
        let mut ui = MockUI::new();
        let mut report = RunReport::default();
        orchestrator.run(&mut ui, &mut report).unwrap();

        assert!(report.remediated);
        assert!(ui.prompts_shown().is_empty());
        assert_eq!(harness.commander.history()[0], "sudo apt-get install -y git");
        assert_eq!(orchestrator.stage(), Stage::Done);
    }

    #[test]
    fn second_failed_check_is_terminal() {
        let harness = Harness::new();
        let detector = SequenceDetector::new([ubuntu(&["git"])]);
        let mut orchestrator = Orchestrator::new(
            &harness.policy,
            &harness.map,
            &detector,
            harness.collaborators(),
            harness.options(),
        );
        let mut report = RunReport::default();
        let err = orchestrator
            .run(&mut MockUI::new(), &mut report)
            .unwrap_err();

        assert!(matches!(err, DotstrapError::PrereqRemediation { .. }));
        assert_eq!(err.hint().as_deref(), Some("git: sudo apt-get install git"));
        assert!(report.remediated);
        assert_eq!(detector.calls(), 2);
        assert_eq!(harness.commander.history(), ["sudo apt-get install -y git"]);
    }

    #[test]
    fn failed_subsystem_stops_the_run() {
        let harness = Harness::new();
        harness.commander.respond(
            "sudo apt-get install -y gnupg2",
            CommandOutput::failed(100, "E: broken"),
        );
        let detector = SequenceDetector::new([ubuntu(&[])]);
        let mut orchestrator = Orchestrator::new(
            &harness.policy,
            &harness.map,
            &detector,
            harness.collaborators(),
            harness.options(),
        );
        let mut report = RunReport::default();
        assert!(orchestrator.run(&mut MockUI::new(), &mut report).is_err());

        assert_eq!(orchestrator.stage(), Stage::ShellReady);
        assert_eq!(report.state("gpg"), Some(SubsystemState::Failed));
        assert_eq!(report.state("dotfiles"), None);
        assert!(!harness.commander.ran("sudo apt-get install -y chezmoi"));
    }

    #[test]
    fn interactive_run_asks_for_missing_identity() {
        let harness = Harness::new();
        let detector = SequenceDetector::new([ubuntu(&[])]);
        let mut options = harness.options();
        options.interactive = true;
        options.personal = Identity::default();
        let mut orchestrator = Orchestrator::new(
            &harness.policy,
            &harness.map,
            &detector,
            harness.collaborators(),
            options,
        );
        let mut ui = MockUI::interactive();
        ui.set_prompt_response(NAME_PROMPT_KEY, "Jane Doe");
        ui.set_prompt_response(EMAIL_PROMPT_KEY, "jane@example.com");
        harness.commander.respond(
            "gpg --list-secret-keys",
            CommandOutput::ok("sec:u:4096:1:AAAA1111BBBB2222:1700000000:::u:::scESC::::::23::0:\n"),
        );

        let mut report = RunReport::default();
        orchestrator.run(&mut ui, &mut report).unwrap();

        assert_eq!(
            ui.prompts_shown(),
            [NAME_PROMPT_KEY, EMAIL_PROMPT_KEY, crate::subsystems::gpg::KEY_PROMPT_KEY]
        );
        assert_eq!(report.signing_key.as_deref(), Some("AAAA1111BBBB2222"));
        let config = std::fs::read_to_string(report.config_path.unwrap()).unwrap();
        assert!(config.contains("jane@example.com"));
        assert!(config.contains("AAAA1111BBBB2222"));
    }
}
