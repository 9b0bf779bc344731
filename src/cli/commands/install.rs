//! Install command implementation.
//!
//! The `dotstrap install` command merges the installer config with the CLI
//! flags (flags win) and hands the result to the [`Orchestrator`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::args::InstallArgs;
use crate::config::{load_package_map, load_policy, InstallerConfig, WorkIdentity};
use crate::error::{DotstrapError, Result};
use crate::host::HostProbe;
use crate::orchestrator::{Collaborators, InstallOptions, Orchestrator, RunReport};
use crate::subsystems::dotfiles::ENGINE_INSTALL_URL;
use crate::subsystems::shell::DEFAULT_SHELL;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, Settings};

/// The install command implementation.
pub struct InstallCommand {
    settings: Settings,
    args: InstallArgs,
}

impl InstallCommand {
    /// Create a new install command.
    pub fn new(settings: Settings, args: InstallArgs) -> Self {
        Self { settings, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &InstallArgs {
        &self.args
    }

    /// Load the installer config. An explicit path must exist.
    fn load_config(&self, home: &Path) -> Result<InstallerConfig> {
        match &self.settings.config {
            Some(path) if !path.exists() => Err(DotstrapError::ConfigNotFound { path: path.clone() }),
            Some(path) => InstallerConfig::load(path),
            None => InstallerConfig::load(&InstallerConfig::default_path(home)),
        }
    }

    /// Merge config values and flags into run options.
    pub fn options(&self, config: InstallerConfig) -> InstallOptions {
        let args = &self.args;

        let mut personal = config.personal;
        if let Some(name) = &args.name {
            personal.name = name.clone();
        }
        if let Some(email) = &args.email {
            personal.email = email.clone();
        }

        let work_flags = args.work_env.is_some() || args.work_name.is_some() || args.work_email.is_some();
        let work = if work_flags {
            let mut work = config.work.unwrap_or_else(WorkIdentity::default);
            if let Some(env) = &args.work_env {
                work.env = env.clone();
            }
            if let Some(name) = &args.work_name {
                work.name = name.clone();
            }
            if let Some(email) = &args.work_email {
                work.email = email.clone();
            }
            Some(work)
        } else {
            config.work
        };

        let mut dotfiles = config.dotfiles;
        if let Some(repo) = &args.repo {
            dotfiles.repo = repo.clone();
        }
        if let Some(branch) = &args.branch {
            dotfiles.branch = branch.clone();
        }
        if let Some(protocol) = args.git_clone_protocol {
            dotfiles.clone_protocol = protocol;
        }

        InstallOptions {
            shell: args
                .shell
                .clone()
                .or(config.shell)
                .unwrap_or_else(|| DEFAULT_SHELL.to_string()),
            install_brew: args.install_brew,
            install_prerequisites: args.install_prerequisites,
            interactive: self.settings.interactive,
            display: self.settings.display,
            personal,
            work,
            dotfiles,
            command_timeout: args.timeout.map(Duration::from_secs),
            engine_install_url: args
                .engine_install_url
                .clone()
                .unwrap_or_else(|| ENGINE_INSTALL_URL.to_string()),
        }
    }
}

impl Command for InstallCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let policy = load_policy(self.settings.compat_config.as_deref())?;
        let map = load_package_map(self.settings.package_map.as_deref())?;
        let collaborators = Collaborators::system()?;
        let config = self.load_config(&collaborators.dirs.home)?;
        let options = self.options(config);
        tracing::debug!("Install options: {:?}", options);

        let detector = HostProbe::system();
        let mut orchestrator = Orchestrator::new(&policy, &map, &detector, collaborators, options);
        let mut report = RunReport::default();
        orchestrator.run(ui, &mut report)?;

        summarize(&report, ui);
        Ok(CommandResult::success())
    }
}

fn summarize(report: &RunReport, ui: &mut dyn UserInterface) {
    ui.message("");
    for (name, state) in &report.subsystems {
        ui.message(&format!("  {:<10} {}", name, state));
    }
    if let Some(path) = report.config_path.as_ref().map(PathBuf::as_path) {
        ui.message(&format!("  {:<10} {}", "config", path.display()));
    }
}
