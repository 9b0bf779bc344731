//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`Settings`] for the global flags every command sees
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::PathBuf;

use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::shell::{is_ci, DisplayMode};
use crate::ui::UserInterface;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command.
    ///
    /// # Arguments
    ///
    /// * `ui` - User interface for displaying output and prompts
    ///
    /// # Returns
    ///
    /// A [`CommandResult`] indicating success/failure and exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Global flags resolved once per invocation.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub config: Option<PathBuf>,
    pub compat_config: Option<PathBuf>,
    pub package_map: Option<PathBuf>,
    pub display: DisplayMode,
    pub interactive: bool,
}

impl Settings {
    /// Resolve the global flags. CI environments are never interactive.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            compat_config: cli.compat_config.clone(),
            package_map: cli.package_map.clone(),
            display: DisplayMode::from_flags(cli.verbose, cli.progress),
            interactive: !cli.non_interactive && !is_ci(),
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    settings: Settings,
}

impl CommandDispatcher {
    /// Create a new dispatcher with the resolved global flags.
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Commands::Install(args) => {
                let cmd = super::install::InstallCommand::new(self.settings.clone(), args.clone());
                cmd.execute(ui)
            }
            Commands::CheckCompatibility(args) => {
                let cmd = super::check::CheckCommand::new(self.settings.clone(), args.clone());
                cmd.execute(ui)
            }
            Commands::Version => super::version::VersionCommand::new().execute(ui),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn command_result_success() {
        let result = CommandResult::success();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn command_result_failure() {
        let result = CommandResult::failure(1);
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
    }

    #[test]
    fn settings_follow_flags() {
        let cli = Cli::parse_from([
            "dotstrap",
            "--non-interactive",
            "--progress",
            "--compat-config",
            "/tmp/compat.yaml",
            "version",
        ]);
        let settings = Settings::from_cli(&cli);
        assert!(!settings.interactive);
        assert_eq!(settings.display, DisplayMode::Progress);
        assert_eq!(
            settings.compat_config.as_deref(),
            Some(std::path::Path::new("/tmp/compat.yaml"))
        );
    }

    #[test]
    fn verbosity_wins_over_progress() {
        let cli = Cli::parse_from(["dotstrap", "-v", "--progress", "version"]);
        assert_eq!(Settings::from_cli(&cli).display, DisplayMode::Passthrough);
    }
}
