//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CloneProtocol;

/// dotstrap - Bootstrap a fresh workstation with your dotfiles.
#[derive(Debug, Parser)]
#[command(name = "dotstrap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Installer config (default: ~/.config/dotstrap/config.yaml)
    #[arg(short, long, global = true, env = "DOTSTRAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Compatibility config replacing the embedded one
    #[arg(long, global = true, value_name = "PATH")]
    pub compat_config: Option<PathBuf>,

    /// Package map replacing the embedded one
    #[arg(long, global = true, value_name = "PATH")]
    pub package_map: Option<PathBuf>,

    /// Verbose output (-v info, -vv debug); streams command output
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Show spinners while commands run
    #[arg(long, global = true)]
    pub progress: bool,

    /// Never prompt; use config values and defaults
    #[arg(long, global = true)]
    pub non_interactive: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install the package manager, shell, GPG and dotfiles
    Install(InstallArgs),

    /// Check whether this host is supported
    CheckCompatibility(CheckArgs),

    /// Show version information
    Version,
}

/// Arguments for the `install` command.
#[derive(Debug, Clone, clap::Args)]
pub struct InstallArgs {
    /// Preferred shell [default: zsh]
    #[arg(long)]
    pub shell: Option<String>,

    /// Bootstrap Homebrew
    #[arg(long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
    pub install_brew: bool,

    /// Install all missing prerequisites without asking
    #[arg(long)]
    pub install_prerequisites: bool,

    /// Protocol used to clone the dotfiles repository
    #[arg(long, value_enum)]
    pub git_clone_protocol: Option<CloneProtocol>,

    /// Your full name
    #[arg(long)]
    pub name: Option<String>,

    /// Your email address
    #[arg(long)]
    pub email: Option<String>,

    /// GitHub username or dotfiles repository URL
    #[arg(long)]
    pub repo: Option<String>,

    /// Branch of the dotfiles repository
    #[arg(long)]
    pub branch: Option<String>,

    /// Work environment label
    #[arg(long, value_name = "ENV")]
    pub work_env: Option<String>,

    /// Name used for work commits
    #[arg(long)]
    pub work_name: Option<String>,

    /// Email used for work commits
    #[arg(long)]
    pub work_email: Option<String>,

    /// Kill external commands after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Fetch the chezmoi install script from this URL
    #[arg(long, value_name = "URL", env = "DOTSTRAP_ENGINE_INSTALL_URL")]
    pub engine_install_url: Option<String>,
}

impl Default for InstallArgs {
    fn default() -> Self {
        Self {
            shell: None,
            install_brew: true,
            install_prerequisites: false,
            git_clone_protocol: None,
            name: None,
            email: None,
            repo: None,
            branch: None,
            work_env: None,
            work_name: None,
            work_email: None,
            timeout: None,
            engine_install_url: None,
        }
    }
}

/// Arguments for the `check-compatibility` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CheckArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
