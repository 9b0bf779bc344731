//! dotstrap - Bootstrap a fresh workstation with your dotfiles.
//!
//! dotstrap detects the host, checks it against a compatibility policy,
//! installs missing prerequisites and then brings up Homebrew, the preferred
//! shell, GPG and the dotfiles engine in a fixed order.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Compatibility policy, package map and installer config
//! - [`error`] - Error types and result aliases
//! - [`gate`] - Compatibility verdicts
//! - [`host`] - Host detection and prerequisite probing
//! - [`net`] - Script downloads
//! - [`orchestrator`] - The install sequence
//! - [`packages`] - Package manager adapters and name resolution
//! - [`prereq`] - Prerequisite remediation
//! - [`shell`] - External command execution and PATH handling
//! - [`subsystems`] - Homebrew, shell, GPG and dotfiles installers
//! - [`ui`] - Interactive prompts, spinners, and terminal output
//!
//! # Example
//!
//! ```
//! use dotstrap::config::load_policy;
//! use dotstrap::gate::CompatibilityGate;
//! use dotstrap::host::{HostInfo, Os};
//!
//! let policy = load_policy(None).unwrap();
//! let host = HostInfo::new(Os::Linux, "ubuntu", "amd64");
//! assert!(CompatibilityGate::new(&policy).check(&host).is_ok());
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod host;
pub mod net;
pub mod orchestrator;
pub mod packages;
pub mod prereq;
pub mod shell;
pub mod subsystems;
pub mod ui;

pub use error::{DotstrapError, Result};
