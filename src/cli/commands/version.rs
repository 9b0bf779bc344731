//! Version command implementation.

use crate::error::Result;
use crate::host::{normalize_arch, Os};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The version command implementation.
#[derive(Debug, Default)]
pub struct VersionCommand;

impl VersionCommand {
    pub fn new() -> Self {
        Self
    }

    /// `dotstrap <version>` and the build target.
    pub fn lines() -> Vec<String> {
        vec![
            format!("dotstrap {}", env!("CARGO_PKG_VERSION")),
            format!(
                "target: {}/{}",
                Os::from_target(std::env::consts::OS),
                normalize_arch(std::env::consts::ARCH)
            ),
        ]
    }
}

impl Command for VersionCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        for line in Self::lines() {
            ui.message(&line);
        }
        Ok(CommandResult::success())
    }
}
