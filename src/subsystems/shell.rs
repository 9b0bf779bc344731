//! Preferred shell installer.
//!
//! Only makes the shell binary available. The login shell is left alone.

use super::{Subsystem, SubsystemContext, SubsystemState};
use crate::error::{DotstrapError, Result};
use crate::packages::PackageRequest;
use crate::ui::UserInterface;

/// Default shell when none is configured.
pub const DEFAULT_SHELL: &str = "zsh";

const NAME: &str = "shell";

/// Installs the user's preferred shell.
pub struct ShellInstaller<'a> {
    ctx: SubsystemContext<'a>,
    shell: String,
    state: SubsystemState,
}

impl<'a> ShellInstaller<'a> {
    pub fn new(ctx: SubsystemContext<'a>, shell: &str) -> Self {
        Self {
            ctx,
            shell: shell.to_string(),
            state: SubsystemState::Unknown,
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Shells missing from the package map install under their own name.
    fn install_shell(&self) -> Result<()> {
        match self.ctx.resolve(NAME, &self.shell) {
            Ok((kind, request)) => self.ctx.install_request(kind, &request),
            Err(DotstrapError::NoMapping { manager: None, .. }) => {
                let kind = self.ctx.manager_kind().ok_or_else(|| {
                    DotstrapError::subsystem(NAME, "no package manager available")
                })?;
                tracing::debug!("No mapping for {}; installing by name", self.shell);
                self.ctx
                    .install_request(kind, &PackageRequest::named(&self.shell))
            }
            Err(e) => Err(e),
        }
    }
}

impl Subsystem for ShellInstaller<'_> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn state(&self) -> SubsystemState {
        self.state
    }

    fn is_available(&self) -> Result<bool> {
        Ok(self.ctx.which(&self.shell).is_some())
    }

    fn install(&mut self, ui: &mut dyn UserInterface) -> Result<()> {
        if self.shell.trim().is_empty() {
            return Err(DotstrapError::subsystem(NAME, "no shell requested"));
        }
        if self.is_available()? {
            self.state.advance(SubsystemState::Available);
            ui.success(&format!("{} is already installed", self.shell));
            return Ok(());
        }

        self.state.advance(SubsystemState::Missing);
        self.state.advance(SubsystemState::Installing);
        let mut spinner = ui.start_spinner(&format!("Installing {}", self.shell));
        let result = self.install_shell();
        self.state.settle(&result);
        match &result {
            Ok(()) => spinner.finish_success(&format!("Installed {}", self.shell)),
            Err(_) => spinner.finish_error(&format!("Failed to install {}", self.shell)),
        }
        result
    }
}
