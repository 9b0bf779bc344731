//! Homebrew bootstrap.
//!
//! Brew lives at a fixed prefix per platform. When the binary is already
//! there the bootstrap only makes sure its directory leads PATH; otherwise
//! the official installer script is downloaded and run unattended.

use std::path::{Path, PathBuf};

use super::{command_failure, Subsystem, SubsystemContext, SubsystemState};
use crate::error::{DotstrapError, Result};
use crate::host::HostInfo;
use crate::net::download_script;
use crate::shell::{is_executable, CommandSpec};
use crate::ui::UserInterface;

/// Official Homebrew installer.
pub const BREW_INSTALL_URL: &str =
    "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";

const NAME: &str = "brew";

/// Where Homebrew is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrewLayout {
    prefix: PathBuf,
}

impl BrewLayout {
    /// Use an explicit prefix.
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The canonical prefix for a host.
    pub fn for_host(host: &HostInfo) -> Self {
        let prefix = if host.is_darwin() {
            if host.arch == "arm64" {
                "/opt/homebrew"
            } else {
                "/usr/local"
            }
        } else {
            "/home/linuxbrew/.linuxbrew"
        };
        Self::new(prefix)
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    pub fn binary(&self) -> PathBuf {
        self.bin_dir().join("brew")
    }
}

/// Installs Homebrew and puts it on PATH.
pub struct BrewBootstrap<'a> {
    ctx: SubsystemContext<'a>,
    layout: BrewLayout,
    state: SubsystemState,
}

impl<'a> BrewBootstrap<'a> {
    pub fn new(ctx: SubsystemContext<'a>) -> Self {
        let layout = BrewLayout::for_host(ctx.host);
        Self::with_layout(ctx, layout)
    }

    pub fn with_layout(ctx: SubsystemContext<'a>, layout: BrewLayout) -> Self {
        Self {
            ctx,
            layout,
            state: SubsystemState::Unknown,
        }
    }

    pub fn layout(&self) -> &BrewLayout {
        &self.layout
    }

    /// `brew --version`, first line.
    fn validate(&self) -> Result<String> {
        let binary = self.layout.binary();
        let spec = CommandSpec::new(&binary.to_string_lossy(), ["--version"]);
        let output = self.ctx.capture(spec)?;
        if !output.success() {
            return Err(DotstrapError::subsystem(
                NAME,
                format!("{} --version failed", binary.display()),
            ));
        }
        Ok(output.stdout.lines().next().unwrap_or("").trim().to_string())
    }

    fn expose(&self) {
        let bin = self.layout.bin_dir();
        if self.ctx.prepend_path(&bin) {
            tracing::info!("Added {} to PATH", bin.display());
        }
    }

    fn run_installer(&self) -> Result<()> {
        let script = download_script(self.ctx.fetcher.as_ref(), BREW_INSTALL_URL)?;
        let spec = CommandSpec::new("bash", [script.path().to_string_lossy().into_owned()])
            .env("NONINTERACTIVE", "1");
        self.ctx.run(spec).map_err(|e| command_failure(NAME, e))?;
        Ok(())
    }
}

impl Subsystem for BrewBootstrap<'_> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn state(&self) -> SubsystemState {
        self.state
    }

    fn is_available(&self) -> Result<bool> {
        Ok(is_executable(&self.layout.binary()))
    }

    fn install(&mut self, ui: &mut dyn UserInterface) -> Result<()> {
        if self.is_available()? {
            self.state.advance(SubsystemState::Available);
            let version = self.validate()?;
            self.expose();
            tracing::debug!("Found {}", version);
            ui.success(&format!("Homebrew already installed at {}", self.layout.prefix().display()));
            return Ok(());
        }

        self.state.advance(SubsystemState::Missing);
        self.state.advance(SubsystemState::Installing);
        let mut spinner = ui.start_spinner("Installing Homebrew");

        let result = self.run_installer().and_then(|()| self.validate());
        self.state.settle(&result);
        match result {
            Ok(version) => {
                self.expose();
                spinner.finish_success(&format!("Installed {}", version));
                Ok(())
            }
            Err(e) => {
                spinner.finish_error("Homebrew installation failed");
                Err(e)
            }
        }
    }
}
