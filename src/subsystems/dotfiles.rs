//! Dotfiles engine (chezmoi).
//!
//! Three phases: install the binary, write the engine config with the
//! user's data, then clone and apply the dotfiles repository.
//!
//! The engine reads its config from `$HOME/.config/chezmoi` on every
//! platform, so paths are derived from the home directory rather than from
//! platform config directories.

use serde::Serialize;
use std::path::PathBuf;

use super::{command_failure, Subsystem, SubsystemContext, SubsystemState};
use crate::config::{CloneProtocol, DotfilesSource, Identity, WorkIdentity};
use crate::error::{DotstrapError, Result};
use crate::host::HostInfo;
use crate::net::download_script;
use crate::shell::{is_executable, CommandSpec};
use crate::ui::UserInterface;

/// Engine binary name and package code.
pub const ENGINE: &str = "chezmoi";

/// Vendor install script.
pub const ENGINE_INSTALL_URL: &str = "https://get.chezmoi.io";

const NAME: &str = "dotfiles";

/// `data.personal` in the engine config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonalData {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
}

/// `data.system` in the engine config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemData {
    pub shell: String,
    pub os: String,
    pub arch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distro: Option<String>,
}

/// Values exposed to dotfiles templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DotfilesUserData {
    pub personal: PersonalData,
    pub system: SystemData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work: Option<WorkIdentity>,
}

impl DotfilesUserData {
    /// Assemble user data for a host.
    pub fn new(
        personal: &Identity,
        signing_key: Option<String>,
        shell: &str,
        host: &HostInfo,
        work: Option<WorkIdentity>,
    ) -> Self {
        Self {
            personal: PersonalData {
                name: personal.name.clone(),
                email: personal.email.clone(),
                signing_key,
            },
            system: SystemData {
                shell: shell.to_string(),
                os: host.os.to_string(),
                arch: host.arch.clone(),
                distro: (!host.distro.is_empty()).then(|| host.distro.clone()),
            },
            work,
        }
    }

    /// Render the engine config file.
    pub fn to_toml(&self) -> Result<String> {
        #[derive(Serialize)]
        struct EngineConfig<'a> {
            data: &'a DotfilesUserData,
        }
        toml::to_string(&EngineConfig { data: self })
            .map_err(|e| DotstrapError::subsystem(NAME, format!("cannot render config: {}", e)))
    }
}

/// Installs, configures and applies the dotfiles engine.
pub struct DotfilesEngine<'a> {
    ctx: SubsystemContext<'a>,
    install_url: String,
    state: SubsystemState,
}

impl<'a> DotfilesEngine<'a> {
    pub fn new(ctx: SubsystemContext<'a>) -> Self {
        Self {
            ctx,
            install_url: ENGINE_INSTALL_URL.to_string(),
            state: SubsystemState::Unknown,
        }
    }

    /// Fetch the install script from `url` instead of the vendor.
    pub fn with_install_url(mut self, url: &str) -> Self {
        self.install_url = url.to_string();
        self
    }

    /// `$HOME/.config/chezmoi/chezmoi.toml`.
    pub fn config_path(&self) -> PathBuf {
        self.ctx
            .dirs
            .config_home()
            .join(ENGINE)
            .join(format!("{}.toml", ENGINE))
    }

    /// `$HOME/.local/share/chezmoi`.
    pub fn source_dir(&self) -> PathBuf {
        self.ctx.dirs.data_home().join(ENGINE)
    }

    fn local_binary(&self) -> PathBuf {
        self.ctx.dirs.local_bin().join(ENGINE)
    }

    /// The engine binary to invoke.
    fn binary(&self) -> String {
        self.ctx
            .which(ENGINE)
            .or_else(|| Some(self.local_binary()).filter(|p| is_executable(p)))
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| ENGINE.to_string())
    }

    fn expose_local_bin(&self) {
        let bin = self.ctx.dirs.local_bin();
        if self.ctx.prepend_path(&bin) {
            tracing::info!("Added {} to PATH", bin.display());
        }
    }

    /// Package manager first; the vendor script when the manager cannot install it.
    fn install_engine(&self) -> Result<()> {
        if self.ctx.manager_kind().is_some() {
            match self.ctx.install_package(NAME, ENGINE) {
                Ok(()) => return Ok(()),
                Err(e @ DotstrapError::PackageManager { .. }) => {
                    tracing::warn!("Package manager could not install {}: {}", ENGINE, e);
                }
                Err(e) => return Err(e),
            }
        } else {
            tracing::info!("No package manager on {}", self.ctx.host.describe());
        }
        self.install_from_script()
    }

    fn install_from_script(&self) -> Result<()> {
        let script = download_script(self.ctx.fetcher.as_ref(), &self.install_url)?;
        let local_bin = self.ctx.dirs.local_bin();
        let spec = CommandSpec::new(
            "sh",
            [
                script.path().to_string_lossy().into_owned(),
                "-b".to_string(),
                local_bin.to_string_lossy().into_owned(),
            ],
        );
        self.ctx.run(spec).map_err(|e| command_failure(NAME, e))?;
        self.expose_local_bin();

        let binary = self.local_binary();
        let check = CommandSpec::new(&binary.to_string_lossy(), ["--version"]);
        let output = self.ctx.capture(check)?;
        if !output.success() {
            return Err(DotstrapError::subsystem(
                NAME,
                format!("{} not usable after install", binary.display()),
            ));
        }
        Ok(())
    }

    /// Write the engine config, creating its directory.
    pub fn initialize(&self, data: &DotfilesUserData) -> Result<PathBuf> {
        let path = self.config_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| DotstrapError::filesystem(dir, e))?;
        }
        std::fs::write(&path, data.to_toml()?).map_err(|e| DotstrapError::filesystem(&path, e))?;
        tracing::info!("Wrote {}", path.display());
        Ok(path)
    }

    /// Replace any previous clone and apply the repository.
    pub fn apply(&self, source: &DotfilesSource) -> Result<()> {
        let repo = source.repo.trim();
        if repo.is_empty() {
            return Err(DotstrapError::subsystem(NAME, "no dotfiles repository configured"));
        }

        let source_dir = self.source_dir();
        if source_dir.exists() {
            tracing::debug!("Removing previous clone at {}", source_dir.display());
            std::fs::remove_dir_all(&source_dir)
                .map_err(|e| DotstrapError::filesystem(&source_dir, e))?;
        }

        let mut args = vec![
            "init".to_string(),
            "--apply".to_string(),
            "--source".to_string(),
            source_dir.to_string_lossy().into_owned(),
            "--branch".to_string(),
            source.branch.clone(),
            "--config".to_string(),
            self.config_path().to_string_lossy().into_owned(),
        ];
        if source.clone_protocol == CloneProtocol::Ssh {
            args.push("--ssh".to_string());
        }
        args.push(repo.to_string());

        let spec = CommandSpec::new(&self.binary(), args);
        self.ctx.run(spec).map_err(|e| command_failure(NAME, e))?;
        Ok(())
    }
}

impl Subsystem for DotfilesEngine<'_> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn state(&self) -> SubsystemState {
        self.state
    }

    fn is_available(&self) -> Result<bool> {
        Ok(self.ctx.which(ENGINE).is_some() || is_executable(&self.local_binary()))
    }

    fn install(&mut self, ui: &mut dyn UserInterface) -> Result<()> {
        if self.is_available()? {
            self.state.advance(SubsystemState::Available);
            if is_executable(&self.local_binary()) {
                self.expose_local_bin();
            }
            ui.success(&format!("{} is already installed", ENGINE));
            return Ok(());
        }

        self.state.advance(SubsystemState::Missing);
        self.state.advance(SubsystemState::Installing);
        let mut spinner = ui.start_spinner(&format!("Installing {}", ENGINE));
        let result = self.install_engine();
        self.state.settle(&result);
        match &result {
            Ok(()) => spinner.finish_success(&format!("Installed {}", ENGINE)),
            Err(_) => spinner.finish_error(&format!("Failed to install {}", ENGINE)),
        }
        result
    }
}
