//! GnuPG installer and signing key provisioning.

use super::{command_failure, Subsystem, SubsystemContext, SubsystemState};
use crate::config::Identity;
use crate::error::{DotstrapError, Result};
use crate::shell::{CommandSpec, DisplayMode};
use crate::ui::{Prompt, PromptOption, PromptType, UserInterface};

/// Prompt key for choosing the signing key.
pub const KEY_PROMPT_KEY: &str = "gpg_key";

const NAME: &str = "gpg";
const BINARY: &str = "gpg";

/// Makes the `gpg` binary available.
pub struct GpgInstaller<'a> {
    ctx: SubsystemContext<'a>,
    state: SubsystemState,
}

impl<'a> GpgInstaller<'a> {
    pub fn new(ctx: SubsystemContext<'a>) -> Self {
        Self {
            ctx,
            state: SubsystemState::Unknown,
        }
    }
}

impl Subsystem for GpgInstaller<'_> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn state(&self) -> SubsystemState {
        self.state
    }

    fn is_available(&self) -> Result<bool> {
        Ok(self.ctx.which(BINARY).is_some())
    }

    fn install(&mut self, ui: &mut dyn UserInterface) -> Result<()> {
        if self.is_available()? {
            self.state.advance(SubsystemState::Available);
            ui.success("gpg is already installed");
            return Ok(());
        }

        self.state.advance(SubsystemState::Missing);
        self.state.advance(SubsystemState::Installing);
        let mut spinner = ui.start_spinner("Installing gpg");
        let result = self.ctx.install_package(NAME, "gpg");
        self.state.settle(&result);
        match &result {
            Ok(()) => spinner.finish_success("Installed gpg"),
            Err(_) => spinner.finish_error("Failed to install gpg"),
        }
        result
    }
}

/// A secret key from the user's keyring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpgKey {
    /// Long key id.
    pub id: String,
    /// Primary user id, e.g. `Jane Doe <jane@example.com>`.
    pub uid: String,
}

impl GpgKey {
    fn label(&self) -> String {
        if self.uid.is_empty() {
            self.id.clone()
        } else {
            format!("{} {}", self.id, self.uid)
        }
    }
}

/// Parse `gpg --list-secret-keys --with-colons` output.
///
/// Each `sec` record starts a key (id in field 5); the first `uid` record
/// after it supplies the user id (field 10).
pub fn parse_secret_keys(output: &str) -> Vec<GpgKey> {
    let mut keys: Vec<GpgKey> = Vec::new();
    let mut awaiting_uid = false;
    for line in output.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("sec") => {
                let id = fields.get(4).copied().unwrap_or("").trim();
                awaiting_uid = !id.is_empty();
                if awaiting_uid {
                    keys.push(GpgKey {
                        id: id.to_string(),
                        uid: String::new(),
                    });
                }
            }
            Some("uid") if awaiting_uid => {
                if let Some(key) = keys.last_mut() {
                    key.uid = fields.get(9).copied().unwrap_or("").to_string();
                }
                awaiting_uid = false;
            }
            _ => {}
        }
    }
    keys
}

/// Lists, creates and selects signing keys.
pub struct GpgKeys<'a> {
    ctx: SubsystemContext<'a>,
}

impl<'a> GpgKeys<'a> {
    pub fn new(ctx: SubsystemContext<'a>) -> Self {
        Self { ctx }
    }

    /// Secret keys in the user's keyring.
    pub fn list(&self) -> Result<Vec<GpgKey>> {
        let spec = CommandSpec::new(BINARY, ["--list-secret-keys", "--with-colons"]);
        let output = self
            .ctx
            .capture(spec.clone())?
            .into_checked(&spec)
            .map_err(|e| command_failure(NAME, e))?;
        Ok(parse_secret_keys(&output.stdout))
    }

    /// Generate a new key pair for `identity`. gpg asks for the passphrase itself.
    pub fn create(&self, identity: &Identity) -> Result<()> {
        if identity.name.trim().is_empty() || identity.email.trim().is_empty() {
            return Err(DotstrapError::subsystem(
                NAME,
                "a name and email are required to create a key",
            ));
        }
        let user_id = format!("{} <{}>", identity.name.trim(), identity.email.trim());
        let spec = CommandSpec::new(
            BINARY,
            ["--quick-generate-key", user_id.as_str(), "default", "default", "never"],
        )
        .display(DisplayMode::Passthrough);
        self.ctx
            .runtime
            .commander
            .run_checked(&spec)
            .map_err(|e| command_failure(NAME, e))?;
        Ok(())
    }

    /// Pick the signing key for the dotfiles.
    ///
    /// Interactive runs only: with no key one is created, otherwise the user
    /// picks from the keyring. Non-interactive runs return `None`.
    pub fn provision(
        &self,
        ui: &mut dyn UserInterface,
        identity: &Identity,
    ) -> Result<Option<String>> {
        if !ui.is_interactive() {
            tracing::debug!("Skipping GPG key provisioning in non-interactive mode");
            return Ok(None);
        }

        let mut keys = self.list()?;
        if keys.is_empty() {
            ui.message("No GPG secret key found; creating one");
            self.create(identity)?;
            keys = self.list()?;
            let key = keys.into_iter().next().ok_or_else(|| {
                DotstrapError::subsystem(NAME, "no secret key found after key generation")
            })?;
            ui.success(&format!("Created GPG key {}", key.id));
            return Ok(Some(key.id));
        }

        let options = keys
            .iter()
            .map(|key| PromptOption::new(&key.label(), &key.id))
            .collect();
        let prompt = Prompt::new(
            KEY_PROMPT_KEY,
            "Select the GPG key used for signing",
            PromptType::Select { options },
        )
        .with_default(&keys[0].id);

        let chosen = ui.prompt(&prompt)?.as_string();
        if !keys.iter().any(|key| key.id == chosen) {
            return Err(DotstrapError::subsystem(
                NAME,
                format!("unknown key '{}'", chosen),
            ));
        }
        Ok(Some(chosen))
    }
}
