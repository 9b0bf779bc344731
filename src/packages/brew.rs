//! Homebrew adapter (macOS, Linuxbrew).
//!
//! Homebrew refuses to run as root, so commands are never escalated.

use super::{
    parse_name_version_lines, warn_unenforced, InstalledPackage, ManagerInfo, ManagerKind,
    ManagerRuntime, PackageManager, PackageRequest,
};
use crate::error::Result;
use crate::shell::CommandSpec;

pub struct BrewManager {
    runtime: ManagerRuntime,
}

impl BrewManager {
    pub fn new(runtime: ManagerRuntime) -> Self {
        Self { runtime }
    }

    fn brew(args: &[&str]) -> CommandSpec {
        CommandSpec::new("brew", args.iter().copied()).env("HOMEBREW_NO_AUTO_UPDATE", "1")
    }
}

impl PackageManager for BrewManager {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Brew
    }

    fn info(&self) -> Result<ManagerInfo> {
        self.runtime.version_of(ManagerKind::Brew, "brew")
    }

    fn install_package(&self, request: &PackageRequest) -> Result<()> {
        warn_unenforced(ManagerKind::Brew, request);
        if !request.kind.is_regular() {
            tracing::warn!("brew has no package groups; installing {} as a formula", request.name);
        }
        self.runtime
            .run_mutation(Self::brew(&["install", request.name.as_str()]), false)
    }

    fn uninstall_package(&self, request: &PackageRequest) -> Result<()> {
        self.runtime
            .run_mutation(Self::brew(&["uninstall", request.name.as_str()]), false)
    }

    fn is_package_installed(&self, request: &PackageRequest) -> Result<bool> {
        let output = self
            .runtime
            .query(Self::brew(&["list", "--versions", request.name.as_str()]))?;
        Ok(output.success() && !output.stdout.trim().is_empty())
    }

    fn list_installed_packages(&self) -> Result<Vec<InstalledPackage>> {
        let spec = Self::brew(&["list", "--versions"]);
        let output = self.runtime.query(spec.clone())?.into_checked(&spec)?;
        Ok(parse_name_version_lines(&output.stdout))
    }

    fn package_version(&self, name: &str) -> Result<Option<String>> {
        let output = self.runtime.query(Self::brew(&["list", "--versions", name]))?;
        if !output.success() {
            return Ok(None);
        }
        // `brew list --versions` prints every installed version; the last is newest.
        Ok(output
            .stdout
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().last())
            .filter(|v| *v != name)
            .map(str::to_string))
    }
}
