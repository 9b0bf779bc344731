//! Apt adapter (Debian, Ubuntu).

use super::{
    parse_name_version_lines, warn_unenforced, InstalledPackage, ManagerInfo, ManagerKind,
    ManagerRuntime, PackageManager, PackageRequest,
};
use crate::error::Result;
use crate::shell::CommandSpec;

const LIST_FORMAT: &str = "-f=${Package} ${Version}\n";

pub struct AptManager {
    runtime: ManagerRuntime,
}

impl AptManager {
    pub fn new(runtime: ManagerRuntime) -> Self {
        Self { runtime }
    }
}

impl PackageManager for AptManager {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Apt
    }

    fn info(&self) -> Result<ManagerInfo> {
        self.runtime.version_of(ManagerKind::Apt, "apt-get")
    }

    fn install_package(&self, request: &PackageRequest) -> Result<()> {
        warn_unenforced(ManagerKind::Apt, request);
        let spec = CommandSpec::new("apt-get", ["install", "-y", request.name.as_str()])
            .env("DEBIAN_FRONTEND", "noninteractive");
        self.runtime.run_mutation(spec, true)
    }

    fn uninstall_package(&self, request: &PackageRequest) -> Result<()> {
        let spec = CommandSpec::new("apt-get", ["remove", "-y", request.name.as_str()]);
        self.runtime.run_mutation(spec, true)
    }

    fn is_package_installed(&self, request: &PackageRequest) -> Result<bool> {
        let spec = CommandSpec::new(
            "dpkg-query",
            ["-W", "-f=${Status}", request.name.as_str()],
        );
        let output = self.runtime.query(spec)?;
        Ok(output.success() && output.stdout.contains("install ok installed"))
    }

    fn list_installed_packages(&self) -> Result<Vec<InstalledPackage>> {
        let spec = CommandSpec::new("dpkg-query", ["-W", LIST_FORMAT]);
        let output = self.runtime.query(spec.clone())?.into_checked(&spec)?;
        Ok(parse_name_version_lines(&output.stdout))
    }

    fn package_version(&self, name: &str) -> Result<Option<String>> {
        let spec = CommandSpec::new("dpkg-query", ["-W", "-f=${Version}", name]);
        let output = self.runtime.query(spec)?;
        let version = output.stdout.trim();
        Ok((output.success() && !version.is_empty()).then(|| version.to_string()))
    }
}
