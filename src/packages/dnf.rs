//! Dnf adapter (Fedora, CentOS, RHEL).

use super::{
    warn_unenforced, InstalledPackage, ManagerInfo, ManagerKind, ManagerRuntime, PackageManager,
    PackageRequest,
};
use crate::config::PackageKind;
use crate::error::Result;
use crate::shell::CommandSpec;

const RPM_FORMAT: &str = "%{NAME} %{VERSION}-%{RELEASE}\n";

pub struct DnfManager {
    runtime: ManagerRuntime,
}

impl DnfManager {
    pub fn new(runtime: ManagerRuntime) -> Self {
        Self { runtime }
    }

    fn mutation(verb: &str, request: &PackageRequest) -> CommandSpec {
        match request.kind {
            PackageKind::Group => {
                CommandSpec::new("dnf", ["group", verb, "-y", request.name.as_str()])
            }
            PackageKind::Regular => CommandSpec::new("dnf", [verb, "-y", request.name.as_str()]),
        }
    }
}

impl PackageManager for DnfManager {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Dnf
    }

    fn info(&self) -> Result<ManagerInfo> {
        self.runtime.version_of(ManagerKind::Dnf, "dnf")
    }

    fn install_package(&self, request: &PackageRequest) -> Result<()> {
        warn_unenforced(ManagerKind::Dnf, request);
        self.runtime
            .run_mutation(Self::mutation("install", request), true)
    }

    fn uninstall_package(&self, request: &PackageRequest) -> Result<()> {
        self.runtime.run_mutation(Self::mutation("remove", request), true)
    }

    fn is_package_installed(&self, request: &PackageRequest) -> Result<bool> {
        let spec = match request.kind {
            PackageKind::Group => CommandSpec::new(
                "dnf",
                ["group", "list", "--installed", request.name.as_str()],
            ),
            PackageKind::Regular => CommandSpec::new("rpm", ["-q", request.name.as_str()]),
        };
        let output = self.runtime.query(spec)?;
        Ok(output.success())
    }

    fn list_installed_packages(&self) -> Result<Vec<InstalledPackage>> {
        let spec = CommandSpec::new("rpm", ["-qa", "--queryformat", RPM_FORMAT]);
        let output = self.runtime.query(spec.clone())?.into_checked(&spec)?;
        let mut packages: Vec<InstalledPackage> = super::parse_name_version_lines(&output.stdout);
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(packages)
    }

    fn package_version(&self, name: &str) -> Result<Option<String>> {
        let spec = CommandSpec::new("rpm", ["-q", "--queryformat", "%{VERSION}", name]);
        let output = self.runtime.query(spec)?;
        let version = output.stdout.trim();
        Ok((output.success() && !version.is_empty()).then(|| version.to_string()))
    }
}
