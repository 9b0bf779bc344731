//! Compatibility gate.
//!
//! Evaluates a [`HostInfo`] against the [`CompatibilityPolicy`]: the OS must
//! be present and supported, and on Linux so must the distribution. The
//! verdict never touches the host record, so callers can still inspect its
//! prerequisites to drive remediation after a failed check.

use crate::config::CompatibilityPolicy;
use crate::error::{DotstrapError, Result};
use crate::host::HostInfo;
use crate::packages::constraint::{coerce_version, VersionConstraint};

/// Checks hosts against a compatibility policy.
pub struct CompatibilityGate<'a> {
    policy: &'a CompatibilityPolicy,
}

impl<'a> CompatibilityGate<'a> {
    pub fn new(policy: &'a CompatibilityPolicy) -> Self {
        Self { policy }
    }

    /// Check the host. `Ok(())` means the OS (and distro on Linux) is supported.
    pub fn check(&self, host: &HostInfo) -> Result<()> {
        let os_key = host.os.as_str();
        let os = self
            .policy
            .os(os_key)
            .ok_or_else(|| incompatible(format!("operating system '{}' is not listed", os_key), ""))?;

        if !os.supported {
            return Err(incompatible(
                format!("operating system '{}' is not supported", os_key),
                &os.notes,
            ));
        }

        if !host.is_linux() {
            return Ok(());
        }

        let distro = os.distributions.get(&host.distro).ok_or_else(|| {
            incompatible(
                format!("distribution '{}' is not listed", host.distro),
                &os.notes,
            )
        })?;

        if !distro.supported {
            return Err(incompatible(
                format!("distribution '{}' is not supported", host.distro),
                &distro.notes,
            ));
        }

        if let Some(constraint) = &distro.version_constraint {
            self.check_version(host, constraint);
        }

        Ok(())
    }

    /// Evaluate the distro version constraint.
    ///
    /// The outcome is advisory: a mismatch or an unparsable constraint is
    /// logged but never fails the gate.
    fn check_version(&self, host: &HostInfo, constraint: &str) {
        let constraint = match VersionConstraint::parse(constraint) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Ignoring version constraint for {}: {}", host.distro, e);
                return;
            }
        };
        let Some(version) = host.distro_version.as_deref().and_then(coerce_version) else {
            tracing::debug!("No comparable version for {}", host.distro);
            return;
        };
        if constraint.matches(&version) {
            tracing::debug!("{} {} satisfies {}", host.distro, version, constraint);
        } else {
            tracing::warn!(
                "{} {} does not satisfy {}; continuing anyway",
                host.distro,
                version,
                constraint
            );
        }
    }
}

fn incompatible(reason: String, notes: &str) -> DotstrapError {
    let message = if notes.is_empty() {
        reason
    } else {
        format!("{} ({})", reason, notes)
    };
    DotstrapError::Incompatible { message }
}
