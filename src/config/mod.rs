//! Configuration loading and schemas.
//!
//! - [`compat`] - Compatibility policy (supported OS/distros, prerequisites)
//! - [`packages`] - Package map (package code → manager-specific name)
//! - [`installer`] - Installer config (`--config`): identity and dotfiles source
//! - [`loader`] - Embedded defaults and file overrides

pub mod compat;
pub mod installer;
pub mod loader;
pub mod packages;

pub use compat::{CompatibilityPolicy, DistroPolicy, OsPolicy, PrerequisiteSpec};
pub use installer::{CloneProtocol, DotfilesSource, Identity, InstallerConfig, WorkIdentity};
pub use loader::{load_package_map, load_policy};
pub use packages::{ManagerEntry, PackageKind, PackageMap, PackageName};
