//! Installer config (`--config`).
//!
//! Optional YAML file holding the user's identity and dotfiles source so
//! non-interactive runs need no flags. CLI flags override every value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{DotstrapError, Result};

/// Protocol used to clone the dotfiles repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CloneProtocol {
    Ssh,
    #[default]
    Https,
}

impl fmt::Display for CloneProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssh => write!(f, "ssh"),
            Self::Https => write!(f, "https"),
        }
    }
}

impl FromStr for CloneProtocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ssh" => Ok(Self::Ssh),
            "https" => Ok(Self::Https),
            _ => Err(format!("unknown clone protocol: {}", s)),
        }
    }
}

/// Root of the installer config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerConfig {
    #[serde(default)]
    pub personal: Identity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<WorkIdentity>,

    #[serde(default)]
    pub dotfiles: DotfilesSource,

    /// Preferred shell binary name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

/// A name and email pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Work environment identity, rendered into the engine's `data.work` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkIdentity {
    /// Short environment label, e.g. `acme`.
    #[serde(default)]
    pub env: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Where the dotfiles repository lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotfilesSource {
    /// GitHub username or full repository URL passed to the engine.
    #[serde(default)]
    pub repo: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default)]
    pub clone_protocol: CloneProtocol,
}

fn default_branch() -> String {
    "main".to_string()
}

impl Default for DotfilesSource {
    fn default() -> Self {
        Self {
            repo: String::new(),
            branch: default_branch(),
            clone_protocol: CloneProtocol::default(),
        }
    }
}

impl InstallerConfig {
    /// Default location: `$HOME/.config/dotstrap/config.yaml`.
    pub fn default_path(home: &Path) -> PathBuf {
        home.join(".config").join("dotstrap").join("config.yaml")
    }

    /// Load from `path`. A missing file yields the default config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No installer config at {}", path.display());
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| DotstrapError::filesystem(path, e))?;
        serde_yaml::from_str(&content).map_err(|e| DotstrapError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
