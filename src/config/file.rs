//! TOML configuration file loading
//!
//! Supports `~/.config/dsm-control/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::nodes::NodeKind;
use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct DsmConfigFile {
    #[serde(default)]
    pub rpc: RpcFileConfig,

    #[serde(default)]
    pub registry: RegistryFileConfig,

    #[serde(default)]
    pub polling: PollingFileConfig,

    #[serde(default)]
    pub dispatch: DispatchFileConfig,

    #[serde(default)]
    pub server: ServerFileConfig,
}

/// RPC transport settings
#[derive(Debug, Default, Deserialize)]
pub struct RpcFileConfig {
    /// Request path on every RPC server (e.g. "/RPC2")
    pub path: Option<String>,

    /// Per-call timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Node registry settings
#[derive(Debug, Default, Deserialize)]
pub struct RegistryFileConfig {
    pub control_host: Option<String>,
    pub control_port: Option<u16>,
    pub fleet_port: Option<u16>,
    pub status_port: Option<u16>,

    /// Replaces the built-in well-known node table when present
    pub well_known: Option<Vec<WellKnownFileEntry>>,
}

/// One fixed entry appended to every fleet listing
#[derive(Debug, Deserialize)]
pub struct WellKnownFileEntry {
    pub id: String,
    pub address: String,
    pub kind: NodeKind,
    pub display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PollingFileConfig {
    pub period_ms: Option<u64>,
    pub detail_every: Option<u32>,
    pub periodic_hosts: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DispatchFileConfig {
    pub max_in_flight: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub port: Option<u16>,
}

/// Load the config file from its default location
///
/// A missing or unreadable file yields defaults; problems are logged.
pub fn load_config_file() -> DsmConfigFile {
    let Some(path) = config_file_path() else {
        return DsmConfigFile::default();
    };

    if !path.exists() {
        return DsmConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            DsmConfigFile::default()
        }
    }
}

/// Read and parse a config file at an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn read_config_file(path: &Path) -> Result<DsmConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Default location of the config file
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("dsm-control").join("config.toml"))
}
