//! Agent configuration
//!
//! Handles:
//! - Discovery root and declared-inventory / ignore-file locations
//! - Publish provider selection and destination
//! - Snapshot client version marker override
//! - Loading from a TOML file with documented defaults
//!
//! The discovery root is an explicit configuration value threaded through
//! the run; nothing in the agent reads it from process-wide state.

use crate::publish::PublishConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, error};

/// Environment variable naming an alternate config file location.
pub const CONFIG_PATH_ENV: &str = "INVENTA_AGENT_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    pub discovery: DiscoveryConfig,
    pub declared: DeclaredConfig,
    pub ignore: IgnoreConfig,
    pub publish: PublishConfig,
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Root under which the category subdirectories are searched.
    pub root: PathBuf,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/opt/apps"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclaredConfig {
    /// Directory of declared-instance TOML files.
    pub dir: PathBuf,
}

impl Default for DeclaredConfig {
    fn default() -> Self {
        Self {
            dir: config_dir().join("declared"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Newline-delimited file of ignored instance uris.
    pub file: PathBuf,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            file: config_dir().join("ignore.list"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Override for the version marker file; the default marker sits next
    /// to the agent binary.
    pub version_marker: Option<PathBuf>,
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("inventa-agent")
}

impl AgentConfig {
    /// Load configuration. Missing file means defaults; a malformed file
    /// is logged and degrades to defaults rather than killing the run.
    pub async fn load() -> Result<Self> {
        let path = Self::config_file_path();
        match fs::read_to_string(&path).await {
            Ok(text) => match toml::from_str(&text) {
                Ok(config) => Ok(config),
                Err(e) => {
                    error!("invalid config {}: {}, using defaults", path.display(), e);
                    Ok(Self::default())
                }
            },
            Err(_) => {
                debug!("no config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
        }
    }

    /// Config file location: `INVENTA_AGENT_CONFIG` wins, else the
    /// OS-specific config directory.
    pub fn config_file_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }
}
