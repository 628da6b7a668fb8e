// Copyright (c) 2024 Botho Foundation

use crate::{admin::AdminConfig, rpc::RpcConfig};
use anyhow::{anyhow, Context, Result};
use cosign_crypto_envelope::NodeKeypair;
use cosign_gossip::{DiscoveryConfig, DEFAULT_DISCOVERY_PORT};
use cosign_wallet::RiskPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the key file written next to the config by `cosign init`.
pub const DEFAULT_KEY_FILE: &str = "node.key";

/// Main configuration for a cosign node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    /// Per-currency risk limits, keyed by currency symbol
    #[serde(default, skip_serializing_if = "RiskPolicy::is_empty")]
    pub risk: RiskPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Host name or IP address other members use to reach this node
    #[serde(default = "default_location")]
    pub location: String,

    /// Port of the command endpoint
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Hex secp256k1 secret. Relative paths are resolved against the config
    /// file's directory.
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,

    /// Shared secret required by the admin API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_key: Option<String>,
}

fn default_location() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    7301
}

fn default_key_file() -> PathBuf {
    PathBuf::from(DEFAULT_KEY_FILE)
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            rpc_port: default_rpc_port(),
            key_file: default_key_file(),
            cluster_key: None,
        }
    }
}

impl Config {
    /// Create a config advertising `location`
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            node: NodeConfig {
                location: location.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// UDP port other members send beacons to
    pub fn discovery_port(&self) -> u16 {
        match self.discovery.bind_addr.port() {
            0 => DEFAULT_DISCOVERY_PORT,
            port => port,
        }
    }

    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        write_private(path, contents.as_bytes())
    }

    /// Check if config file exists
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Absolute location of the key file for a config loaded from
    /// `config_path`
    pub fn key_path(&self, config_path: &Path) -> PathBuf {
        if self.node.key_file.is_absolute() {
            self.node.key_file.clone()
        } else {
            config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(&self.node.key_file)
        }
    }

    /// Read the node key pair referenced by this config
    pub fn load_keypair(&self, config_path: &Path) -> Result<NodeKeypair> {
        let path = self.key_path(config_path);
        let contents = zeroize::Zeroizing::new(
            fs::read_to_string(&path)
                .with_context(|| format!("Failed to read key file {}", path.display()))?,
        );
        NodeKeypair::from_hex(&contents)
            .map_err(|e| anyhow!("Invalid key file {}: {}", path.display(), e))
    }
}

/// Write a key pair to `path` with owner-only permissions
pub fn save_keypair(keypair: &NodeKeypair, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    write_private(path, keypair.to_hex().as_bytes())
}

fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    // Both the config and the key file reference secrets.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms)
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Get the default config directory path
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".cosign"))
        .ok_or_else(|| anyhow!("Could not determine home directory"))
}

/// Get the default config file path
pub fn default_config_path() -> Result<PathBuf> {
    Ok(default_data_dir()?.join("config.toml"))
}
