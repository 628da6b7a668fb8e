// Copyright (c) 2024 Botho Foundation

use anyhow::{Context, Result};
use cosign_common::{now_secs, PeerIdentity};
use std::path::Path;

use crate::config::Config;

/// Print this node's identity record as JSON
pub fn run(config_path: &Path) -> Result<()> {
    let identity = load_identity(config_path)?;
    let json =
        serde_json::to_string_pretty(&identity).context("Failed to serialize identity")?;
    println!("{json}");
    Ok(())
}

/// The record this node would announce, built from its config and key file
pub fn load_identity(config_path: &Path) -> Result<PeerIdentity> {
    let config = Config::load(config_path).context("No node found. Run 'cosign init' first.")?;
    let keypair = config.load_keypair(config_path)?;

    Ok(PeerIdentity::new_origin(
        keypair.id(),
        config.node.location.clone(),
        config.discovery_port(),
        config.node.rpc_port,
        now_secs(),
    ))
}
