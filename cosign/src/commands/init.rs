// Copyright (c) 2024 Botho Foundation

use anyhow::{bail, Result};
use cosign_crypto_envelope::NodeKeypair;
use std::path::Path;
use tracing::info;

use crate::config::{save_keypair, Config};

/// Run the init command
pub fn run(config_path: &Path, location: Option<&str>) -> Result<()> {
    if Config::exists(config_path) {
        bail!(
            "Config already exists at {}\nUse a different --config path or delete the existing config.",
            config_path.display()
        );
    }

    let config = match location {
        Some(location) => Config::new(location),
        None => Config::default(),
    };

    let keypair = NodeKeypair::generate();
    let key_path = config.key_path(config_path);
    if key_path.exists() {
        bail!(
            "Key file already exists at {}\nRefusing to overwrite an existing node key.",
            key_path.display()
        );
    }
    save_keypair(&keypair, &key_path)?;
    config.save(config_path)?;

    info!(id = keypair.id(), "Node initialized at {}", config_path.display());
    println!("\nNode identity: {}", keypair.id());
    println!("Config saved to: {}", config_path.display());
    println!("Key saved to:    {}", key_path.display());
    println!("\nNext steps:");
    println!("  1. Add [risk.<CURRENCY>] limits to the config if needed");
    println!("  2. Run 'cosign run' to join the cluster");

    Ok(())
}
