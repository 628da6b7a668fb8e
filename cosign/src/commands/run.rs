// Copyright (c) 2024 Botho Foundation

use anyhow::{Context, Result};
use cosign_wallet::WalletRegistry;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::node::Node;

/// How often the run loop checks for Ctrl+C
const SHUTDOWN_POLL_MS: u64 = 100;

/// Run the node
///
/// Wallets are supplied by embedding applications through the library;
/// a node started from the CLI has none registered and rejects every
/// signing request as an unsupported currency.
pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path).context("No node found. Run 'cosign init' first.")?;
    let keypair = config.load_keypair(config_path)?;

    println!("Cosign node starting. Press Ctrl+C to stop.");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { run_async(Node::new(config, keypair, WalletRegistry::new())).await })
}

async fn run_async(node: Node) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
    })?;

    if node.registry().cluster_key().is_none() && node.config().admin.enabled {
        warn!("Admin API is enabled without a cluster key; any local process may manage the cluster");
    }

    let running = node.start().await?;
    if let Some(addr) = running.admin_addr() {
        info!(%addr, "Admin API listening");
    }

    while !shutdown.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(SHUTDOWN_POLL_MS)).await;
    }

    info!(members = node.registry().len(), "Shutting down");
    running.shutdown().await;
    Ok(())
}
