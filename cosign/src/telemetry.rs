// Copyright (c) 2024 Botho Foundation

//! Logging setup.
//!
//! Console logging via `tracing_subscriber::fmt`. `RUST_LOG` takes
//! precedence; otherwise the level is `info`, or `debug` with `--verbose`.
//!
//! ```text
//! RUST_LOG=cosign_gossip=trace,info cosign run
//! ```

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Default filter directive for the given verbosity.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Build the filter: `RUST_LOG` if set, else the default for `verbose`.
pub fn env_filter(verbose: bool) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(default_directive(verbose))?),
    }
}

/// Install the global subscriber.
pub fn init_tracing(verbose: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose)?)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}
