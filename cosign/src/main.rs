// Copyright (c) 2024 Botho Foundation

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cosign::{commands, config, telemetry};

#[derive(Parser)]
#[command(name = "cosign")]
#[command(about = "Clustered multi-currency transaction co-signing node", long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.cosign/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a config and a fresh node key
    Init {
        /// Host name or IP address other members use to reach this node
        #[arg(long)]
        location: Option<String>,
    },

    /// Run discovery, the command endpoint and the admin API
    Run,

    /// Print this node's identity record
    Identity,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing(cli.verbose)?;

    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };

    match cli.command {
        Commands::Init { location } => commands::init::run(&config_path, location.as_deref()),
        Commands::Run => commands::run::run(&config_path),
        Commands::Identity => commands::identity::run(&config_path),
    }
}
