// Copyright (c) 2024 Botho Foundation

//! Cosign node library: a cluster of nodes that co-sign multi-currency
//! transactions.
//!
//! Nodes find each other with UDP beacons (`cosign-gossip`), exchange
//! signing commands over an encrypted request/reply transport ([`rpc`]) and
//! only hand a transaction to the local wallet once the risk gate in
//! `cosign-wallet` has accepted it ([`dispatcher`]).
//!
//! ```text
//!   RpcClient ──envelope──▶ RpcServer ──▶ Dispatcher ──▶ RiskGate ──▶ Wallet::sign
//!       ▲                        │
//!       └──────envelope──────────┘
//! ```

#![deny(clippy::print_stdout)]

pub mod admin;
pub mod config;
pub mod dispatcher;
pub mod node;
pub mod protocol;
pub mod rpc;
pub mod telemetry;

// Re-export commands module for CLI binary
#[allow(clippy::print_stdout)]
pub mod commands;

pub use dispatcher::{CommandHandler, Dispatcher};
pub use node::{Node, RunningNode};
pub use protocol::{CommandKind, CommandOutcome, SignParams, SigningCommand};
