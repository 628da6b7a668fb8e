// Copyright (c) 2024 Botho Foundation

//! Cluster membership and UDP peer discovery for co-signing nodes.
//!
//! Every node periodically announces its [`PeerIdentity`] as a small JSON
//! datagram. Nodes that hear an announcement for an unknown id add it to
//! their [`ClusterRegistry`]; known members are kept alive only by their own
//! announcements, and the sweeper evicts those that fall silent.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                DiscoveryService                  │
//! ├──────────────────────────────────────────────────┤
//! │  announcer ──▶ UdpSocket ◀── listener            │
//! │                                  │               │
//! │  sweeper ──────▶ ClusterRegistry ◀┘              │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use cosign_gossip::{new_shared_registry, DiscoveryConfig, DiscoveryService};
//!
//! let registry = new_shared_registry(local_identity);
//! let handle = DiscoveryService::new(DiscoveryConfig::default(), registry.clone())
//!     .start()
//!     .await?;
//!
//! for peer in registry.list() {
//!     println!("member: {peer}");
//! }
//!
//! handle.shutdown().await;
//! ```
//!
//! [`PeerIdentity`]: cosign_common::PeerIdentity

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod config;
pub mod error;
pub mod messages;
pub mod registry;
pub mod service;

pub use config::{DiscoveryConfig, DEFAULT_DISCOVERY_PORT};
pub use error::{GossipError, GossipResult};
pub use messages::{decode_beacon, encode_beacon, handle_beacon, BeaconOutcome, MAX_BEACON_SIZE};
pub use registry::{new_shared_registry, ClusterRegistry, SharedRegistry};
pub use service::{announce_once, DiscoveryHandle, DiscoveryService};
