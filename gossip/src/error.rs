// Copyright (c) 2024 Botho Foundation

//! Error types for the gossip module.

use displaydoc::Display;
use thiserror::Error;

/// Errors that can occur in the gossip module.
#[derive(Debug, Display, Error)]
pub enum GossipError {
    /// Failed to bind discovery socket on {0}: {1}
    Bind(String, std::io::Error),

    /// Network error: {0}
    Network(#[from] std::io::Error),

    /// Failed to serialize beacon: {0}
    Serialization(String),

    /// Failed to deserialize beacon: {0}
    Deserialization(String),

    /// Beacon of {0} bytes exceeds the size limit
    BeaconTooLarge(usize),

    /// Beacon carries an invalid identity: {0}
    InvalidBeacon(#[from] cosign_common::PeerIdentityError),
}

/// Result type for gossip operations.
pub type GossipResult<T> = Result<T, GossipError>;
