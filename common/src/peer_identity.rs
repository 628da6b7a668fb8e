// Copyright (c) 2024 Botho Foundation

//! The cluster member identity record.
//!
//! `PeerIdentity` is both the discovery beacon payload and the addressing
//! record used by the RPC client, so it serializes to a compact camelCase
//! JSON object:
//!
//! ```json
//! {"id":"02ab..","location":"10.0.0.7","discoveryPort":7300,
//!  "rpcPort":7301,"lastSeen":1717000000,"isOrigin":true}
//! ```

use displaydoc::Display;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length in hex characters of a compressed SEC1 public key.
pub const COMPRESSED_ID_LEN: usize = 66;

/// Length in hex characters of an uncompressed SEC1 public key.
pub const UNCOMPRESSED_ID_LEN: usize = 130;

/// Errors produced when interpreting a peer identity.
#[derive(Clone, Debug, Display, Eq, PartialEq, thiserror::Error)]
pub enum PeerIdentityError {
    /// Peer id is not valid hex: {0}
    InvalidHex(String),

    /// Peer id has length {0}, expected 66 or 130 hex characters
    InvalidLength(usize),

    /// Peer location is empty
    EmptyLocation,
}

/// One member of the cluster.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerIdentity {
    /// Hex-encoded secp256k1 public key. Unique within a registry.
    pub id: String,

    /// Advertised host name or IP address.
    pub location: String,

    /// UDP port the member listens on for discovery beacons.
    pub discovery_port: u16,

    /// TCP port of the member's command endpoint.
    pub rpc_port: u16,

    /// Unix seconds of the last confirmed liveness.
    #[serde(default)]
    pub last_seen: u64,

    /// True only on the record a node emits about itself.
    #[serde(default)]
    pub is_origin: bool,
}

impl PeerIdentity {
    /// Create the record a node advertises about itself.
    pub fn new_origin(
        id: impl Into<String>,
        location: impl Into<String>,
        discovery_port: u16,
        rpc_port: u16,
        now: u64,
    ) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            discovery_port,
            rpc_port,
            last_seen: now,
            is_origin: true,
        }
    }

    /// Copy of this record as learned second-hand, with `is_origin` cleared.
    pub fn as_learned(&self) -> Self {
        Self {
            is_origin: false,
            ..self.clone()
        }
    }

    /// Check that the id is a plausible hex public key and the location is set.
    pub fn validate(&self) -> Result<(), PeerIdentityError> {
        self.public_key_bytes()?;
        if self.location.trim().is_empty() {
            return Err(PeerIdentityError::EmptyLocation);
        }
        Ok(())
    }

    /// Decode the SEC1 public key bytes carried in `id`.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, PeerIdentityError> {
        let len = self.id.len();
        if len != COMPRESSED_ID_LEN && len != UNCOMPRESSED_ID_LEN {
            return Err(PeerIdentityError::InvalidLength(len));
        }
        hex::decode(&self.id).map_err(|e| PeerIdentityError::InvalidHex(e.to_string()))
    }

    /// `host:port` of the command endpoint, bracketing IPv6 literals.
    pub fn rpc_endpoint(&self) -> String {
        join_host_port(&self.location, self.rpc_port)
    }

    /// `host:port` of the discovery listener, bracketing IPv6 literals.
    pub fn discovery_endpoint(&self) -> String {
        join_host_port(&self.location, self.discovery_port)
    }

    /// Short form of the id for log lines: its first 12 characters.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(12) {
            Some((end, _)) => &self.id[..end],
            None => &self.id,
        }
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.short_id(), self.rpc_endpoint())
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
