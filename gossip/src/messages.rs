// Copyright (c) 2024 Botho Foundation

//! Discovery beacon encoding and the membership rules applied on receipt.
//!
//! A beacon is a JSON [`PeerIdentity`] in a single datagram. Delivery is
//! best effort: beacons can be lost, duplicated or reordered, and a node
//! also hears its own announcements.

use crate::{
    error::{GossipError, GossipResult},
    registry::ClusterRegistry,
};
use cosign_common::PeerIdentity;

/// Largest beacon accepted or emitted, in bytes.
pub const MAX_BEACON_SIZE: usize = 1024;

/// What the listener did with a received beacon.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BeaconOutcome {
    /// First sighting; the peer was added.
    Inserted,
    /// A known peer announced itself; liveness refreshed.
    Refreshed,
    /// A known peer's record arrived second-hand; ignored.
    IgnoredRelayed,
    /// Our own announcement echoed back; ignored.
    IgnoredSelf,
}

/// Serialize the local identity as an origin beacon stamped with `now`.
pub fn encode_beacon(local: &PeerIdentity, now: u64) -> GossipResult<Vec<u8>> {
    let beacon = PeerIdentity {
        last_seen: now,
        is_origin: true,
        ..local.clone()
    };
    let bytes =
        serde_json::to_vec(&beacon).map_err(|e| GossipError::Serialization(e.to_string()))?;
    if bytes.len() > MAX_BEACON_SIZE {
        return Err(GossipError::BeaconTooLarge(bytes.len()));
    }
    Ok(bytes)
}

/// Parse and validate a received beacon.
pub fn decode_beacon(bytes: &[u8]) -> GossipResult<PeerIdentity> {
    if bytes.len() > MAX_BEACON_SIZE {
        return Err(GossipError::BeaconTooLarge(bytes.len()));
    }
    let peer: PeerIdentity =
        serde_json::from_slice(bytes).map_err(|e| GossipError::Deserialization(e.to_string()))?;
    peer.validate()?;
    Ok(peer)
}

/// Apply a received beacon to the registry.
///
/// Unknown peers are inserted as learned records (`is_origin = false`,
/// `last_seen = now`). Known peers are refreshed, endpoints included, only
/// when the beacon is the peer's own announcement, so relayed or stale
/// copies can neither keep a dead peer alive nor redirect it.
pub fn handle_beacon(registry: &ClusterRegistry, beacon: &PeerIdentity, now: u64) -> BeaconOutcome {
    if beacon.id == registry.local().id {
        return BeaconOutcome::IgnoredSelf;
    }

    if !registry.contains(&beacon.id) {
        let learned = PeerIdentity {
            last_seen: now,
            ..beacon.as_learned()
        };
        if registry.register(learned) {
            return BeaconOutcome::Inserted;
        }
    }

    if registry.touch(beacon, now) {
        BeaconOutcome::Refreshed
    } else {
        BeaconOutcome::IgnoredRelayed
    }
}
