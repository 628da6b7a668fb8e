// Copyright (c) 2024 Botho Foundation

//! Configuration for the discovery service.

use serde::{Deserialize, Serialize};
use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};

/// Default UDP port for discovery beacons.
pub const DEFAULT_DISCOVERY_PORT: u16 = 7300;

/// Configuration for the discovery service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Address the listener binds to.
    pub bind_addr: SocketAddr,

    /// Where announcements are sent: a broadcast, multicast or unicast
    /// address.
    pub broadcast_addr: SocketAddr,

    /// How often to broadcast our own announcement (seconds)
    pub announce_interval_secs: u64,

    /// Members silent for longer than this are evicted (seconds, 0 = never)
    pub peer_ttl_secs: u64,

    /// How often to run the eviction sweep (seconds)
    pub cleanup_interval_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::UNSPECIFIED,
                DEFAULT_DISCOVERY_PORT,
            )),
            broadcast_addr: SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::BROADCAST,
                DEFAULT_DISCOVERY_PORT,
            )),
            announce_interval_secs: 5,
            peer_ttl_secs: 60,
            cleanup_interval_secs: 15,
        }
    }
}

impl DiscoveryConfig {
    /// Create a config that listens and broadcasts on `port`.
    pub fn with_port(port: u16) -> Self {
        let mut config = Self::default();
        config.bind_addr.set_port(port);
        config.broadcast_addr.set_port(port);
        config
    }

    /// Override the listener address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Override the announcement target.
    pub fn broadcast_addr(mut self, addr: SocketAddr) -> Self {
        self.broadcast_addr = addr;
        self
    }

    /// Override the announcement interval.
    pub fn announce_interval_secs(mut self, secs: u64) -> Self {
        self.announce_interval_secs = secs;
        self
    }

    /// Override the liveness ttl.
    pub fn peer_ttl_secs(mut self, secs: u64) -> Self {
        self.peer_ttl_secs = secs;
        self
    }

    /// Announcement interval as a Duration, never shorter than one second.
    pub fn announce_interval(&self) -> Duration {
        Duration::from_secs(self.announce_interval_secs.max(1))
    }

    /// Sweep interval as a Duration, never shorter than one second.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }

    /// Whether stale members are evicted at all.
    pub fn eviction_enabled(&self) -> bool {
        self.peer_ttl_secs > 0
    }

    /// Whether announcements go to an IPv4 multicast group.
    pub fn is_multicast(&self) -> bool {
        self.broadcast_addr.ip().is_multicast()
    }
}
