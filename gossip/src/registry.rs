// Copyright (c) 2024 Botho Foundation

//! In-memory registry of this node's identity and the cluster members it
//! knows about.
//!
//! The registry is a plain data structure with no I/O. The discovery service
//! feeds it, the RPC client reads destination addresses from it and the
//! admin API adds members manually. It is shared as an [`Arc`] handle built
//! once at startup.

use cosign_common::PeerIdentity;
use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

#[derive(Debug)]
struct Inner {
    /// The local node's own record.
    local: PeerIdentity,

    /// Known members keyed by id. Ordered so snapshots are stable.
    members: BTreeMap<String, PeerIdentity>,

    /// Ids added by an operator; exempt from liveness eviction.
    pinned: HashSet<String>,

    /// Shared secret for administrative calls.
    cluster_key: Option<String>,
}

/// Thread-safe cluster membership registry.
#[derive(Debug)]
pub struct ClusterRegistry {
    inner: RwLock<Inner>,
}

impl ClusterRegistry {
    /// Create a registry for the given local identity.
    pub fn new(local: PeerIdentity) -> Self {
        Self {
            inner: RwLock::new(Inner {
                local,
                members: BTreeMap::new(),
                pinned: HashSet::new(),
                cluster_key: None,
            }),
        }
    }

    /// Set the initial cluster key.
    pub fn with_cluster_key(self, key: Option<String>) -> Self {
        self.write().cluster_key = key;
        self
    }

    /// This node's own identity.
    pub fn local(&self) -> PeerIdentity {
        self.read().local.clone()
    }

    /// Change the location this node advertises.
    pub fn set_location(&self, location: impl Into<String>) {
        self.write().local.location = location.into();
    }

    /// Insert `peer` if its id is not yet known.
    ///
    /// Returns `true` if the peer was inserted. A record carrying the local
    /// node's own id is never inserted.
    pub fn register(&self, peer: PeerIdentity) -> bool {
        let mut inner = self.write();
        if peer.id == inner.local.id || inner.members.contains_key(&peer.id) {
            return false;
        }
        inner.members.insert(peer.id.clone(), peer);
        true
    }

    /// Register a peer on operator request and pin it against eviction.
    ///
    /// Returns `true` if the peer was not known before.
    pub fn add_manual(&self, peer: PeerIdentity) -> bool {
        let id = peer.id.clone();
        let inserted = self.register(peer);
        self.pin(&id);
        inserted
    }

    /// Exempt a known member from liveness eviction.
    ///
    /// Returns `false` if no member has that id.
    pub fn pin(&self, id: &str) -> bool {
        let mut inner = self.write();
        if !inner.members.contains_key(id) {
            return false;
        }
        inner.pinned.insert(id.to_string());
        true
    }

    /// Refresh liveness of a known peer.
    ///
    /// Only a record that the peer emitted about itself (`is_origin`) may
    /// extend its liveness. Such a record also carries the peer's current
    /// endpoints, which replace the stored ones. The stored record stays
    /// learned (`is_origin = false`). Returns `true` if the entry was updated.
    pub fn touch(&self, peer: &PeerIdentity, now: u64) -> bool {
        if !peer.is_origin {
            return false;
        }
        let mut inner = self.write();
        match inner.members.get_mut(&peer.id) {
            Some(entry) => {
                entry.location.clone_from(&peer.location);
                entry.discovery_port = peer.discovery_port;
                entry.rpc_port = peer.rpc_port;
                entry.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Snapshot of the current members, ordered by id.
    pub fn list(&self) -> Vec<PeerIdentity> {
        self.read().members.values().cloned().collect()
    }

    /// Look up a member by id.
    pub fn get(&self, id: &str) -> Option<PeerIdentity> {
        self.read().members.get(id).cloned()
    }

    /// Check if a member is known.
    pub fn contains(&self, id: &str) -> bool {
        self.read().members.contains_key(id)
    }

    /// Remove a member. Returns the removed record.
    pub fn remove(&self, id: &str) -> Option<PeerIdentity> {
        let mut inner = self.write();
        inner.pinned.remove(id);
        inner.members.remove(id)
    }

    /// Check if a member was pinned by an operator.
    pub fn is_pinned(&self, id: &str) -> bool {
        self.read().pinned.contains(id)
    }

    /// Number of known members, not counting the local node.
    pub fn len(&self) -> usize {
        self.read().members.len()
    }

    /// Check if no members are known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove un-pinned members not seen for more than `max_age_secs`.
    ///
    /// Returns the number of members removed.
    pub fn evict_stale(&self, now: u64, max_age_secs: u64) -> usize {
        let mut inner = self.write();
        let Inner {
            members, pinned, ..
        } = &mut *inner;

        let before = members.len();
        members.retain(|id, peer| {
            pinned.contains(id) || now.saturating_sub(peer.last_seen) <= max_age_secs
        });
        let removed = before - members.len();

        if removed > 0 {
            tracing::info!(removed, "Evicted stale cluster members");
        }
        removed
    }

    /// The shared administrative secret, if one is set.
    pub fn cluster_key(&self) -> Option<String> {
        self.read().cluster_key.clone()
    }

    /// Replace the shared administrative secret.
    pub fn set_cluster_key(&self, key: Option<String>) {
        self.write().cluster_key = key;
    }

    // A panic while holding the lock cannot leave `Inner` half-updated, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A shared, reference-counted registry.
pub type SharedRegistry = Arc<ClusterRegistry>;

/// Create a new shared registry.
pub fn new_shared_registry(local: PeerIdentity) -> SharedRegistry {
    Arc::new(ClusterRegistry::new(local))
}
