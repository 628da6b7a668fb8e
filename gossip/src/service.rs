// Copyright (c) 2024 Botho Foundation

//! Discovery service: announces this node over UDP and learns other cluster
//! members from their announcements.
//!
//! Three tasks share one socket:
//! - an announcer that sends the local identity every interval
//! - a listener that applies received beacons to the registry
//! - a sweeper that evicts members whose announcements stopped

use crate::{
    config::DiscoveryConfig,
    error::{GossipError, GossipResult},
    messages::{decode_beacon, encode_beacon, handle_beacon, BeaconOutcome, MAX_BEACON_SIZE},
    registry::SharedRegistry,
};
use cosign_common::now_secs;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tokio::{
    net::UdpSocket,
    select,
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, trace, warn};

/// The discovery service, before it is started.
pub struct DiscoveryService {
    config: DiscoveryConfig,
    registry: SharedRegistry,
}

impl DiscoveryService {
    /// Create a new discovery service feeding `registry`.
    pub fn new(config: DiscoveryConfig, registry: SharedRegistry) -> Self {
        Self { config, registry }
    }

    /// The registry this service feeds.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Bind the socket and spawn the announcer, listener and sweeper.
    ///
    /// The tasks run until the returned handle is shut down or dropped.
    pub async fn start(self) -> GossipResult<DiscoveryHandle> {
        let socket = UdpSocket::bind(self.config.bind_addr)
            .await
            .map_err(|e| GossipError::Bind(self.config.bind_addr.to_string(), e))?;
        let local_addr = socket.local_addr()?;

        match self.config.broadcast_addr.ip() {
            IpAddr::V4(group) if group.is_multicast() => {
                socket.join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)?;
            }
            IpAddr::V4(_) => {
                if let Err(e) = socket.set_broadcast(true) {
                    warn!(error = %e, "Failed to enable SO_BROADCAST");
                }
            }
            IpAddr::V6(_) => {}
        }

        info!(
            %local_addr,
            target = %self.config.broadcast_addr,
            "Discovery service listening"
        );

        let socket = Arc::new(socket);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut tasks = vec![
            tokio::spawn(run_announcer(
                socket.clone(),
                self.config.clone(),
                self.registry.clone(),
                shutdown_rx.clone(),
            )),
            tokio::spawn(run_listener(
                socket,
                self.registry.clone(),
                shutdown_rx.clone(),
            )),
        ];
        if self.config.eviction_enabled() {
            tasks.push(tokio::spawn(run_sweeper(
                self.config,
                self.registry,
                shutdown_rx,
            )));
        }

        Ok(DiscoveryHandle {
            local_addr,
            shutdown_tx,
            tasks,
        })
    }
}

/// Handle to a running discovery service.
pub struct DiscoveryHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl DiscoveryHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop all tasks and wait for them to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Discovery task ended abnormally");
            }
        }
        debug!("Discovery service stopped");
    }
}

/// Send one announcement of the local identity to `target`.
///
/// Returns the number of bytes sent.
pub async fn announce_once(
    socket: &UdpSocket,
    target: SocketAddr,
    registry: &SharedRegistry,
) -> GossipResult<usize> {
    let beacon = encode_beacon(&registry.local(), now_secs())?;
    let sent = socket.send_to(&beacon, target).await?;
    trace!(%target, bytes = sent, "Sent discovery beacon");
    Ok(sent)
}

async fn run_announcer(
    socket: Arc<UdpSocket>,
    config: DiscoveryConfig,
    registry: SharedRegistry,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(config.announce_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            _ = ticker.tick() => {
                // Send errors are transient (no route, interface down); retry
                // on the next tick.
                if let Err(e) = announce_once(&socket, config.broadcast_addr, &registry).await {
                    warn!(error = %e, "Failed to send discovery beacon");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

async fn run_listener(
    socket: Arc<UdpSocket>,
    registry: SharedRegistry,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; MAX_BEACON_SIZE + 1];

    loop {
        select! {
            received = socket.recv_from(&mut buf) => {
                let (len, from) = match received {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(error = %e, "Discovery receive failed");
                        continue;
                    }
                };
                let beacon = match decode_beacon(&buf[..len]) {
                    Ok(beacon) => beacon,
                    Err(e) => {
                        debug!(%from, error = %e, "Dropping malformed beacon");
                        continue;
                    }
                };
                match handle_beacon(&registry, &beacon, now_secs()) {
                    BeaconOutcome::Inserted => {
                        info!(peer = %beacon, "Discovered cluster member");
                    }
                    outcome => {
                        trace!(peer = %beacon, ?outcome, "Processed beacon");
                    }
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

async fn run_sweeper(
    config: DiscoveryConfig,
    registry: SharedRegistry,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(config.cleanup_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            _ = ticker.tick() => {
                registry.evict_stale(now_secs(), config.peer_ttl_secs);
            }
            _ = shutdown.changed() => break,
        }
    }
}
