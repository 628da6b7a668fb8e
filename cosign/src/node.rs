// Copyright (c) 2024 Botho Foundation

//! Node context: builds the registry, dispatcher and services from a config
//! and starts them.

use crate::{
    admin::{AdminHandle, AdminServer},
    config::Config,
    dispatcher::Dispatcher,
    rpc::{RpcClient, RpcServer, RpcServerHandle},
};
use anyhow::{Context, Result};
use cosign_common::{now_secs, PeerIdentity};
use cosign_crypto_envelope::NodeKeypair;
use cosign_gossip::{ClusterRegistry, DiscoveryHandle, DiscoveryService, SharedRegistry};
use cosign_wallet::{RiskGate, WalletRegistry};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;

/// Everything a node shares between its services.
pub struct Node {
    config: Config,
    keypair: Arc<NodeKeypair>,
    registry: SharedRegistry,
    dispatcher: Arc<Dispatcher>,
}

impl Node {
    /// Assemble a node from its config, key pair and wallets.
    pub fn new(config: Config, keypair: NodeKeypair, wallets: WalletRegistry) -> Self {
        let local = PeerIdentity::new_origin(
            keypair.id(),
            config.node.location.clone(),
            config.discovery_port(),
            config.node.rpc_port,
            now_secs(),
        );
        let registry = Arc::new(
            ClusterRegistry::new(local).with_cluster_key(config.node.cluster_key.clone()),
        );
        let dispatcher = Arc::new(Dispatcher::new(
            wallets,
            RiskGate::new(config.risk.clone()),
        ));

        Self {
            config,
            keypair: Arc::new(keypair),
            registry,
            dispatcher,
        }
    }

    /// The node's config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared membership registry.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// The local command dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// This node's identity.
    pub fn identity(&self) -> PeerIdentity {
        self.registry.local()
    }

    /// A client for sending commands to other members.
    pub fn client(&self) -> RpcClient {
        RpcClient::new(self.keypair.clone(), self.registry.clone(), &self.config.rpc)
    }

    /// Start discovery, the command endpoint and, if enabled, the admin API.
    pub async fn start(&self) -> Result<RunningNode> {
        let local = self.registry.local();
        let host = bind_host(&local.location);
        let rpc = RpcServer::bind(
            (host, local.rpc_port),
            self.keypair.clone(),
            self.registry.clone(),
            self.dispatcher.clone(),
            self.config.rpc.clone(),
        )
        .await
        .with_context(|| format!("Failed to bind command endpoint on port {}", local.rpc_port))?
        .spawn();

        let discovery = DiscoveryService::new(self.config.discovery.clone(), self.registry.clone())
            .start()
            .await
            .context("Failed to start discovery")?;

        let admin = if self.config.admin.enabled {
            let server = AdminServer::bind(self.config.admin.listen_addr, self.registry.clone())
                .await
                .with_context(|| {
                    format!("Failed to bind admin API on {}", self.config.admin.listen_addr)
                })?;
            Some(server.spawn())
        } else {
            None
        };

        info!(
            id = local.short_id(),
            rpc = %rpc.local_addr(),
            discovery = %discovery.local_addr(),
            "Node started"
        );

        Ok(RunningNode {
            rpc,
            discovery,
            admin,
        })
    }
}

/// The services of a started node.
pub struct RunningNode {
    rpc: RpcServerHandle,
    discovery: DiscoveryHandle,
    admin: Option<AdminHandle>,
}

impl RunningNode {
    /// Address of the command endpoint.
    pub fn rpc_addr(&self) -> SocketAddr {
        self.rpc.local_addr()
    }

    /// Address of the discovery listener.
    pub fn discovery_addr(&self) -> SocketAddr {
        self.discovery.local_addr()
    }

    /// Address of the admin API, if it is running.
    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin.as_ref().map(AdminHandle::local_addr)
    }

    /// Stop every service.
    pub async fn shutdown(self) {
        if let Some(admin) = self.admin {
            admin.shutdown().await;
        }
        self.discovery.shutdown().await;
        self.rpc.shutdown().await;
        info!("Node stopped");
    }
}

// The advertised location may be a name other hosts resolve to this node
// (or a NAT address), so the endpoint binds the wildcard for anything that
// is not a local literal.
fn bind_host(location: &str) -> &str {
    match location {
        "127.0.0.1" | "localhost" | "::1" => location,
        _ => "0.0.0.0",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_config() {
        let mut config = Config::new("10.9.8.7");
        config.node.rpc_port = 9001;
        config.node.cluster_key = Some("k".to_string());
        let keypair = NodeKeypair::generate();
        let id = keypair.id().to_string();

        let node = Node::new(config, keypair, WalletRegistry::new());
        let identity = node.identity();
        assert_eq!(identity.id, id);
        assert_eq!(identity.location, "10.9.8.7");
        assert_eq!(identity.rpc_port, 9001);
        assert_eq!(identity.discovery_port, 7300);
        assert!(identity.is_origin);
        assert_eq!(node.registry().cluster_key().as_deref(), Some("k"));
    }

    #[test]
    fn test_bind_host() {
        assert_eq!(bind_host("127.0.0.1"), "127.0.0.1");
        assert_eq!(bind_host("signer.example"), "0.0.0.0");
    }
}
