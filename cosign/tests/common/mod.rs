// Copyright (c) 2024 Botho Foundation
//
//! Shared helpers for the cosign integration tests.
//!
//! A [`TestSigner`] is a command endpoint on a loopback port backed by a
//! real [`Dispatcher`]. A [`TestCaller`] is the other side: a key pair,
//! a registry and an [`RpcClient`].

#![allow(dead_code)]

use std::{net::UdpSocket, sync::Arc};

use cosign::{
    rpc::{RpcClient, RpcConfig, RpcServer, RpcServerHandle},
    Dispatcher,
};
use cosign_common::PeerIdentity;
use cosign_crypto_envelope::NodeKeypair;
use cosign_gossip::{new_shared_registry, SharedRegistry};
use cosign_wallet::{RiskGate, RiskPolicy, WalletRegistry};

/// An identity on loopback for `keypair`.
pub fn loopback_identity(keypair: &NodeKeypair, rpc_port: u16) -> PeerIdentity {
    PeerIdentity::new_origin(keypair.id(), "127.0.0.1", 0, rpc_port, 0)
}

/// A UDP port that was free a moment ago.
pub fn free_udp_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0")
        .and_then(|socket| socket.local_addr())
        .map(|addr| addr.port())
        .expect("Failed to pick a free UDP port")
}

/// A TCP port that was free a moment ago.
pub fn free_tcp_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("Failed to pick a free TCP port")
}

/// A running command endpoint.
pub struct TestSigner {
    pub keypair: Arc<NodeKeypair>,
    pub registry: SharedRegistry,
    /// The record callers use to reach this endpoint.
    pub identity: PeerIdentity,
    pub server: RpcServerHandle,
}

impl TestSigner {
    /// Start an endpoint serving `wallets` under `policy`.
    pub async fn spawn(wallets: WalletRegistry, policy: RiskPolicy) -> Self {
        Self::spawn_with_config(wallets, policy, RpcConfig::default()).await
    }

    pub async fn spawn_with_config(
        wallets: WalletRegistry,
        policy: RiskPolicy,
        config: RpcConfig,
    ) -> Self {
        let keypair = Arc::new(NodeKeypair::generate());
        let registry = new_shared_registry(loopback_identity(&keypair, 0));
        let dispatcher = Arc::new(Dispatcher::new(wallets, RiskGate::new(policy)));

        let server = RpcServer::bind(
            "127.0.0.1:0",
            keypair.clone(),
            registry.clone(),
            dispatcher,
            config,
        )
        .await
        .expect("Failed to bind command endpoint")
        .spawn();

        let identity = loopback_identity(&keypair, server.local_addr().port());

        Self {
            keypair,
            registry,
            identity,
            server,
        }
    }

    pub async fn stop(self) {
        self.server.shutdown().await;
    }
}

/// The requesting side of an exchange.
pub struct TestCaller {
    pub keypair: Arc<NodeKeypair>,
    pub registry: SharedRegistry,
    pub client: RpcClient,
}

impl TestCaller {
    pub fn new() -> Self {
        Self::with_config(&RpcConfig::default())
    }

    pub fn with_config(config: &RpcConfig) -> Self {
        let keypair = Arc::new(NodeKeypair::generate());
        let registry = new_shared_registry(loopback_identity(&keypair, 0));
        let client = RpcClient::new(keypair.clone(), registry.clone(), config);
        Self {
            keypair,
            registry,
            client,
        }
    }
}
