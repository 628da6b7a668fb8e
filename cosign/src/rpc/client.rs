// Copyright (c) 2024 Botho Foundation

//! Client side of the command transport.

use crate::{
    protocol::SigningCommand,
    rpc::{
        channel::FrameChannel,
        error::{RpcError, RpcResult},
        RpcConfig, INVALID_COMMAND,
    },
};
use bytes::Bytes;
use cosign_common::PeerIdentity;
use cosign_crypto_envelope::{EncryptedEnvelope, NodeKeypair};
use cosign_gossip::SharedRegistry;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpStream, time::timeout};
use tracing::debug;

/// Sends commands to other cluster members.
#[derive(Clone)]
pub struct RpcClient {
    keypair: Arc<NodeKeypair>,
    registry: SharedRegistry,
    request_timeout: Duration,
    max_frame_len: usize,
}

impl RpcClient {
    /// Create a client that signs requests as the registry's local node.
    pub fn new(keypair: Arc<NodeKeypair>, registry: SharedRegistry, config: &RpcConfig) -> Self {
        Self {
            keypair,
            registry,
            request_timeout: config.request_timeout(),
            max_frame_len: config.max_frame_len,
        }
    }

    /// Bound applied to each exchange.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Send `command` to `target` and wait for its reply.
    ///
    /// The whole exchange, connect included, is bounded by the request
    /// timeout. Running out of time yields [`RpcError::Timeout`].
    pub async fn send(
        &self,
        command: &SigningCommand,
        target: &PeerIdentity,
    ) -> RpcResult<SigningCommand> {
        debug!(target = %target, kind = %command.kind, "Sending command");
        match timeout(self.request_timeout, self.exchange(command, target)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(target = %target, "Command timed out");
                Err(RpcError::Timeout)
            }
        }
    }

    /// Send `command` to the cluster member with id `peer_id`.
    pub async fn send_to(&self, command: &SigningCommand, peer_id: &str) -> RpcResult<SigningCommand> {
        let target = self
            .registry
            .get(peer_id)
            .ok_or_else(|| RpcError::UnknownPeer(peer_id.to_string()))?;
        self.send(command, &target).await
    }

    async fn exchange(
        &self,
        command: &SigningCommand,
        target: &PeerIdentity,
    ) -> RpcResult<SigningCommand> {
        let plaintext = zeroize::Zeroizing::new(command.to_wire()?);
        let request =
            EncryptedEnvelope::seal(&self.keypair, &self.registry.local(), target, &plaintext)?;

        let stream = TcpStream::connect(target.rpc_endpoint()).await?;
        let mut channel = FrameChannel::new(stream, self.max_frame_len);
        channel.send(Bytes::from(request.to_wire()?)).await?;

        let reply = channel.recv().await?;
        if &reply[..] == INVALID_COMMAND {
            return Err(RpcError::InvalidCommand);
        }

        let envelope = EncryptedEnvelope::from_wire(&reply)?;
        if envelope.from.id != target.id {
            return Err(RpcError::UnexpectedSender {
                expected: target.id.clone(),
                actual: envelope.from.id,
            });
        }
        let plaintext = zeroize::Zeroizing::new(envelope.open(&self.keypair)?);
        Ok(SigningCommand::from_wire(&plaintext)?)
    }
}
