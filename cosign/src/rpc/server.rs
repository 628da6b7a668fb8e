// Copyright (c) 2024 Botho Foundation

//! Server side of the command transport.
//!
//! Connections are served strictly one at a time by a single task, so the
//! handler never sees two commands concurrently. Pending connections wait in
//! the listen backlog. The handler itself runs on the blocking pool; a
//! handler that panics yields a rejected reply and the endpoint keeps
//! serving.

use crate::{
    dispatcher::CommandHandler,
    protocol::SigningCommand,
    rpc::{
        channel::FrameChannel,
        error::{RpcError, RpcResult},
        RpcConfig, INVALID_COMMAND,
    },
};
use bytes::Bytes;
use cosign_crypto_envelope::{EncryptedEnvelope, NodeKeypair};
use cosign_gossip::SharedRegistry;
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    net::{TcpListener, TcpStream, ToSocketAddrs},
    select,
    sync::watch,
    task::JoinHandle,
};
use tracing::{debug, info, warn};

/// A bound command endpoint.
pub struct RpcServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    keypair: Arc<NodeKeypair>,
    registry: SharedRegistry,
    handler: Arc<dyn CommandHandler>,
    config: RpcConfig,
}

impl RpcServer {
    /// Bind the endpoint. Port 0 picks a free port; see
    /// [`RpcServer::local_addr`].
    pub async fn bind(
        addr: impl ToSocketAddrs,
        keypair: Arc<NodeKeypair>,
        registry: SharedRegistry,
        handler: Arc<dyn CommandHandler>,
        config: RpcConfig,
    ) -> RpcResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            keypair,
            registry,
            handler,
            config,
        })
    }

    /// Address the endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve on a dedicated task until the handle is shut down or dropped.
    pub fn spawn(self) -> RpcServerHandle {
        let local_addr = self.local_addr;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        RpcServerHandle {
            local_addr,
            shutdown_tx,
            task,
        }
    }

    /// Accept and serve connections until `shutdown` fires.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(addr = %self.local_addr, "Command endpoint listening");

        loop {
            select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => self.serve(stream, peer_addr).await,
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                },
                _ = shutdown.changed() => break,
            }
        }

        debug!(addr = %self.local_addr, "Command endpoint stopped");
    }

    async fn serve(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let mut channel = FrameChannel::new(stream, self.config.max_frame_len);

        // A client that connects and never writes must not hold the endpoint.
        let request = match channel
            .recv_with_timeout(self.config.request_timeout())
            .await
        {
            Ok(request) => request,
            Err(RpcError::Io(e)) => {
                // Oversized or truncated frame. Still answer.
                warn!(%peer_addr, error = %e, "Unreadable request");
                let _ = channel.send(Bytes::from_static(INVALID_COMMAND)).await;
                return;
            }
            Err(e) => {
                debug!(%peer_addr, error = %e, "No request received");
                return;
            }
        };

        let reply = self.respond(&request, peer_addr).await;
        if let Err(e) = channel.send(reply).await {
            warn!(%peer_addr, error = %e, "Failed to send reply");
        }
    }

    /// Produce the reply frame for one request frame. Never fails: anything
    /// undecodable is answered with [`INVALID_COMMAND`].
    async fn respond(&self, request: &[u8], peer_addr: SocketAddr) -> Bytes {
        let envelope = match EncryptedEnvelope::from_wire(request) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(%peer_addr, error = %e, "Malformed envelope");
                return Bytes::from_static(INVALID_COMMAND);
            }
        };
        if let Err(e) = envelope.from.validate() {
            warn!(%peer_addr, error = %e, "Envelope carries an invalid sender");
            return Bytes::from_static(INVALID_COMMAND);
        }

        let command = match envelope
            .open(&self.keypair)
            .map_err(RpcError::from)
            .and_then(|plaintext| SigningCommand::from_wire(&plaintext).map_err(RpcError::from))
        {
            Ok(command) => command,
            Err(e) => {
                warn!(
                    %peer_addr,
                    sender = envelope.from.short_id(),
                    error = %e,
                    "Undecodable command"
                );
                return Bytes::from_static(INVALID_COMMAND);
            }
        };

        if !self.registry.contains(&envelope.from.id) {
            debug!(sender = %envelope.from, "Command from a peer not in the registry");
        }
        debug!(sender = %envelope.from, kind = %command.kind, "Dispatching command");

        // Wallets may block or panic. Keep both off the accept loop.
        let handler = self.handler.clone();
        let fallback = command.clone();
        let result = match tokio::task::spawn_blocking(move || handler.handle(command)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(sender = %envelope.from, error = %e, "Command handler failed");
                fallback.rejected("command handler failed")
            }
        };

        match self.seal_reply(&result, &envelope) {
            Ok(reply) => Bytes::from(reply),
            Err(e) => {
                warn!(%peer_addr, error = %e, "Failed to seal reply");
                Bytes::from_static(INVALID_COMMAND)
            }
        }
    }

    fn seal_reply(&self, result: &SigningCommand, request: &EncryptedEnvelope) -> RpcResult<Vec<u8>> {
        let plaintext = zeroize::Zeroizing::new(result.to_wire()?);
        let reply = EncryptedEnvelope::seal(
            &self.keypair,
            &self.registry.local(),
            &request.from,
            &plaintext,
        )?;
        Ok(reply.to_wire()?)
    }
}

/// Handle to a running command endpoint.
pub struct RpcServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RpcServerHandle {
    /// Address the endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop serving and wait for the task to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Command endpoint task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CommandKind;
    use cosign_common::PeerIdentity;
    use cosign_gossip::new_shared_registry;

    struct Echo;

    impl CommandHandler for Echo {
        fn handle(&self, command: SigningCommand) -> SigningCommand {
            command
        }
    }

    struct Explode;

    impl CommandHandler for Explode {
        fn handle(&self, _: SigningCommand) -> SigningCommand {
            panic!("wallet backend crashed");
        }
    }

    async fn server() -> (RpcServer, Arc<NodeKeypair>) {
        server_with(Arc::new(Echo)).await
    }

    async fn server_with(handler: Arc<dyn CommandHandler>) -> (RpcServer, Arc<NodeKeypair>) {
        let keypair = Arc::new(NodeKeypair::generate());
        let registry = new_shared_registry(PeerIdentity::new_origin(
            keypair.id(),
            "127.0.0.1",
            7300,
            0,
            0,
        ));
        let server = RpcServer::bind(
            "127.0.0.1:0",
            keypair.clone(),
            registry,
            handler,
            RpcConfig::default(),
        )
        .await
        .unwrap();
        (server, keypair)
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:1".parse().unwrap()
    }

    #[tokio::test]
    async fn test_respond_to_garbage() {
        let (server, _) = server().await;
        assert_eq!(&server.respond(b"{nope", addr()).await[..], INVALID_COMMAND);
    }

    #[tokio::test]
    async fn test_respond_to_envelope_for_someone_else() {
        let (server, _) = server().await;
        let client = NodeKeypair::generate();
        let other = NodeKeypair::generate();
        let from = PeerIdentity::new_origin(client.id(), "127.0.0.1", 1, 2, 0);
        let to = PeerIdentity::new_origin(other.id(), "127.0.0.1", 3, 4, 0);

        let command = SigningCommand::sign("BTC", vec![], "00").to_wire().unwrap();
        let envelope = EncryptedEnvelope::seal(&client, &from, &to, &command).unwrap();

        let reply = server.respond(&envelope.to_wire().unwrap(), addr()).await;
        assert_eq!(&reply[..], INVALID_COMMAND);
    }

    #[tokio::test]
    async fn test_respond_seals_reply_to_sender() {
        let (server, server_key) = server().await;
        let client = NodeKeypair::generate();
        let from = PeerIdentity::new_origin(client.id(), "127.0.0.1", 1, 2, 0);
        let to = PeerIdentity::new_origin(server_key.id(), "127.0.0.1", 7300, 0, 0);

        let command = SigningCommand {
            kind: CommandKind::Unknown("ping".to_string()),
            ..SigningCommand::sign("BTC", vec![], "00")
        };
        let envelope =
            EncryptedEnvelope::seal(&client, &from, &to, &command.to_wire().unwrap()).unwrap();

        let reply = server.respond(&envelope.to_wire().unwrap(), addr()).await;
        let reply = EncryptedEnvelope::from_wire(&reply).unwrap();
        assert_eq!(reply.from.id, server_key.id());
        let plaintext = reply.open(&client).unwrap();
        assert_eq!(SigningCommand::from_wire(&plaintext).unwrap(), command);
    }

    fn sealed_request(
        client: &NodeKeypair,
        server_key: &NodeKeypair,
        command: &SigningCommand,
    ) -> EncryptedEnvelope {
        let from = PeerIdentity::new_origin(client.id(), "127.0.0.1", 1, 2, 0);
        let to = PeerIdentity::new_origin(server_key.id(), "127.0.0.1", 7300, 0, 0);
        EncryptedEnvelope::seal(client, &from, &to, &command.to_wire().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_respond_to_sender_with_non_ascii_id() {
        let (server, server_key) = server().await;
        let client = NodeKeypair::generate();
        let envelope = sealed_request(
            &client,
            &server_key,
            &SigningCommand::sign("BTC", vec![], "00"),
        );

        // Rewrite the sender id so a byte-indexed prefix would split 'é'.
        let mut json: serde_json::Value =
            serde_json::from_slice(&envelope.to_wire().unwrap()).unwrap();
        json["from"]["id"] = serde_json::Value::from("aaaaaaaaaaaé");
        let request = serde_json::to_vec(&json).unwrap();

        // With a subscriber installed every log field is formatted.
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let reply = server.respond(&request, addr()).await;
        assert_eq!(&reply[..], INVALID_COMMAND);
    }

    #[tokio::test]
    async fn test_respond_when_handler_panics() {
        let (server, server_key) = server_with(Arc::new(Explode)).await;
        let client = NodeKeypair::generate();
        let command = SigningCommand::sign("BTC", vec!["a".to_string()], "00");
        let envelope = sealed_request(&client, &server_key, &command);

        let reply = server.respond(&envelope.to_wire().unwrap(), addr()).await;
        let reply = EncryptedEnvelope::from_wire(&reply).unwrap();
        let reply = SigningCommand::from_wire(&reply.open(&client).unwrap()).unwrap();
        assert!(reply.is_rejected());
        assert_eq!(reply.kind, command.kind);

        // The endpoint is still usable afterwards.
        let reply = server.respond(&envelope.to_wire().unwrap(), addr()).await;
        assert_ne!(&reply[..], INVALID_COMMAND);
    }
}
