// Copyright (c) 2024 Botho Foundation

//! Errors reported by the command transport.

use crate::protocol::ProtocolError;
use cosign_crypto_envelope::EnvelopeError;
use displaydoc::Display;
use thiserror::Error;

/// Errors that can occur while exchanging a command with a peer.
#[derive(Debug, Display, Error)]
pub enum RpcError {
    /// No reply within the request timeout
    Timeout,

    /// Peer closed the connection without replying
    ConnectionClosed,

    /// Peer could not decode the request
    InvalidCommand,

    /// Peer {0} is not a known cluster member
    UnknownPeer(String),

    /// Reply came from {actual}, expected {expected}
    UnexpectedSender {
        /// Id of the peer the request was sent to
        expected: String,
        /// Id found on the reply envelope
        actual: String,
    },

    /// I/O error: {0}
    Io(#[from] std::io::Error),

    /// Envelope error: {0}
    Envelope(#[from] EnvelopeError),

    /// Protocol error: {0}
    Protocol(#[from] ProtocolError),
}

impl RpcError {
    /// True for [`RpcError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout)
    }
}

/// Result type for transport operations.
pub type RpcResult<T> = Result<T, RpcError>;
