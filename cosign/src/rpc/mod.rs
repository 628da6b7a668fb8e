// Copyright (c) 2024 Botho Foundation

//! Point-to-point command transport.
//!
//! One TCP connection carries exactly one exchange: the client writes a
//! length-delimited frame holding an [`EncryptedEnvelope`] addressed to the
//! server, and the server answers with one frame holding an envelope sealed
//! back to the client. Requests the server cannot decrypt or parse are
//! answered with the literal [`INVALID_COMMAND`].
//!
//! [`EncryptedEnvelope`]: cosign_crypto_envelope::EncryptedEnvelope

pub mod channel;
pub mod client;
pub mod error;
pub mod server;

pub use channel::FrameChannel;
pub use client::RpcClient;
pub use error::{RpcError, RpcResult};
pub use server::{RpcServer, RpcServerHandle};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reply sent for a request that could not be decoded.
pub const INVALID_COMMAND: &[u8] = b"Invalid command format";

/// Default bound on one request/reply exchange.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 1_500;

/// Default largest accepted frame.
pub const DEFAULT_MAX_FRAME_LEN: usize = 256 * 1024;

/// Transport settings shared by client and server.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Bound on one exchange, in milliseconds.
    pub request_timeout_ms: u64,

    /// Largest frame either side accepts, in bytes.
    pub max_frame_len: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl RpcConfig {
    /// The exchange bound as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Override the exchange bound.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}
