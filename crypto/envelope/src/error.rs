// Copyright (c) 2024 Botho Foundation

//! Error types for the envelope crate.

use displaydoc::Display;
use thiserror::Error;

/// Errors raised while handling node keys or envelopes.
///
/// None of these carry key material or plaintext.
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
pub enum EnvelopeError {
    /// Invalid public key: {0}
    InvalidPublicKey(String),

    /// Invalid secret key
    InvalidSecretKey,

    /// Envelope is addressed to {expected}, not to {actual}
    WrongRecipient {
        /// Id the envelope was sealed for
        expected: String,
        /// Id of the key that tried to open it
        actual: String,
    },

    /// Sender identity does not match the sealing key
    SenderMismatch,

    /// Decryption failed
    Decryption,

    /// Failed to serialize envelope: {0}
    Serialization(String),

    /// Failed to deserialize envelope: {0}
    Deserialization(String),
}

/// Result type for envelope operations.
pub type EnvelopeResult<T> = Result<T, EnvelopeError>;
