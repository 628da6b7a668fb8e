// Copyright (c) 2024 Botho Foundation

#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Point-to-point encryption of cluster commands.
//!
//! Each node owns a secp256k1 [`NodeKeypair`]; its public key, hex encoded,
//! is the node's cluster id. Two nodes derive the same 32-byte secret via
//! ECDH (`shared(a.secret, b.public) == shared(b.secret, a.public)`), and an
//! [`EncryptedEnvelope`] carries AES-256-CBC ciphertext keyed by that
//! secret. Only public ids, the IV and the ciphertext cross the wire.
//!
//! ```
//! use cosign_common::PeerIdentity;
//! use cosign_crypto_envelope::{EncryptedEnvelope, NodeKeypair};
//!
//! let alice = NodeKeypair::generate();
//! let bob = NodeKeypair::generate();
//! let from = PeerIdentity::new_origin(alice.id(), "127.0.0.1", 7300, 7301, 0);
//! let to = PeerIdentity::new_origin(bob.id(), "127.0.0.1", 7310, 7311, 0);
//!
//! let envelope = EncryptedEnvelope::seal(&alice, &from, &to, b"hello").unwrap();
//! assert_eq!(envelope.open(&bob).unwrap(), b"hello");
//! ```

pub mod ecdh;
pub mod envelope;
pub mod error;
pub mod keys;

pub use ecdh::{shared_secret, SharedSecret};
pub use envelope::{EncryptedEnvelope, IV_LEN};
pub use error::{EnvelopeError, EnvelopeResult};
pub use keys::{parse_public_key, NodeKeypair};
