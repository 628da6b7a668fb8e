// Copyright (c) 2024 Botho Foundation

//! Identity types shared by every crate in the cosign cluster.
//!
//! A cluster member is identified by the hex encoding of its secp256k1
//! public key. The same string is used as the registry lookup key and as the
//! input to the per-pair key agreement in the envelope crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod peer_identity;
pub mod time;

pub use peer_identity::{PeerIdentity, PeerIdentityError};
pub use time::now_secs;
