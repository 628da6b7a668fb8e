// Copyright (c) 2024 Botho Foundation

//! secp256k1 node keys.
//!
//! A node's cluster id is the lowercase hex of its 33-byte compressed SEC1
//! public key. Uncompressed (65-byte) ids are accepted when parsing peers.

use crate::error::{EnvelopeError, EnvelopeResult};
use k256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use rand_core::OsRng;
use zeroize::Zeroizing;

/// The long-term key pair of a cluster node.
///
/// The secret scalar is zeroized on drop by `k256`. Neither `Debug` nor any
/// accessor exposes it except [`NodeKeypair::to_hex`], which is only used to
/// write the key file.
#[derive(Clone)]
pub struct NodeKeypair {
    secret: SecretKey,
    id: String,
}

impl core::fmt::Debug for NodeKeypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NodeKeypair {{ id: {} }}", self.id)
    }
}

impl NodeKeypair {
    /// Generate a fresh key pair from the operating system RNG.
    pub fn generate() -> Self {
        Self::from_secret(SecretKey::random(&mut OsRng))
    }

    /// Build a key pair from a 32-byte big-endian secret scalar.
    pub fn from_bytes(bytes: &[u8]) -> EnvelopeResult<Self> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| EnvelopeError::InvalidSecretKey)?;
        Ok(Self::from_secret(secret))
    }

    /// Build a key pair from the hex form written by [`NodeKeypair::to_hex`].
    pub fn from_hex(encoded: &str) -> EnvelopeResult<Self> {
        let bytes = Zeroizing::new(
            hex::decode(encoded.trim()).map_err(|_| EnvelopeError::InvalidSecretKey)?,
        );
        Self::from_bytes(&bytes)
    }

    /// Hex encoding of the secret scalar.
    pub fn to_hex(&self) -> Zeroizing<String> {
        let mut bytes = Zeroizing::new([0u8; 32]);
        bytes.copy_from_slice(&self.secret.to_bytes());
        Zeroizing::new(hex::encode(bytes.as_slice()))
    }

    /// The node's cluster id (hex compressed public key).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The public half of the key pair.
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }

    fn from_secret(secret: SecretKey) -> Self {
        let id = hex::encode(secret.public_key().to_encoded_point(true).as_bytes());
        Self { secret, id }
    }
}

/// Decode a peer's public key from its hex cluster id.
pub fn parse_public_key(id: &str) -> EnvelopeResult<PublicKey> {
    let bytes = hex::decode(id).map_err(|e| EnvelopeError::InvalidPublicKey(e.to_string()))?;
    PublicKey::from_sec1_bytes(&bytes)
        .map_err(|_| EnvelopeError::InvalidPublicKey(format!("not a secp256k1 point: {id}")))
}
