// Copyright (c) 2024 Botho Foundation

//! Per-pair key agreement.

use crate::keys::NodeKeypair;
use k256::PublicKey;
use zeroize::Zeroizing;

/// Length of the derived symmetric key.
pub const SHARED_SECRET_LEN: usize = 32;

/// The x-coordinate of the ECDH point, used directly as the AES-256 key.
#[derive(Clone, Eq, PartialEq)]
pub struct SharedSecret(Zeroizing<[u8; SHARED_SECRET_LEN]>);

impl SharedSecret {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_LEN] {
        &self.0
    }
}

impl core::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Compute the secret shared between `ours` and the holder of `theirs`.
pub fn shared_secret(ours: &NodeKeypair, theirs: &PublicKey) -> SharedSecret {
    let point = k256::ecdh::diffie_hellman(ours.secret().to_nonzero_scalar(), theirs.as_affine());
    let mut bytes = Zeroizing::new([0u8; SHARED_SECRET_LEN]);
    bytes.copy_from_slice(point.raw_secret_bytes());
    SharedSecret(bytes)
}
