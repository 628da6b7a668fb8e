// Copyright (c) 2024 Botho Foundation

//! The encrypted container that carries a command between two peers.

use crate::{
    ecdh::shared_secret,
    error::{EnvelopeError, EnvelopeResult},
    keys::{parse_public_key, NodeKeypair},
};
use aes::{
    cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit},
    Aes256,
};
use cosign_common::PeerIdentity;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block size, and so the IV length.
pub const IV_LEN: usize = 16;

/// A command payload encrypted from one peer to another.
///
/// The symmetric key is never stored: both ends recompute it from their own
/// secret and the other side's public id.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    /// Identity of the sender.
    pub from: PeerIdentity,

    /// Identity of the intended recipient.
    pub to: PeerIdentity,

    /// Fresh random IV for this envelope.
    #[serde(with = "hex")]
    pub iv: [u8; IV_LEN],

    /// AES-256-CBC/PKCS#7 output.
    #[serde(with = "hex")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Encrypt `plaintext` from `from` (whose secret is `sender`) to `to`.
    ///
    /// A new IV is drawn from the OS RNG on every call.
    pub fn seal(
        sender: &NodeKeypair,
        from: &PeerIdentity,
        to: &PeerIdentity,
        plaintext: &[u8],
    ) -> EnvelopeResult<Self> {
        if from.id != sender.id() {
            return Err(EnvelopeError::SenderMismatch);
        }
        let recipient_key = parse_public_key(&to.id)?;
        let key = shared_secret(sender, &recipient_key);

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        Ok(Self {
            from: from.clone(),
            to: to.clone(),
            iv,
            ciphertext,
        })
    }

    /// Decrypt with the recipient's key pair.
    pub fn open(&self, recipient: &NodeKeypair) -> EnvelopeResult<Vec<u8>> {
        if self.to.id != recipient.id() {
            return Err(EnvelopeError::WrongRecipient {
                expected: self.to.id.clone(),
                actual: recipient.id().to_string(),
            });
        }
        let sender_key = parse_public_key(&self.from.id)?;
        let key = shared_secret(recipient, &sender_key);

        Aes256CbcDec::new(key.as_bytes().into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&self.ciphertext)
            .map_err(|_| EnvelopeError::Decryption)
    }

    /// JSON wire form.
    pub fn to_wire(&self) -> EnvelopeResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| EnvelopeError::Serialization(e.to_string()))
    }

    /// Parse the JSON wire form.
    pub fn from_wire(bytes: &[u8]) -> EnvelopeResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn identity(keypair: &NodeKeypair, port: u16) -> PeerIdentity {
        PeerIdentity::new_origin(keypair.id(), "127.0.0.1", port, port + 1, 0)
    }

    fn fixed_keypair(byte: u8) -> NodeKeypair {
        NodeKeypair::from_bytes(&[byte; 32]).unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_envelope_roundtrip(plaintext in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let alice = fixed_keypair(1);
            let bob = fixed_keypair(2);
            let envelope =
                EncryptedEnvelope::seal(&alice, &identity(&alice, 7300), &identity(&bob, 7310), &plaintext)
                    .unwrap();
            prop_assert_eq!(envelope.open(&bob).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_iv_unique_across_10k_envelopes() {
        let alice = fixed_keypair(3);
        let bob = fixed_keypair(4);
        let from = identity(&alice, 7300);
        let to = identity(&bob, 7310);

        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let envelope = EncryptedEnvelope::seal(&alice, &from, &to, b"same plaintext").unwrap();
            assert!(seen.insert(envelope.iv), "IV reused");
        }
    }

    #[test]
    fn test_ciphertext_is_padded_to_block() {
        let alice = fixed_keypair(5);
        let bob = fixed_keypair(6);
        let envelope =
            EncryptedEnvelope::seal(&alice, &identity(&alice, 1), &identity(&bob, 3), &[7u8; 16])
                .unwrap();
        // A full block of plaintext gains a full block of padding.
        assert_eq!(envelope.ciphertext.len(), 32);
    }

    #[test]
    fn test_wrong_recipient_is_refused() {
        let alice = fixed_keypair(7);
        let bob = fixed_keypair(8);
        let mallory = fixed_keypair(9);
        let envelope =
            EncryptedEnvelope::seal(&alice, &identity(&alice, 1), &identity(&bob, 3), b"secret")
                .unwrap();

        assert!(matches!(
            envelope.open(&mallory),
            Err(EnvelopeError::WrongRecipient { .. })
        ));
    }

    #[test]
    fn test_forged_recipient_does_not_yield_plaintext() {
        let alice = fixed_keypair(10);
        let bob = fixed_keypair(11);
        let mallory = fixed_keypair(12);
        let mut envelope =
            EncryptedEnvelope::seal(&alice, &identity(&alice, 1), &identity(&bob, 3), b"secret")
                .unwrap();

        // Re-address to mallory: the key no longer matches, so padding almost
        // always fails and never reproduces the plaintext.
        envelope.to = identity(&mallory, 5);
        assert_ne!(envelope.open(&mallory).ok(), Some(b"secret".to_vec()));
    }

    #[test]
    fn test_seal_checks_sender_identity() {
        let alice = fixed_keypair(13);
        let bob = fixed_keypair(14);
        let result = EncryptedEnvelope::seal(&alice, &identity(&bob, 1), &identity(&bob, 3), b"x");
        assert_eq!(result.unwrap_err(), EnvelopeError::SenderMismatch);
    }

    #[test]
    fn test_seal_rejects_bad_recipient_id() {
        let alice = fixed_keypair(15);
        let mut to = identity(&alice, 3);
        to.id = "00".repeat(33);
        let result = EncryptedEnvelope::seal(&alice, &identity(&alice, 1), &to, b"x");
        assert!(matches!(result, Err(EnvelopeError::InvalidPublicKey(_))));
    }

    #[test]
    fn test_truncated_ciphertext_is_a_decryption_error() {
        let alice = fixed_keypair(16);
        let bob = fixed_keypair(17);
        let mut envelope =
            EncryptedEnvelope::seal(&alice, &identity(&alice, 1), &identity(&bob, 3), b"payload")
                .unwrap();
        envelope.ciphertext.truncate(5);
        assert_eq!(envelope.open(&bob).unwrap_err(), EnvelopeError::Decryption);
    }

    #[test]
    fn test_wire_roundtrip_and_hex_fields() {
        let alice = fixed_keypair(18);
        let bob = fixed_keypair(19);
        let envelope =
            EncryptedEnvelope::seal(&alice, &identity(&alice, 1), &identity(&bob, 3), b"payload")
                .unwrap();
        let wire = envelope.to_wire().unwrap();
        let text = String::from_utf8(wire.clone()).unwrap();
        assert!(text.contains(&format!("\"iv\":\"{}\"", hex::encode(envelope.iv))));

        let parsed = EncryptedEnvelope::from_wire(&wire).unwrap();
        assert_eq!(parsed, envelope);
        assert_eq!(parsed.open(&bob).unwrap(), b"payload");
    }

    #[test]
    fn test_from_wire_rejects_garbage() {
        assert!(matches!(
            EncryptedEnvelope::from_wire(b"{not json"),
            Err(EnvelopeError::Deserialization(_))
        ));
    }
}
