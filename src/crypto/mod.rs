//! Key material for credentials bootstrap and key self-healing
//!
//! The protocol collaborator owns the cryptography; the adapter only needs
//! a way to mint key pairs, signed pre-keys, registration ids, and random
//! bytes. [`KeyGenerator`] is that seam, and [`CurveKeyGenerator`] is the
//! default Curve25519-backed implementation.
//!
//! Security: private key bytes are zeroized on drop and redacted from
//! `Debug` output.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::codec::buffer_json;

/// Prefix byte for the signed pre-key message (key bundle type)
const KEY_BUNDLE_TYPE: u8 = 5;

/// Registration ids fit in 14 bits
const REGISTRATION_ID_MASK: u16 = 0x3fff;

/// A public/private key pair as the protocol stores it
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyPair {
    /// Public key bytes (32 bytes)
    #[serde(with = "buffer_json")]
    pub public: Vec<u8>,
    /// Private key bytes (32 bytes), zeroized on drop
    #[serde(with = "buffer_json")]
    pub private: Vec<u8>,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(&self.public))
            .field("private", &"<redacted>")
            .finish()
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.private.zeroize();
    }
}

/// A pre-key signed by the identity key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignedPreKey {
    pub key_pair: KeyPair,
    #[serde(with = "buffer_json")]
    pub signature: Vec<u8>,
    pub key_id: u32,
}

/// Key-generation capabilities supplied to the adapter
pub trait KeyGenerator: Send + Sync {
    /// Generate a fresh key pair
    fn key_pair(&self) -> KeyPair;

    /// Build a signed pre-key from the identity key
    fn signed_pre_key(&self, identity: &KeyPair, key_id: u32) -> SignedPreKey;

    /// Generate a random registration id
    fn registration_id(&self) -> u32;

    /// Fill `len` bytes from a secure random source
    fn random_bytes(&self, len: usize) -> Vec<u8>;
}

/// Default Curve25519 key generator
#[derive(Debug, Clone, Copy, Default)]
pub struct CurveKeyGenerator;

impl CurveKeyGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self
    }
}

impl KeyGenerator for CurveKeyGenerator {
    fn key_pair(&self) -> KeyPair {
        let mut csprng = rand::thread_rng();
        let secret_bytes: [u8; 32] = csprng.gen();

        let secret = StaticSecret::from(secret_bytes);
        let public = X25519PublicKey::from(&secret);

        KeyPair {
            public: public.to_bytes().to_vec(),
            private: secret.to_bytes().to_vec(),
        }
    }

    fn signed_pre_key(&self, identity: &KeyPair, key_id: u32) -> SignedPreKey {
        let key_pair = self.key_pair();

        // Identity-key signature over the type-prefixed pre-key public.
        // The signing seed is derived from the identity secret so the
        // signature is stable for a given identity.
        let mut message = Vec::with_capacity(1 + key_pair.public.len());
        message.push(KEY_BUNDLE_TYPE);
        message.extend_from_slice(&key_pair.public);

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&Sha256::digest(&identity.private)[..32]);
        let signing_key = SigningKey::from_bytes(&seed);
        let signature = signing_key.sign(&message).to_bytes().to_vec();
        seed.zeroize();

        SignedPreKey {
            key_pair,
            signature,
            key_id,
        }
    }

    fn registration_id(&self) -> u32 {
        u32::from(rand::thread_rng().gen::<u16>() & REGISTRATION_ID_MASK)
    }

    fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    use serde_json::json;

    #[test]
    fn test_key_pair_generation() {
        let generator = CurveKeyGenerator::new();
        let kp = generator.key_pair();
        assert_eq!(kp.public.len(), 32);
        assert_eq!(kp.private.len(), 32);
        assert_ne!(kp.public, generator.key_pair().public);
    }

    #[test]
    fn test_signed_pre_key_verifies() {
        let generator = CurveKeyGenerator::new();
        let identity = generator.key_pair();
        let spk = generator.signed_pre_key(&identity, 1);

        assert_eq!(spk.key_id, 1);
        assert_eq!(spk.signature.len(), 64);

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&Sha256::digest(&identity.private)[..32]);
        let verifying: VerifyingKey = SigningKey::from_bytes(&seed).verifying_key();

        let mut message = vec![KEY_BUNDLE_TYPE];
        message.extend_from_slice(&spk.key_pair.public);
        let signature = Signature::from_slice(&spk.signature).unwrap();
        assert!(verifying.verify(&message, &signature).is_ok());
    }

    #[test]
    fn test_registration_id_fits_14_bits() {
        let generator = CurveKeyGenerator::new();
        for _ in 0..100 {
            assert!(generator.registration_id() < 16384);
        }
    }

    #[test]
    fn test_random_bytes_length() {
        let generator = CurveKeyGenerator::new();
        let bytes = generator.random_bytes(32);
        assert_eq!(bytes.len(), 32);
        assert!(bytes.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_key_pair_serializes_tagged() {
        let kp = KeyPair {
            public: vec![1, 2, 3],
            private: vec![4, 5, 6],
        };
        let encoded = serde_json::to_value(&kp).unwrap();
        assert_eq!(
            encoded,
            json!({
                "public": {"type": "Buffer", "data": "AQID"},
                "private": {"type": "Buffer", "data": "BAUG"},
            })
        );

        let decoded: KeyPair = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, kp);
    }

    #[test]
    fn test_debug_does_not_leak_private_key() {
        let generator = CurveKeyGenerator::new();
        let kp = generator.key_pair();
        let debug_str = format!("{:?}", kp);
        assert!(debug_str.contains("<redacted>"));
        assert!(!debug_str.contains(&hex::encode(&kp.private)));
    }
}
