//! ECDSA/secp256k1 keypairs used to author and verify locking scripts.

use secp256k1::{PublicKey, Secp256k1, SecretKey};

/// A secp256k1 keypair, as held by a wallet or used by the genesis block
/// builder. Holding the curve context alongside the keys avoids
/// re-initializing it on every sign/verify call.
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random keypair.
    pub fn generate<R: rand_core::RngCore + rand_core::CryptoRng>(rng: &mut R) -> KeyPair {
        let secp = Secp256k1::new();
        let secret_key = SecretKey::new(rng);
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_key(secret_key: SecretKey) -> KeyPair {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }
}
