//! `mapKeys`/`mapPubKeys`: the set of keys this wallet can sign for, indexed
//! the two ways a locking script can reference a key.

use std::collections::HashMap;

use node_chain::transparent::KeyPair;
use node_script::hashes::hash160;
use node_script::signer::Template;

/// Keys this wallet holds, indexed by raw public key and by its hash160 so
/// both standard script templates resolve in a lookup.
#[derive(Default)]
pub struct KeyStore {
    by_pubkey: HashMap<Vec<u8>, KeyPair>,
    by_pubkey_hash: HashMap<[u8; 20], Vec<u8>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_pubkey.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pubkey.is_empty()
    }

    /// `AddKey`: records a keypair under both its raw encoding and its hash160.
    pub fn add_key(&mut self, key_pair: KeyPair) -> Vec<u8> {
        let public_key = key_pair.public_key.serialize().to_vec();
        self.by_pubkey_hash
            .insert(hash160(&public_key), public_key.clone());
        self.by_pubkey.insert(public_key.clone(), key_pair);
        public_key
    }

    /// `MakeNewKey`/`GenerateNewKey`: generates a fresh keypair and stores it.
    pub fn generate_key<R: rand_core::RngCore + rand_core::CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Vec<u8> {
        self.add_key(KeyPair::generate(rng))
    }

    pub fn find(&self, public_key: &[u8]) -> Option<&KeyPair> {
        self.by_pubkey.get(public_key)
    }

    pub fn find_by_hash(&self, public_key_hash: &[u8; 20]) -> Option<&KeyPair> {
        let public_key = self.by_pubkey_hash.get(public_key_hash)?;
        self.by_pubkey.get(public_key)
    }

    /// `::IsMine(scriptPubKey)`: true if this wallet can sign for `template`.
    pub fn is_mine(&self, template: &Template) -> bool {
        match template {
            Template::PayToPubKey { public_key } => self.by_pubkey.contains_key(public_key),
            Template::PayToPubKeyHash { public_key_hash } => {
                self.by_pubkey_hash.contains_key(public_key_hash)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn generated_key_is_mine_by_both_templates() {
        node_test::init();
        let mut store = KeyStore::new();
        let public_key = store.generate_key(&mut OsRng);
        let hash = hash160(&public_key);

        assert!(store.is_mine(&Template::PayToPubKey {
            public_key: public_key.clone()
        }));
        assert!(store.is_mine(&Template::PayToPubKeyHash {
            public_key_hash: hash
        }));
        assert!(store.find(&public_key).is_some());
        assert!(store.find_by_hash(&hash).is_some());
    }

    #[test]
    fn unknown_key_is_not_mine() {
        node_test::init();
        let store = KeyStore::new();
        assert!(!store.is_mine(&Template::PayToPubKeyHash {
            public_key_hash: [0; 20]
        }));
    }
}
