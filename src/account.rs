// Copyright (c) 2025 Ignis Foundation

//! Forger identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const PUBLIC_KEY_LENGTH: usize = 32;

/// A forger's public identity: an opaque 32-byte tag.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0[0..8]))
    }
}

/// A forging account. The consensus core never signs with the secret half;
/// it only carries the capability through to the block builder.
#[derive(Clone)]
pub struct PrivateKey {
    public: PublicKey,
    secret: [u8; 32],
}

impl PrivateKey {
    pub fn from_bytes(secret: [u8; 32], public: PublicKey) -> Self {
        Self { public, secret }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Raw secret bytes, for block builder implementations only.
    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the secret half
        write!(f, "PrivateKey({:?})", self.public)
    }
}
