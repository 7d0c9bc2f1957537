// Copyright (c) 2025 Ignis Foundation

//! The consensus digest.
//!
//! Every consensus rule that involves hashing goes through [`hash_chunks`]:
//! a Blake2b-256 digest over the concatenation of the input byte strings.
//! The generation-signature chain is built exclusively from this function,
//! so its output must be bit-identical on every node.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

pub const DIGEST_LENGTH: usize = 32;

/// Hash a sequence of byte strings into a single 32-byte digest.
///
/// Equivalent to hashing the concatenation of all chunks.
pub fn hash_chunks(chunks: &[&[u8]]) -> [u8; DIGEST_LENGTH] {
    let mut hasher = Blake2b256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}
