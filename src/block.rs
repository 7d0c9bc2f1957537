// Copyright (c) 2025 Ignis Foundation

//! Block types as seen by the consensus core.

use serde::{Deserialize, Serialize};

use crate::account::PublicKey;
use crate::transaction::Transaction;

/// Content hash of a block.
pub type BlockId = [u8; 32];

/// The consensus parameters carried by every block.
///
/// `generation_signature` is chained: each block's value is the digest of its
/// parent's value concatenated with the forger's public key. `base_target` is
/// the per-block difficulty and must stay within `(0, i64::MAX / avg_delay]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusData {
    pub base_target: u64,
    pub generation_signature: [u8; 32],
}

/// A block, reduced to the fields the consensus core touches.
///
/// `id`, `score` and `signature` are produced by higher layers (block codec,
/// fork bookkeeping, block builder); the core only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub parent_id: BlockId,
    pub version: u32,

    /// Milliseconds since the chain epoch. Monotonic per chain, not per node.
    pub timestamp: i64,

    pub generator: PublicKey,
    pub consensus: ConsensusData,
    pub transactions: Vec<Transaction>,

    /// Monotone fork weight assigned by the chain scorer.
    pub score: u64,

    pub signature: Vec<u8>,
}
