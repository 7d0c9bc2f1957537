// Copyright (c) 2025 Ignis Foundation

//! The transaction slice visible to consensus, and the deterministic
//! ordering of transactions inside a block.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::account::PublicKey;

/// Content hash of a transaction.
pub type TxId = [u8; 32];

/// Sealed set of transaction families. Anything type-specific beyond the
/// ordering tag is handled by the external transaction validator.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TxKind {
    Payment = 1,
    Transfer = 2,
    Data = 3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub kind: TxKind,
    pub sender: PublicKey,

    /// Milliseconds since the chain epoch; used only for pool age checks.
    pub timestamp: i64,

    pub fee: u64,

    /// Opaque body, passed through to the external validator.
    pub payload: Vec<u8>,
}

impl Transaction {
    /// Canonical serialized size, the fee-per-byte denominator.
    pub fn size_bytes(&self) -> usize {
        bincode::serialize(self).map(|b| b.len()).unwrap_or(1)
    }

    pub fn fee_per_byte(&self) -> u64 {
        self.fee / self.size_bytes().max(1) as u64
    }
}

/// Total order of transactions inside a block: ascending by
/// `(kind tag, sender, id)`. Identical on every node, so a received block
/// can be checked against it.
pub fn block_ordering(a: &Transaction, b: &Transaction) -> Ordering {
    (a.kind as u8, a.sender.as_bytes(), &a.id).cmp(&(b.kind as u8, b.sender.as_bytes(), &b.id))
}

/// Whether `txs` is already laid out in [`block_ordering`].
pub fn is_block_sorted(txs: &[Transaction]) -> bool {
    txs.windows(2)
        .all(|pair| block_ordering(&pair[0], &pair[1]) != Ordering::Greater)
}
