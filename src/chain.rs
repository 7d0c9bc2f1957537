// Copyright (c) 2025 Ignis Foundation

//! Capability interfaces the consensus core consumes.
//!
//! The core holds these as `Arc<dyn _>` snapshots and never observes their
//! internal structure. All reads are pure with respect to one snapshot;
//! genuinely fatal conditions (storage corruption) must panic inside the
//! implementation rather than be encoded in the return types, so that the
//! core never masks them.

use crate::account::{PrivateKey, PublicKey};
use crate::block::{Block, BlockId, ConsensusData};
use crate::config::ChainSettings;
use crate::transaction::Transaction;

/// Read-only view over a chain snapshot.
pub trait History: Send + Sync {
    /// The chain tip, `None` only on an empty store.
    fn last_block(&self) -> Option<Block>;

    fn block_by_id(&self, id: &BlockId) -> Option<Block>;

    /// Walk `depth` blocks toward genesis; `depth = 1` is the direct parent.
    fn parent(&self, block: &Block, depth: u32) -> Option<Block>;

    /// Height of the block with this id; genesis has height 1.
    fn height_of(&self, id: &BlockId) -> Option<u32>;

    /// Height of the tip.
    fn height(&self) -> u32;
}

/// Balance queries against a state snapshot.
pub trait State: Send + Sync {
    /// Balance of `account` at `at_height`, counting only funds that have
    /// been stable for `confirmations` blocks.
    fn effective_balance_with_confirmations(
        &self,
        account: &PublicKey,
        at_height: u32,
        confirmations: u32,
    ) -> u64;
}

/// NTP-corrected wall clock. The core never reads system time directly.
pub trait TimeSource: Send + Sync {
    /// Corrected time, milliseconds since the chain epoch.
    fn corrected_time(&self) -> i64;
}

/// Split of a candidate list into rejected and surviving transactions.
///
/// `accepted` preserves the relative order of the input; the pool relies on
/// this when it filters an already-sorted sequence.
#[derive(Debug, Clone)]
pub struct ValidatedTransactions {
    pub rejected: Vec<Transaction>,
    pub accepted: Vec<Transaction>,
}

/// The leveled transaction validator, treated as an oracle. Must be
/// deterministic for a given state snapshot.
pub trait TransactionValidator: Send + Sync {
    fn validate(
        &self,
        settings: &ChainSettings,
        state: &dyn State,
        txs: &[Transaction],
        at_height: Option<u32>,
        now_ms: i64,
    ) -> ValidatedTransactions;
}

/// Assembles and signs a block. Produces the content id and signature; the
/// consensus core does not inspect the signing algorithm.
pub trait BlockBuilder: Send + Sync {
    fn build_and_sign(
        &self,
        version: u32,
        timestamp: i64,
        parent_id: BlockId,
        consensus: ConsensusData,
        transactions: Vec<Transaction>,
        signer: &PrivateKey,
    ) -> Block;
}
