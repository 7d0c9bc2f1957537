// Copyright (c) 2025 Ignis Foundation

//! Consensus validation of inbound blocks.

use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::block::Block;
use crate::chain::{History, State, TimeSource};
use crate::config::{ChainSettings, MAX_TIME_DRIFT_MS, MIN_GENERATING_BALANCE};
use crate::consensus::kernel;
use crate::transaction::is_block_sorted;

/// Why a block failed the consensus rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusViolation {
    #[error("block timestamp is {ahead_ms} ms ahead of local time")]
    FromTheFuture { ahead_ms: i64 },

    #[error("transactions are not in canonical block order")]
    TransactionsUnsorted,

    #[error("parent {0} not found in history")]
    OrphanBlock(String),

    #[error("height of parent {0} is unknown")]
    UnknownParentHeight(String),

    #[error("base target mismatch: expected {expected}, block carries {got}")]
    BaseTargetMismatch { expected: u64, got: u64 },

    #[error("generation signature does not chain from the parent")]
    GenerationSignatureMismatch,

    #[error("generator balance {balance} below forging minimum")]
    BelowMinimumBalance { balance: u64 },

    #[error("generator hit does not beat the target at the block timestamp")]
    HitAboveTarget,
}

/// Checks inbound blocks. A failed predicate is logged and the block is
/// reported invalid; validation never mutates anything.
pub struct BlockValidator {
    history: Arc<dyn History>,
    state: Arc<dyn State>,
    time: Arc<dyn TimeSource>,
    settings: ChainSettings,
}

impl BlockValidator {
    pub fn new(
        history: Arc<dyn History>,
        state: Arc<dyn State>,
        time: Arc<dyn TimeSource>,
        settings: ChainSettings,
    ) -> Self {
        Self {
            history,
            state,
            time,
            settings,
        }
    }

    /// Whether `block` satisfies every consensus rule against the current
    /// chain snapshot.
    pub fn is_valid(&self, block: &Block) -> bool {
        match self.check(block) {
            Ok(()) => true,
            Err(violation) => {
                error!(
                    block = hex::encode(&block.id[0..8]),
                    %violation,
                    "rejecting block"
                );
                false
            }
        }
    }

    fn check(&self, block: &Block) -> Result<(), ConsensusViolation> {
        let now = self.time.corrected_time();
        let ahead_ms = block.timestamp - now;
        if ahead_ms >= MAX_TIME_DRIFT_MS {
            return Err(ConsensusViolation::FromTheFuture { ahead_ms });
        }

        if block.timestamp > self.settings.require_sorted_transactions_after
            && !is_block_sorted(&block.transactions)
        {
            return Err(ConsensusViolation::TransactionsUnsorted);
        }

        let parent = match self.history.block_by_id(&block.parent_id) {
            Some(parent) => parent,
            None if self.history.height() == 1 => {
                // chain bootstrap: nothing to check the consensus data against
                return Ok(());
            }
            None => {
                return Err(ConsensusViolation::OrphanBlock(hex::encode(
                    &block.parent_id[0..8],
                )))
            }
        };
        let parent_height = self.history.height_of(&parent.id).ok_or_else(|| {
            ConsensusViolation::UnknownParentHeight(hex::encode(&parent.id[0..8]))
        })?;

        let expected_base_target = kernel::base_target(
            self.history.as_ref(),
            self.settings.average_block_delay_seconds,
            &parent,
            parent_height,
            block.timestamp,
        );
        if block.consensus.base_target != expected_base_target {
            return Err(ConsensusViolation::BaseTargetMismatch {
                expected: expected_base_target,
                got: block.consensus.base_target,
            });
        }

        let expected_signature = kernel::generator_signature(&parent.consensus, &block.generator);
        if block.consensus.generation_signature != expected_signature {
            return Err(ConsensusViolation::GenerationSignatureMismatch);
        }

        let effective_balance = kernel::generating_balance(
            self.state.as_ref(),
            &self.settings,
            &block.generator,
            parent_height,
        );
        if block.timestamp >= self.settings.minimal_generating_balance_after_timestamp
            && effective_balance < MIN_GENERATING_BALANCE
        {
            return Err(ConsensusViolation::BelowMinimumBalance {
                balance: effective_balance,
            });
        }

        let hit = kernel::hit(&parent.consensus, &block.generator);
        let target = kernel::target(&parent, block.timestamp, effective_balance);
        if hit >= target {
            return Err(ConsensusViolation::HitAboveTarget);
        }

        Ok(())
    }
}
