// Copyright (c) 2025 Ignis Foundation

//! Fork-choice tie-break between sibling blocks.

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::account::PublicKey;
use crate::block::Block;
use crate::chain::{History, State};
use crate::config::ChainSettings;
use crate::consensus::kernel;

/// When `account` would first be entitled to forge on top of `prev`.
///
/// `None` when the account holds no generating balance, when `prev`'s
/// height is unknown, or when the projection leaves the signed 64-bit
/// clock domain.
pub fn next_block_generation_time(
    history: &dyn History,
    state: &dyn State,
    settings: &ChainSettings,
    prev: &Block,
    account: &PublicKey,
) -> Option<i64> {
    let height = history.height_of(&prev.id)?;
    let balance = kernel::generating_balance(state, settings, account, height);
    if balance == 0 {
        return None;
    }

    let hit = kernel::hit(&prev.consensus, account);
    let projected =
        hit * 1000i64 / (BigInt::from(prev.consensus.base_target) * balance) + prev.timestamp;
    if projected > BigInt::from(0) && projected < BigInt::from(i64::MAX) {
        projected.to_i64()
    } else {
        None
    }
}

/// Total order over competing children of one parent.
///
/// Blocks compare by score first; between equal scores the block whose
/// generator was projected to forge earlier is the greater one. Callers
/// keep the greater block.
pub struct SiblingOrdering {
    history: Arc<dyn History>,
    state: Arc<dyn State>,
    settings: ChainSettings,
}

impl SiblingOrdering {
    pub fn new(history: Arc<dyn History>, state: Arc<dyn State>, settings: ChainSettings) -> Self {
        Self {
            history,
            state,
            settings,
        }
    }

    pub fn compare(&self, a: &Block, b: &Block) -> Ordering {
        a.score
            .cmp(&b.score)
            .then_with(|| self.projected_time(b).cmp(&self.projected_time(a)))
    }

    fn projected_time(&self, block: &Block) -> i64 {
        self.history
            .block_by_id(&block.parent_id)
            .and_then(|parent| {
                next_block_generation_time(
                    self.history.as_ref(),
                    self.state.as_ref(),
                    &self.settings,
                    &parent,
                    &block.generator,
                )
            })
            .unwrap_or(block.timestamp)
    }
}
