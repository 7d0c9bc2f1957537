// Copyright (c) 2025 Ignis Foundation

//! Block production.

use std::sync::Arc;
use tracing::{debug, info};

use crate::account::PrivateKey;
use crate::block::{Block, ConsensusData};
use crate::chain::{BlockBuilder, History, State, TransactionValidator};
use crate::config::{ChainSettings, BLOCK_VERSION, MIN_GENERATING_BALANCE};
use crate::consensus::kernel;
use crate::mempool::SharedPool;

/// Decides whether the local account may forge at a given instant, and if
/// so assembles the consensus data and hands off to the block builder.
pub struct Forger {
    history: Arc<dyn History>,
    state: Arc<dyn State>,
    pool: SharedPool,
    builder: Arc<dyn BlockBuilder>,
    tx_validator: Arc<dyn TransactionValidator>,
    settings: ChainSettings,
}

impl Forger {
    pub fn new(
        history: Arc<dyn History>,
        state: Arc<dyn State>,
        pool: SharedPool,
        builder: Arc<dyn BlockBuilder>,
        tx_validator: Arc<dyn TransactionValidator>,
        settings: ChainSettings,
    ) -> Self {
        Self {
            history,
            state,
            pool,
            builder,
            tx_validator,
            settings,
        }
    }

    /// Attempt to forge the next block at `now_ms`.
    ///
    /// Returns `None` when the account is simply not entitled to mint right
    /// now (insufficient balance, hit not below target) or when the chain
    /// tip vanished between reads. Anything else propagates.
    pub fn try_generate_next_block(&self, account: &PrivateKey, now_ms: i64) -> Option<Block> {
        let last = match self.history.last_block() {
            Some(block) => block,
            None => {
                debug!("no chain tip, skipping forge attempt");
                return None;
            }
        };
        let height = match self.history.height_of(&last.id) {
            Some(height) => height,
            None => {
                debug!(
                    tip = hex::encode(&last.id[0..8]),
                    "chain tip vanished mid-attempt, skipping"
                );
                return None;
            }
        };

        let balance =
            kernel::generating_balance(self.state.as_ref(), &self.settings, account.public_key(), height);
        if balance < MIN_GENERATING_BALANCE {
            debug!(
                balance = balance,
                required = MIN_GENERATING_BALANCE,
                "effective balance below forging minimum"
            );
            return None;
        }

        let hit = kernel::hit(&last.consensus, account.public_key());
        let target = kernel::target(&last, now_ms, balance);
        if hit >= target {
            return None;
        }

        let base_target = kernel::base_target(
            self.history.as_ref(),
            self.settings.average_block_delay_seconds,
            &last,
            height,
            now_ms,
        );
        let generation_signature = kernel::generator_signature(&last.consensus, account.public_key());
        let transactions = self.pool.write().pack(
            self.tx_validator.as_ref(),
            &self.settings,
            self.state.as_ref(),
            now_ms,
            Some(height),
        );

        info!(
            height = height + 1,
            parent = hex::encode(&last.id[0..8]),
            transactions = transactions.len(),
            base_target = base_target,
            "forging block"
        );

        Some(self.builder.build_and_sign(
            BLOCK_VERSION,
            now_ms,
            last.id,
            ConsensusData {
                base_target,
                generation_signature,
            },
            transactions,
            account,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::INITIAL_BASE_TARGET;
    use crate::mempool::new_shared_pool;
    use crate::testutil::{
        forging_key, genesis_block, tx_at, AcceptAllValidator, MemoryHistory, MemoryState,
        TestBlockBuilder,
    };
    use crate::transaction::is_block_sorted;

    fn forger_over(history: MemoryHistory, state: MemoryState) -> Forger {
        Forger::new(
            Arc::new(history),
            Arc::new(state),
            new_shared_pool(),
            Arc::new(TestBlockBuilder),
            Arc::new(AcceptAllValidator),
            ChainSettings::default(),
        )
    }

    #[test]
    fn zero_balance_account_never_forges() {
        let history = MemoryHistory::with_genesis(genesis_block(0));
        let forger = forger_over(history, MemoryState::empty());

        assert!(forger.try_generate_next_block(&forging_key(1), 60_000).is_none());
    }

    #[test]
    fn forges_block_with_chained_consensus_data() {
        let genesis = genesis_block(0);
        let key = forging_key(1);
        let history = MemoryHistory::with_genesis(genesis.clone());
        let state = MemoryState::with_balance(*key.public_key(), 10 * MIN_GENERATING_BALANCE);
        let forger = forger_over(history, state);

        let block = forger
            .try_generate_next_block(&key, 60_000)
            .expect("a well funded account forges after a full interval");

        assert_eq!(block.parent_id, genesis.id);
        assert_eq!(block.version, BLOCK_VERSION);
        assert_eq!(block.timestamp, 60_000);
        // parent height 1 is odd, base target passes through
        assert_eq!(block.consensus.base_target, INITIAL_BASE_TARGET);
        assert_eq!(
            block.consensus.generation_signature,
            kernel::generator_signature(&genesis.consensus, key.public_key())
        );
    }

    #[test]
    fn no_block_before_a_second_has_elapsed() {
        let genesis = genesis_block(60_000);
        let key = forging_key(1);
        let history = MemoryHistory::with_genesis(genesis);
        let state = MemoryState::with_balance(*key.public_key(), 10 * MIN_GENERATING_BALANCE);
        let forger = forger_over(history, state);

        // eta is zero, so the target is zero and no hit beats it
        assert!(forger.try_generate_next_block(&key, 60_000).is_none());
    }

    #[test]
    fn empty_history_is_recovered_silently() {
        let forger = forger_over(MemoryHistory::empty(), MemoryState::empty());
        assert!(forger.try_generate_next_block(&forging_key(1), 60_000).is_none());
    }

    #[test]
    fn forged_block_carries_packed_transactions() {
        let genesis = genesis_block(0);
        let key = forging_key(1);
        let history = MemoryHistory::with_genesis(genesis);
        let state = MemoryState::with_balance(*key.public_key(), 10 * MIN_GENERATING_BALANCE);
        let forger = forger_over(history, state);

        {
            let mut pool = forger.pool.write();
            pool.add(tx_at(7, 59_000));
            pool.add(tx_at(3, 59_500));
        }

        let block = forger.try_generate_next_block(&key, 60_000).unwrap();
        assert_eq!(block.transactions.len(), 2);
        assert!(is_block_sorted(&block.transactions));
    }
}
