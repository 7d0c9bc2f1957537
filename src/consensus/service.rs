// Copyright (c) 2025 Ignis Foundation

//! Public consensus surface.
//!
//! `ConsensusService` wires the forger, validator and sibling ordering to
//! the injected collaborators and owns the shared unconfirmed pool. It is
//! the only type the rest of the node talks to.

use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::account::{PrivateKey, PublicKey};
use crate::block::Block;
use crate::chain::{BlockBuilder, History, State, TimeSource, TransactionValidator};
use crate::config::ChainSettings;
use crate::consensus::{
    next_block_generation_time, BlockValidator, Forger, SiblingOrdering,
};
use crate::mempool::{new_shared_pool, SharedPool};
use crate::transaction::Transaction;

/// Why an offchain transaction was not admitted to the pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxAdmissionError {
    #[error("transaction {0} is already pending")]
    AlreadyPending(String),

    #[error("transaction {0} rejected by the transaction validator")]
    Rejected(String),
}

pub struct ConsensusService {
    history: Arc<dyn History>,
    state: Arc<dyn State>,
    time: Arc<dyn TimeSource>,
    tx_validator: Arc<dyn TransactionValidator>,
    pool: SharedPool,
    forger: Forger,
    validator: BlockValidator,
    settings: ChainSettings,
}

impl ConsensusService {
    pub fn new(
        history: Arc<dyn History>,
        state: Arc<dyn State>,
        time: Arc<dyn TimeSource>,
        tx_validator: Arc<dyn TransactionValidator>,
        builder: Arc<dyn BlockBuilder>,
        settings: ChainSettings,
    ) -> Result<Self> {
        settings.validate()?;

        let pool = new_shared_pool();
        let forger = Forger::new(
            history.clone(),
            state.clone(),
            pool.clone(),
            builder,
            tx_validator.clone(),
            settings.clone(),
        );
        let validator = BlockValidator::new(
            history.clone(),
            state.clone(),
            time.clone(),
            settings.clone(),
        );

        Ok(Self {
            history,
            state,
            time,
            tx_validator,
            pool,
            forger,
            validator,
            settings,
        })
    }

    /// Admit a transaction received off-chain, if the external validator
    /// accepts it against the current tip. The admitted transaction is
    /// returned so the caller can rebroadcast it.
    pub fn on_new_offchain_transaction(
        &self,
        tx: Transaction,
    ) -> Result<Transaction, TxAdmissionError> {
        let short_id = hex::encode(&tx.id[0..8]);
        if self.pool.read().contains(&tx.id) {
            return Err(TxAdmissionError::AlreadyPending(short_id));
        }

        let now = self.time.corrected_time();
        let at_height = self
            .history
            .last_block()
            .and_then(|block| self.history.height_of(&block.id));
        let verdict = self.tx_validator.validate(
            &self.settings,
            self.state.as_ref(),
            std::slice::from_ref(&tx),
            at_height,
            now,
        );
        if verdict.accepted.is_empty() {
            debug!(id = %short_id, "offchain transaction rejected");
            return Err(TxAdmissionError::Rejected(short_id));
        }

        if !self.pool.write().add(tx.clone()) {
            return Err(TxAdmissionError::AlreadyPending(short_id));
        }
        Ok(tx)
    }

    /// See [`Forger::try_generate_next_block`].
    pub fn try_generate_next_block(&self, account: &PrivateKey, now_ms: i64) -> Option<Block> {
        self.forger.try_generate_next_block(account, now_ms)
    }

    /// See [`BlockValidator::is_valid`].
    pub fn is_valid(&self, block: &Block) -> bool {
        self.validator.is_valid(block)
    }

    /// The fork-choice tie-break over sibling blocks.
    pub fn block_ordering(&self) -> SiblingOrdering {
        SiblingOrdering::new(self.history.clone(), self.state.clone(), self.settings.clone())
    }

    /// When `account` would first be entitled to forge on top of `block`.
    pub fn next_block_generation_time(&self, block: &Block, account: &PublicKey) -> Option<i64> {
        next_block_generation_time(
            self.history.as_ref(),
            self.state.as_ref(),
            &self.settings,
            block,
            account,
        )
    }

    /// Drop transactions that were applied in a block, then prune the rest.
    pub fn clear_from_unconfirmed(&self, applied: &[Transaction]) {
        let ids: Vec<_> = applied.iter().map(|tx| tx.id).collect();
        let now = self.time.corrected_time();
        let at_height = self
            .history
            .last_block()
            .and_then(|block| self.history.height_of(&block.id));
        self.pool.write().remove_applied(
            &ids,
            self.tx_validator.as_ref(),
            &self.settings,
            self.state.as_ref(),
            now,
            at_height,
        );
    }

    /// Handle to the unconfirmed pool, for the pool owner.
    pub fn pool(&self) -> &SharedPool {
        &self.pool
    }
}
