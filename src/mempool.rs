// Copyright (c) 2025 Ignis Foundation

//! Unconfirmed-transaction pool.
//!
//! The pool is the only mutable state in the consensus core. It is shared as
//! [`SharedPool`] and every mutator takes the write lock, so a `pack` call
//! sees one consistent snapshot from pruning through packing.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::chain::{State, TransactionValidator};
use crate::config::{
    ChainSettings, MAX_TX_AGE_IN_POOL_FUTURE_MS, MAX_TX_AGE_IN_POOL_PAST_MS, MAX_TX_PER_BLOCK,
};
use crate::transaction::{self, Transaction, TxId};

/// A pooled transaction with its admission-time fee rate.
#[derive(Debug, Clone)]
struct PendingTx {
    tx: Transaction,
    fee_per_byte: u64,
}

impl PendingTx {
    fn new(tx: Transaction) -> Self {
        let fee_per_byte = tx.fee_per_byte();
        Self { tx, fee_per_byte }
    }
}

/// Buffer of transactions waiting for a block.
pub struct UnconfirmedPool {
    txs: HashMap<TxId, PendingTx>,
}

impl UnconfirmedPool {
    pub fn new() -> Self {
        Self {
            txs: HashMap::new(),
        }
    }

    /// Insert a transaction, returning whether it was new. Validity against
    /// the chain is the caller's responsibility.
    pub fn add(&mut self, tx: Transaction) -> bool {
        if self.txs.contains_key(&tx.id) {
            return false;
        }
        debug!(id = hex::encode(&tx.id[0..8]), "pooled transaction");
        self.txs.insert(tx.id, PendingTx::new(tx));
        true
    }

    pub fn remove(&mut self, id: &TxId) -> Option<Transaction> {
        self.txs.remove(id).map(|pending| pending.tx)
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.txs.contains_key(id)
    }

    pub fn get(&self, id: &TxId) -> Option<&Transaction> {
        self.txs.get(id).map(|pending| &pending.tx)
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Current contents in arbitrary order.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.txs.values().map(|pending| pending.tx.clone()).collect()
    }

    /// Select and order transactions for a candidate block.
    ///
    /// Ages out stale entries, ranks the rest by fee rate, keeps only what
    /// the external validator accepts, caps at [`MAX_TX_PER_BLOCK`] and lays
    /// the result out in the canonical in-block order. Rejected transactions
    /// leave the pool. The final list is validated once more, because
    /// removing one transaction can restore another to validity.
    pub fn pack(
        &mut self,
        validator: &dyn TransactionValidator,
        settings: &ChainSettings,
        state: &dyn State,
        now_ms: i64,
        at_height: Option<u32>,
    ) -> Vec<Transaction> {
        self.drop_aged(now_ms);

        let mut ranked: Vec<&PendingTx> = self.txs.values().collect();
        ranked.sort_by(|a, b| {
            b.fee_per_byte
                .cmp(&a.fee_per_byte)
                .then_with(|| a.tx.id.cmp(&b.tx.id))
        });
        let candidates: Vec<Transaction> = ranked.iter().map(|p| p.tx.clone()).collect();

        let verdict = validator.validate(settings, state, &candidates, at_height, now_ms);
        self.drop_rejected(&verdict.rejected);

        let mut block_txs: Vec<Transaction> = verdict
            .accepted
            .into_iter()
            .take(MAX_TX_PER_BLOCK)
            .collect();
        block_txs.sort_by(transaction::block_ordering);

        let verdict = validator.validate(settings, state, &block_txs, at_height, now_ms);
        self.drop_rejected(&verdict.rejected);
        verdict.accepted
    }

    /// Age out stale entries and drop whatever the validator now refuses.
    pub fn prune(
        &mut self,
        validator: &dyn TransactionValidator,
        settings: &ChainSettings,
        state: &dyn State,
        now_ms: i64,
        at_height: Option<u32>,
    ) {
        self.drop_aged(now_ms);
        let snapshot = self.snapshot();
        let verdict = validator.validate(settings, state, &snapshot, at_height, now_ms);
        self.drop_rejected(&verdict.rejected);
    }

    /// Forget transactions that made it into an applied block, then prune.
    pub fn remove_applied(
        &mut self,
        applied: &[TxId],
        validator: &dyn TransactionValidator,
        settings: &ChainSettings,
        state: &dyn State,
        now_ms: i64,
        at_height: Option<u32>,
    ) {
        for id in applied {
            self.txs.remove(id);
        }
        self.prune(validator, settings, state, now_ms, at_height);
    }

    fn drop_aged(&mut self, now_ms: i64) {
        let expired: Vec<TxId> = self
            .txs
            .values()
            .filter(|pending| {
                let age = now_ms - pending.tx.timestamp;
                age > MAX_TX_AGE_IN_POOL_PAST_MS || -age > MAX_TX_AGE_IN_POOL_FUTURE_MS
            })
            .map(|pending| pending.tx.id)
            .collect();

        for id in expired {
            self.txs.remove(&id);
            debug!(id = hex::encode(&id[0..8]), "evicted aged transaction");
        }
    }

    fn drop_rejected(&mut self, rejected: &[Transaction]) {
        for tx in rejected {
            if self.txs.remove(&tx.id).is_some() {
                debug!(id = hex::encode(&tx.id[0..8]), "evicted invalid transaction");
            }
        }
    }
}

impl Default for UnconfirmedPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe pool handle.
pub type SharedPool = Arc<RwLock<UnconfirmedPool>>;

pub fn new_shared_pool() -> SharedPool {
    Arc::new(RwLock::new(UnconfirmedPool::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{AcceptAllValidator, MemoryState, RejectByIdValidator, tx_at};
    use crate::transaction::is_block_sorted;

    const NOW: i64 = 10_000_000;

    fn settings() -> ChainSettings {
        ChainSettings::default()
    }

    #[test]
    fn add_rejects_duplicates() {
        let mut pool = UnconfirmedPool::new();
        let tx = tx_at(1, NOW);
        assert!(pool.add(tx.clone()));
        assert!(!pool.add(tx));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn pack_drops_expired_from_result_and_pool() {
        let mut pool = UnconfirmedPool::new();
        pool.add(tx_at(1, NOW - 1_000));
        pool.add(tx_at(2, NOW - 2_000));
        pool.add(tx_at(3, NOW - MAX_TX_AGE_IN_POOL_PAST_MS - 1));

        let packed = pool.pack(&AcceptAllValidator, &settings(), &MemoryState::empty(), NOW, None);

        assert_eq!(packed.len(), 2);
        assert_eq!(pool.len(), 2);
        assert!(!pool.contains(&[3u8; 32]));
    }

    #[test]
    fn pack_drops_future_transactions() {
        let mut pool = UnconfirmedPool::new();
        pool.add(tx_at(1, NOW + MAX_TX_AGE_IN_POOL_FUTURE_MS + 1));

        let packed = pool.pack(&AcceptAllValidator, &settings(), &MemoryState::empty(), NOW, None);

        assert!(packed.is_empty());
        assert!(pool.is_empty());
    }

    #[test]
    fn pack_caps_at_block_limit_and_cuts_lowest_fee_rate() {
        let mut pool = UnconfirmedPool::new();
        for i in 0..MAX_TX_PER_BLOCK as u8 {
            pool.add(tx_at(i.wrapping_add(10), NOW));
        }
        let mut cheap = tx_at(200, NOW);
        cheap.fee = 0;
        pool.add(cheap);

        let packed = pool.pack(&AcceptAllValidator, &settings(), &MemoryState::empty(), NOW, None);

        assert_eq!(packed.len(), MAX_TX_PER_BLOCK);
        assert!(packed.iter().all(|tx| tx.id != [200u8; 32]));
        // the zero-fee entry was only cut, not evicted
        assert!(pool.contains(&[200u8; 32]));
    }

    #[test]
    fn pack_output_is_block_sorted() {
        let mut pool = UnconfirmedPool::new();
        for i in [9u8, 3, 7, 1, 5] {
            pool.add(tx_at(i, NOW));
        }

        let packed = pool.pack(&AcceptAllValidator, &settings(), &MemoryState::empty(), NOW, None);

        assert_eq!(packed.len(), 5);
        assert!(is_block_sorted(&packed));
    }

    #[test]
    fn pack_is_idempotent_with_fixed_clock() {
        let mut pool = UnconfirmedPool::new();
        for i in [4u8, 2, 8] {
            pool.add(tx_at(i, NOW));
        }

        let first = pool.pack(&AcceptAllValidator, &settings(), &MemoryState::empty(), NOW, None);
        let second = pool.pack(&AcceptAllValidator, &settings(), &MemoryState::empty(), NOW, None);
        assert_eq!(first, second);
    }

    #[test]
    fn rejected_transactions_leave_the_pool() {
        let mut pool = UnconfirmedPool::new();
        pool.add(tx_at(1, NOW));
        pool.add(tx_at(2, NOW));
        let validator = RejectByIdValidator::rejecting(&[[2u8; 32]]);

        let packed = pool.pack(&validator, &settings(), &MemoryState::empty(), NOW, None);

        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].id, [1u8; 32]);
        assert!(!pool.contains(&[2u8; 32]));
    }

    #[test]
    fn remove_applied_clears_block_contents() {
        let mut pool = UnconfirmedPool::new();
        pool.add(tx_at(1, NOW));
        pool.add(tx_at(2, NOW));

        pool.remove_applied(
            &[[1u8; 32]],
            &AcceptAllValidator,
            &settings(),
            &MemoryState::empty(),
            NOW,
            None,
        );

        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&[2u8; 32]));
    }

    #[test]
    fn prune_ages_out_stale_entries() {
        let mut pool = UnconfirmedPool::new();
        pool.add(tx_at(1, NOW));
        pool.add(tx_at(2, NOW - MAX_TX_AGE_IN_POOL_PAST_MS - 1));

        pool.prune(&AcceptAllValidator, &settings(), &MemoryState::empty(), NOW, None);

        assert_eq!(pool.len(), 1);
    }
}
