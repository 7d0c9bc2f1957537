// Copyright (c) 2025 Ignis Foundation

//! In-memory collaborators and fixtures shared by the module tests.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::account::{PrivateKey, PublicKey};
use crate::block::{Block, BlockId, ConsensusData};
use crate::chain::{
    BlockBuilder, History, State, TimeSource, TransactionValidator, ValidatedTransactions,
};
use crate::config::{ChainSettings, BLOCK_VERSION, INITIAL_BASE_TARGET};
use crate::consensus::{kernel, Forger};
use crate::mempool::new_shared_pool;
use crate::transaction::{Transaction, TxId, TxKind};

pub fn forging_key(seed: u8) -> PrivateKey {
    PrivateKey::from_bytes([seed.wrapping_add(128); 32], PublicKey([seed; 32]))
}

pub fn tx_at(seed: u8, timestamp: i64) -> Transaction {
    Transaction {
        id: [seed; 32],
        kind: TxKind::Payment,
        sender: PublicKey([seed; 32]),
        timestamp,
        fee: 100_000,
        payload: vec![seed; 16],
    }
}

pub fn genesis_block(timestamp: i64) -> Block {
    Block {
        id: content_id(&[0u8; 32], &PublicKey([0u8; 32]), timestamp, 0),
        parent_id: [0u8; 32],
        version: 1,
        timestamp,
        generator: PublicKey([0u8; 32]),
        consensus: ConsensusData {
            base_target: INITIAL_BASE_TARGET,
            generation_signature: [0u8; 32],
        },
        transactions: vec![],
        score: 0,
        signature: vec![],
    }
}

/// A bare block for kernel-level tests; generator and signature are zeroed.
pub fn block_with(parent_id: BlockId, timestamp: i64, base_target: u64) -> Block {
    Block {
        id: content_id(&parent_id, &PublicKey([0u8; 32]), timestamp, 1),
        parent_id,
        version: BLOCK_VERSION,
        timestamp,
        generator: PublicKey([0u8; 32]),
        consensus: ConsensusData {
            base_target,
            generation_signature: [0u8; 32],
        },
        transactions: vec![],
        score: 0,
        signature: vec![],
    }
}

/// A child with properly chained consensus data but no transactions.
pub fn child_of(parent: &Block, generator: PublicKey, timestamp: i64) -> Block {
    Block {
        id: content_id(&parent.id, &generator, timestamp, 2),
        parent_id: parent.id,
        version: BLOCK_VERSION,
        timestamp,
        generator,
        consensus: ConsensusData {
            base_target: parent.consensus.base_target,
            generation_signature: kernel::generator_signature(&parent.consensus, &generator),
        },
        transactions: vec![],
        score: 0,
        signature: vec![],
    }
}

fn content_id(parent_id: &BlockId, generator: &PublicKey, timestamp: i64, salt: u8) -> BlockId {
    let mut hasher = Sha256::new();
    hasher.update(parent_id);
    hasher.update(generator.as_bytes());
    hasher.update(timestamp.to_le_bytes());
    hasher.update([salt]);
    hasher.finalize().into()
}

/// Chain snapshot backed by a plain vector, genesis first.
#[derive(Clone, Default)]
pub struct MemoryHistory {
    blocks: Vec<Block>,
}

impl MemoryHistory {
    pub fn empty() -> Self {
        Self { blocks: vec![] }
    }

    pub fn with_genesis(genesis: Block) -> Self {
        Self {
            blocks: vec![genesis],
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn set_tip_base_target(&mut self, base_target: u64) {
        self.blocks
            .last_mut()
            .expect("fixture chain is never empty")
            .consensus
            .base_target = base_target;
    }

    fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| &block.id == id)
    }
}

impl History for MemoryHistory {
    fn last_block(&self) -> Option<Block> {
        self.blocks.last().cloned()
    }

    fn block_by_id(&self, id: &BlockId) -> Option<Block> {
        self.index_of(id).map(|index| self.blocks[index].clone())
    }

    fn parent(&self, block: &Block, depth: u32) -> Option<Block> {
        let index = self.index_of(&block.id)?;
        index
            .checked_sub(depth as usize)
            .map(|ancestor| self.blocks[ancestor].clone())
    }

    fn height_of(&self, id: &BlockId) -> Option<u32> {
        self.index_of(id).map(|index| index as u32 + 1)
    }

    fn height(&self) -> u32 {
        self.blocks.len() as u32
    }
}

/// Balance table ignoring height and confirmation depth.
#[derive(Clone, Default)]
pub struct MemoryState {
    balances: HashMap<PublicKey, u64>,
}

impl MemoryState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_balance(account: PublicKey, balance: u64) -> Self {
        Self::with_balances(&[(account, balance)])
    }

    pub fn with_balances(entries: &[(PublicKey, u64)]) -> Self {
        Self {
            balances: entries.iter().copied().collect(),
        }
    }
}

impl State for MemoryState {
    fn effective_balance_with_confirmations(
        &self,
        account: &PublicKey,
        _at_height: u32,
        _confirmations: u32,
    ) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }
}

/// Reports the requested confirmation depth back as the balance, so tests
/// can observe which depth a query used.
pub struct DepthEchoState;

impl State for DepthEchoState {
    fn effective_balance_with_confirmations(
        &self,
        _account: &PublicKey,
        _at_height: u32,
        confirmations: u32,
    ) -> u64 {
        confirmations as u64
    }
}

pub struct FixedTimeSource(pub i64);

impl TimeSource for FixedTimeSource {
    fn corrected_time(&self) -> i64 {
        self.0
    }
}

pub struct AcceptAllValidator;

impl TransactionValidator for AcceptAllValidator {
    fn validate(
        &self,
        _settings: &ChainSettings,
        _state: &dyn State,
        txs: &[Transaction],
        _at_height: Option<u32>,
        _now_ms: i64,
    ) -> ValidatedTransactions {
        ValidatedTransactions {
            rejected: vec![],
            accepted: txs.to_vec(),
        }
    }
}

pub struct RejectByIdValidator {
    reject: HashSet<TxId>,
}

impl RejectByIdValidator {
    pub fn rejecting(ids: &[TxId]) -> Self {
        Self {
            reject: ids.iter().copied().collect(),
        }
    }
}

impl TransactionValidator for RejectByIdValidator {
    fn validate(
        &self,
        _settings: &ChainSettings,
        _state: &dyn State,
        txs: &[Transaction],
        _at_height: Option<u32>,
        _now_ms: i64,
    ) -> ValidatedTransactions {
        let (rejected, accepted) = txs
            .iter()
            .cloned()
            .partition(|tx| self.reject.contains(&tx.id));
        ValidatedTransactions { rejected, accepted }
    }
}

/// Hash-only stand-in for the real block codec and signer.
pub struct TestBlockBuilder;

impl BlockBuilder for TestBlockBuilder {
    fn build_and_sign(
        &self,
        version: u32,
        timestamp: i64,
        parent_id: BlockId,
        consensus: ConsensusData,
        transactions: Vec<Transaction>,
        signer: &PrivateKey,
    ) -> Block {
        let mut hasher = Sha256::new();
        hasher.update(version.to_le_bytes());
        hasher.update(timestamp.to_le_bytes());
        hasher.update(parent_id);
        hasher.update(consensus.base_target.to_le_bytes());
        hasher.update(consensus.generation_signature);
        hasher.update(signer.public_key().as_bytes());
        for tx in &transactions {
            hasher.update(tx.id);
        }

        Block {
            id: hasher.finalize().into(),
            parent_id,
            version,
            timestamp,
            generator: *signer.public_key(),
            consensus,
            transactions,
            score: 0,
            signature: vec![0u8; 64],
        }
    }
}

/// A linear chain plus the plumbing to forge one more block on top of it.
pub struct ChainFixture {
    pub history: MemoryHistory,
}

impl ChainFixture {
    pub fn with_genesis(genesis: Block) -> Self {
        Self {
            history: MemoryHistory::with_genesis(genesis),
        }
    }

    /// A chain of `length` blocks spaced `interval_ms` apart, genesis at
    /// the epoch.
    pub fn of_length(length: u32, interval_ms: i64) -> Self {
        let mut history = MemoryHistory::with_genesis(genesis_block(0));
        for step in 1..length {
            let parent = history.last_block().expect("chain is never empty");
            history.push(child_of(
                &parent,
                PublicKey([step as u8; 32]),
                step as i64 * interval_ms,
            ));
        }
        Self { history }
    }

    pub fn set_tip_base_target(&mut self, base_target: u64) {
        self.history.set_tip_base_target(base_target);
    }

    /// Forge a child of the current tip with real consensus data.
    pub fn forge(&self, key: &PrivateKey, state: &MemoryState, now_ms: i64) -> Block {
        let forger = Forger::new(
            Arc::new(self.history.clone()),
            Arc::new(state.clone()),
            new_shared_pool(),
            Arc::new(TestBlockBuilder),
            Arc::new(AcceptAllValidator),
            ChainSettings::default(),
        );
        forger
            .try_generate_next_block(key, now_ms)
            .expect("fixture account is funded and past the parent timestamp")
    }
}
