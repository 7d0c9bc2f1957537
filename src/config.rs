// Copyright (c) 2025 Ignis Foundation

//! Chain-wide consensus parameters.
//!
//! Everything here is consensus-critical: two nodes with different values
//! fork permanently. Tunables live in [`ChainSettings`]; hard protocol
//! constants are free items in this module.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Minimum effective balance an account needs to forge, once the
/// activation timestamp has passed.
pub const MIN_GENERATING_BALANCE: u64 = 1_000_000_000_000;

/// Hard cap on transactions packed into one block.
pub const MAX_TX_PER_BLOCK: usize = 100;

/// Tolerated clock drift of an inbound block ahead of local time.
pub const MAX_TIME_DRIFT_MS: i64 = 15_000;

/// Unconfirmed transactions older than this are evicted.
pub const MAX_TX_AGE_IN_POOL_PAST_MS: i64 = 90 * 60 * 1000;

/// Unconfirmed transactions this far in the future are evicted.
pub const MAX_TX_AGE_IN_POOL_FUTURE_MS: i64 = 15_000;

/// How many recent blocks feed the block-time average during retargeting.
pub const AVG_BLOCK_TIME_DEPTH: u32 = 3;

/// Version stamped onto forged blocks.
pub const BLOCK_VERSION: u32 = 2;

/// Base target of the genesis block.
pub const INITIAL_BASE_TARGET: u64 = 153_722_867;

/// Network-wide consensus settings. Immutable after node start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
    /// Targeted average block interval, seconds. Must lie in `[1, 600]`.
    #[serde(default = "default_average_block_delay")]
    pub average_block_delay_seconds: u64,

    /// Height at which the generating-balance confirmation depth switches
    /// from 50 to 1000.
    #[serde(default = "default_depth_bump_height")]
    pub generating_balance_depth_bump_height: u32,

    /// Timestamp after which forgers below [`MIN_GENERATING_BALANCE`] are
    /// rejected.
    #[serde(default = "default_minimal_balance_activation")]
    pub minimal_generating_balance_after_timestamp: i64,

    /// Timestamp after which block-embedded transactions must be in the
    /// canonical in-block order.
    #[serde(default = "default_sorted_activation")]
    pub require_sorted_transactions_after: i64,
}

fn default_average_block_delay() -> u64 {
    60
}

fn default_depth_bump_height() -> u32 {
    232_000
}

fn default_minimal_balance_activation() -> i64 {
    1_479_168_000_000
}

fn default_sorted_activation() -> i64 {
    1_477_958_400_000
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            average_block_delay_seconds: default_average_block_delay(),
            generating_balance_depth_bump_height: default_depth_bump_height(),
            minimal_generating_balance_after_timestamp: default_minimal_balance_activation(),
            require_sorted_transactions_after: default_sorted_activation(),
        }
    }
}

impl ChainSettings {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=600).contains(&self.average_block_delay_seconds),
            "average_block_delay_seconds must lie in [1, 600], got {}",
            self.average_block_delay_seconds
        );
        Ok(())
    }

    /// Upper bound for any base target on this chain.
    pub fn max_base_target(&self) -> u64 {
        i64::MAX as u64 / self.average_block_delay_seconds
    }
}
