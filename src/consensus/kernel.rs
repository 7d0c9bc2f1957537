// Copyright (c) 2025 Ignis Foundation

//! Pure consensus arithmetic.
//!
//! Every function here is a deterministic function of its arguments. Any
//! intermediate value that can exceed 64 bits is carried as a `BigInt`;
//! conversion back to machine words happens only after a range check or a
//! clamp. The single floating-point computation in the protocol is the
//! retarget limit derivation in [`base_target`].

use num_bigint::BigInt;

use crate::account::PublicKey;
use crate::block::{Block, ConsensusData};
use crate::chain::{History, State};
use crate::config::{ChainSettings, AVG_BLOCK_TIME_DEPTH};
use crate::crypto;

/// The chained generation signature of a child of `parent` forged by
/// `generator`: `digest(parent.generation_signature || generator)`.
pub fn generator_signature(parent: &ConsensusData, generator: &PublicKey) -> [u8; 32] {
    crypto::hash_chunks(&[&parent.generation_signature, generator.as_bytes()])
}

/// The generator-specific lottery number, in `[0, 2^64)`.
///
/// The first 8 bytes of the generation signature, read little-endian.
pub fn hit(parent: &ConsensusData, generator: &PublicKey) -> BigInt {
    let signature = generator_signature(parent, generator);
    let mut word = [0u8; 8];
    word.copy_from_slice(&signature[0..8]);
    BigInt::from(u64::from_le_bytes(word))
}

/// The threshold the hit must stay below for the forger to mint at `now_ms`.
///
/// Grows with elapsed time and effective balance. Deliberately unclamped:
/// when `now_ms` precedes the parent timestamp the target is non-positive
/// and no hit can beat it.
pub fn target(prev: &Block, now_ms: i64, effective_balance: u64) -> BigInt {
    let eta = (now_ms - prev.timestamp) / 1000;
    BigInt::from(prev.consensus.base_target) * eta * effective_balance
}

/// The base target the child of `prev` must carry when forged at `now_ms`.
///
/// Retargets only when the parent height is even; odd parent heights pass
/// the value through unchanged. The retarget nudges the base target so the
/// observed block interval regresses toward `avg_delay_s`, with the
/// correction limits scaled from their reference values at a 60 second
/// interval.
///
/// `prev_height` is supplied by the caller, which has already resolved it
/// against its own snapshot of the chain.
pub fn base_target(
    history: &dyn History,
    avg_delay_s: u64,
    prev: &Block,
    prev_height: u32,
    now_ms: i64,
) -> u64 {
    let prev_base_target = prev.consensus.base_target;
    if prev_height % 2 != 0 {
        return prev_base_target;
    }

    let min_limit = normalize(53, avg_delay_s);
    let max_limit = normalize(67, avg_delay_s);
    let gamma = normalize(64, avg_delay_s);

    let blocktime_avg_s = match history.parent(prev, AVG_BLOCK_TIME_DEPTH - 1) {
        Some(ancestor) => ((now_ms - ancestor.timestamp) / AVG_BLOCK_TIME_DEPTH as i64) / 1000,
        None => (now_ms - prev.timestamp) / 1000,
    };

    let retargeted = if blocktime_avg_s > avg_delay_s as i64 {
        prev_base_target as f64 * (blocktime_avg_s as f64).min(max_limit) / avg_delay_s as f64
    } else {
        prev_base_target as f64
            - prev_base_target as f64 * gamma
                * (avg_delay_s as f64 - (blocktime_avg_s as f64).max(min_limit))
                / (avg_delay_s as f64 * 100.0)
    };

    let max_base_target = i64::MAX as u64 / avg_delay_s;
    (retargeted as u64).min(max_base_target)
}

/// Scale a reference constant from the 60 second interval to this chain's.
fn normalize(value: u64, avg_delay_s: u64) -> f64 {
    value as f64 * avg_delay_s as f64 / 60.0
}

/// The balance that counts toward forging eligibility at `at_height`.
///
/// The confirmation depth deepens from 50 to 1000 blocks at the configured
/// bump height.
pub fn generating_balance(
    state: &dyn State,
    settings: &ChainSettings,
    account: &PublicKey,
    at_height: u32,
) -> u64 {
    let depth = if at_height >= settings.generating_balance_depth_bump_height {
        1000
    } else {
        50
    };
    state.effective_balance_with_confirmations(account, at_height, depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::INITIAL_BASE_TARGET;
    use crate::testutil::{block_with, genesis_block, ChainFixture, DepthEchoState};
    use num_bigint::Sign;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn generator_signature_matches_digest_chain() {
        let genesis = genesis_block(0);
        let generator = PublicKey([5u8; 32]);

        let signature = generator_signature(&genesis.consensus, &generator);
        let expected = crypto::hash_chunks(&[
            &genesis.consensus.generation_signature,
            generator.as_bytes(),
        ]);

        assert_eq!(signature, expected);
        assert_eq!(signature, generator_signature(&genesis.consensus, &generator));
    }

    #[test]
    fn hit_reads_first_eight_bytes_little_endian() {
        let genesis = genesis_block(0);
        let generator = PublicKey([5u8; 32]);

        let signature = generator_signature(&genesis.consensus, &generator);
        let mut word = [0u8; 8];
        word.copy_from_slice(&signature[0..8]);

        assert_eq!(
            hit(&genesis.consensus, &generator),
            BigInt::from(u64::from_le_bytes(word))
        );
    }

    #[test]
    fn hit_stays_in_word_range_and_varies_by_generator() {
        let genesis = genesis_block(0);
        let ceiling = BigInt::from(1u8) << 64u32;
        let mut rng = StdRng::seed_from_u64(17);

        let mut hits = Vec::new();
        for _ in 0..16 {
            let generator = PublicKey(rng.gen());
            let value = hit(&genesis.consensus, &generator);
            assert!(value >= BigInt::from(0));
            assert!(value < ceiling);
            hits.push(value);
        }
        hits.dedup();
        assert!(hits.len() > 1);
    }

    #[test]
    fn hit_depends_only_on_signature_and_generator() {
        let generator = PublicKey([5u8; 32]);
        let early = genesis_block(0);
        let mut late = genesis_block(777_000);
        late.consensus.base_target = 42;
        late.consensus.generation_signature = early.consensus.generation_signature;

        assert_eq!(hit(&early.consensus, &generator), hit(&late.consensus, &generator));
    }

    #[test]
    fn target_is_base_target_times_eta_times_balance() {
        let genesis = genesis_block(0);
        let balance = 7_000_000_000u64;

        let expected = BigInt::from(INITIAL_BASE_TARGET) * 60i64 * balance;
        assert_eq!(target(&genesis, 60_000, balance), expected);
    }

    #[test]
    fn target_is_non_positive_when_clock_lags_parent() {
        let genesis = genesis_block(100_000);

        assert_eq!(target(&genesis, 100_500, 1), BigInt::from(0));
        assert_eq!(target(&genesis, 50_000, 10).sign(), Sign::Minus);
    }

    #[test]
    fn base_target_passes_through_on_odd_parent_height() {
        let fixture = ChainFixture::of_length(3, 60_000);
        let prev = fixture.history.last_block().unwrap();

        let result = base_target(&fixture.history, 60, &prev, 3, 10_000_000);
        assert_eq!(result, prev.consensus.base_target);
    }

    #[test]
    fn base_target_rises_after_slow_blocks() {
        let fixture = ChainFixture::of_length(4, 60_000);
        let prev = fixture.history.last_block().unwrap();

        // average interval roughly twice the configured delay
        let now = prev.timestamp + 180_000;
        let result = base_target(&fixture.history, 60, &prev, 4, now);
        assert!(result > prev.consensus.base_target);
    }

    #[test]
    fn base_target_falls_after_fast_blocks() {
        let fixture = ChainFixture::of_length(4, 5_000);
        let prev = fixture.history.last_block().unwrap();

        let now = prev.timestamp + 5_000;
        let result = base_target(&fixture.history, 60, &prev, 4, now);
        assert!(result < prev.consensus.base_target);
        assert!(result > 0);
    }

    #[test]
    fn base_target_stays_positive_from_small_values() {
        let mut fixture = ChainFixture::of_length(4, 2_000);
        fixture.set_tip_base_target(8);
        let prev = fixture.history.last_block().unwrap();

        let result = base_target(&fixture.history, 60, &prev, 4, prev.timestamp + 1_000);
        assert!(result > 0);
    }

    #[test]
    fn base_target_is_clamped_to_chain_maximum() {
        let settings = ChainSettings::default();
        let mut fixture = ChainFixture::of_length(4, 60_000);
        fixture.set_tip_base_target(settings.max_base_target());
        let prev = fixture.history.last_block().unwrap();

        // slow blocks would push the value past the cap
        let now = prev.timestamp + 400_000;
        let result = base_target(&fixture.history, 60, &prev, 4, now);
        assert_eq!(result, settings.max_base_target());
    }

    #[test]
    fn base_target_without_deep_ancestry_uses_parent_interval() {
        // a two-block chain has no ancestor at depth 2
        let fixture = ChainFixture::of_length(2, 60_000);
        let prev = fixture.history.last_block().unwrap();
        let lone = block_with(prev.id, prev.timestamp, prev.consensus.base_target);

        let from_chain = base_target(&fixture.history, 60, &prev, 2, prev.timestamp + 120_000);
        let from_lone = base_target(&fixture.history, 60, &lone, 2, prev.timestamp + 120_000);
        assert_eq!(from_chain, from_lone);
    }

    #[test]
    fn generating_balance_depth_switches_at_bump_height() {
        let settings = ChainSettings::default();
        let state = DepthEchoState;
        let account = PublicKey([9u8; 32]);

        let below = settings.generating_balance_depth_bump_height - 1;
        let at = settings.generating_balance_depth_bump_height;

        assert_eq!(generating_balance(&state, &settings, &account, below), 50);
        assert_eq!(generating_balance(&state, &settings, &account, at), 1000);
    }
}
