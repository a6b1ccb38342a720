//! Deterministic, integer-only lottery RNG.
//!
//! Every random decision in the engine — High-role tie-breaks, shortfall pool
//! picks, role-order shuffles, candidate picks, submission draws, overflow
//! shuffles — flows through one injected [`Lottery`] source. The engine never
//! touches OS entropy: reproducing a run means supplying the same seed and the
//! same input snapshot. Draw counts are data-dependent, so consumers must not
//! assume any particular number of words is consumed.
//!
//! [`SeededLottery`] is the production source: ChaCha20 behind an explicit
//! 32-byte seed derived from a 64-bit seed (little-endian bytes in the first
//! 8 positions, the rest zero — avoids endianness ambiguity across platforms).
//! Unbiased ranges use rejection sampling; no floating point anywhere.

use alloc::vec::Vec;

use smol_str::SmolStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// A single logged lottery decision, including context and the RNG word index.
///
/// `word_index` is **1-based**: the first 64-bit word consumed by a
/// [`SeededLottery`] has index 1. For rejection-sampled ranges it refers to
/// the **accepted** word (rejected draws are counted but not logged).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LotteryCrumb {
    /// Stable, human-readable context (e.g., "merge:crew-7/high-tie").
    pub ctx: SmolStr,
    /// Chosen index in the contender set (0-based).
    pub pick: usize,
    /// 1-based index of the deciding RNG 64-bit word.
    pub word_index: u128,
}

/// Injected randomness interface for the allocation engine.
///
/// Only [`Lottery::gen_range`] is required; the pick/shuffle helpers are
/// derived from it, so a scripted test source overrides a single method.
pub trait Lottery {
    /// Uniform integer in `[0, n)`. Returns `None` if `n == 0`.
    fn gen_range(&mut self, n: u64) -> Option<u64>;

    /// Observation hook for named decisions; the production source records a
    /// [`LotteryCrumb`] here. Default: drop it.
    fn note_pick(&mut self, _ctx: &str, _pick: usize) {}

    /// Uniform index into a collection of `n` elements.
    #[inline]
    fn pick_index(&mut self, n: usize) -> Option<usize> {
        self.gen_range(n as u64).map(|v| v as usize)
    }

    /// `pick_index` plus a crumb under `ctx` for audit trails.
    #[inline]
    fn pick_index_ctx(&mut self, ctx: &str, n: usize) -> Option<usize> {
        let ix = self.pick_index(n)?;
        self.note_pick(ctx, ix);
        Some(ix)
    }

    /// Uniformly remove and return one element. Order of the remainder is
    /// preserved (deterministic for later draws).
    #[inline]
    fn pick_and_take<T>(&mut self, items: &mut Vec<T>) -> Option<T>
    where
        Self: Sized,
    {
        let ix = self.pick_index(items.len())?;
        Some(items.remove(ix))
    }

    /// Weighted pick: returns an index with probability proportional to
    /// `weights[i]`. Zero-weight entries are never chosen; returns `None` if
    /// the total weight is zero or the slice is empty.
    fn pick_weighted(&mut self, weights: &[u64]) -> Option<usize> {
        let total: u64 = weights.iter().sum();
        let mut x = self.gen_range(total)?;
        for (ix, &w) in weights.iter().enumerate() {
            if x < w {
                return Some(ix);
            }
            x -= w;
        }
        // Unreachable: x < total and the cumulative walk covers [0, total).
        None
    }

    /// Deterministic in-place Fisher–Yates shuffle.
    ///
    /// Uses the unbiased scheme:
    /// for i in (1..len).rev() { j ~ U{0..i}; swap(i, j) }
    fn shuffle_in_place<T>(&mut self, slice: &mut [T])
    where
        Self: Sized,
    {
        let len = slice.len();
        if len <= 1 {
            return;
        }
        let mut i = len - 1;
        loop {
            let j = match self.gen_range((i as u64) + 1) {
                Some(v) => v as usize,
                None => unreachable!("gen_range(>0) must return Some"),
            };
            slice.swap(i, j);
            if i == 1 {
                break;
            }
            i -= 1;
        }
    }
}

/// Production lottery: ChaCha20 behind an explicit 64-bit seed, with draw
/// accounting and crumb capture for run records.
#[derive(Debug, Clone)]
pub struct SeededLottery {
    rng: ChaCha20Rng,
    words_consumed: u128,
    crumbs: Vec<LotteryCrumb>,
}

impl SeededLottery {
    /// Construct from a 64-bit seed: `seed.to_le_bytes()` into the first
    /// 8 bytes of the ChaCha20 seed; the remaining 24 bytes are zero.
    #[inline]
    pub fn from_seed_u64(seed: u64) -> Self {
        let mut seed32 = [0u8; 32];
        seed32[..8].copy_from_slice(&seed.to_le_bytes());
        Self {
            rng: ChaCha20Rng::from_seed(seed32),
            words_consumed: 0,
            crumbs: Vec::new(),
        }
    }

    /// Total 64-bit words consumed so far (a draw counter, not bytes;
    /// saturates at `u128::MAX`).
    #[inline]
    pub fn words_consumed(&self) -> u128 {
        self.words_consumed
    }

    /// Drain the crumbs recorded since the last call.
    pub fn take_crumbs(&mut self) -> Vec<LotteryCrumb> {
        core::mem::take(&mut self.crumbs)
    }

    /// Draw the next u64 and advance the word counter. This is the only place
    /// the counter moves.
    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.words_consumed = self.words_consumed.saturating_add(1);
        self.rng.next_u64()
    }
}

impl Lottery for SeededLottery {
    /// Unbiased integer in [0, n) via rejection sampling with the standard
    /// threshold trick: accept `x >= 2^64 mod n`, then `x % n` is uniform.
    fn gen_range(&mut self, n: u64) -> Option<u64> {
        if n == 0 {
            return None;
        }
        let threshold = n.wrapping_neg() % n; // == (2^64 % n)
        loop {
            let x = self.next_u64();
            if x >= threshold {
                return Some(x % n);
            }
        }
    }

    fn note_pick(&mut self, ctx: &str, pick: usize) {
        self.crumbs.push(LotteryCrumb {
            ctx: SmolStr::new(ctx),
            pick,
            word_index: self.words_consumed,
        });
    }
}
