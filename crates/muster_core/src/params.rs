//! Run parameters for one allocation call.
//!
//! Notes:
//! - `multi_submission` switches the whole engine between single-submission
//!   and multi-submission preference handling.
//! - `lottery_seed` is the only source of randomness; reproducing a run means
//!   reproducing the seed, never a particular draw count.

use crate::priority::PriorityTier;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Relative draw weights used when choosing which of a participant's
/// submissions is recorded for an assigned role. A submission that ranked the
/// role higher is favored without ever excluding a low-ranked one. The
/// overflow pass shares this scale.
const SUBMISSION_SELECTION_WEIGHTS: [(PriorityTier, u32); 3] = [
    (PriorityTier::Low, 1),
    (PriorityTier::Medium, 3),
    (PriorityTier::High, 9),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Params {
    /// Whether participants offer several simultaneously eligible submissions.
    pub multi_submission: bool,
    /// Seed for the lottery RNG; equal seeds on equal snapshots reproduce runs.
    pub lottery_seed: u64,
}

impl Params {
    /// Draw weight for recording a submission that listed the assigned role at
    /// `tier`. `Never` does not occur in submission maps that reach this point
    /// and weighs zero.
    pub fn submission_selection_weight(&self, tier: PriorityTier) -> u32 {
        SUBMISSION_SELECTION_WEIGHTS
            .iter()
            .find(|(t, _)| *t == tier)
            .map(|(_, w)| *w)
            .unwrap_or(0)
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            multi_submission: false,
            lottery_seed: 0,
        }
    }
}
