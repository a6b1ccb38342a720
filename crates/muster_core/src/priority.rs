//! Participant-declared interest tiers.
//!
//! Ordering is total: `Never < Low < Medium < High`. `Never` means the role is
//! deselected; only the other three tiers participate in allocation, which
//! walks them High → Low.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PriorityTier {
    Never,
    Low,
    Medium,
    High,
}

impl PriorityTier {
    /// The tiers that take part in allocation, highest first.
    pub const DESCENDING: [PriorityTier; 3] =
        [PriorityTier::High, PriorityTier::Medium, PriorityTier::Low];

    /// True for every tier except `Never`.
    #[inline]
    pub fn selects(self) -> bool {
        !matches!(self, PriorityTier::Never)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityTier::Never => "never",
            PriorityTier::Low => "low",
            PriorityTier::Medium => "medium",
            PriorityTier::High => "high",
        }
    }
}
