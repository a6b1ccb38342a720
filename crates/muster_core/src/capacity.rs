//! Remaining-slot counts for a (pool, role) pair.
//!
//! Capacity is either a finite nonnegative count or unlimited. For the
//! proportional-share computation an unlimited slot deliberately counts as a
//! single slot so it cannot dominate the split; only finite capacities are
//! consumed by assignment.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Capacity {
    Finite(u32),
    Unlimited,
}

impl Capacity {
    /// Weight this capacity contributes to a pool's proportional share.
    /// Unlimited counts as 1; finite counts as itself.
    #[inline]
    pub fn share_weight(self) -> u64 {
        match self {
            Capacity::Finite(n) => n as u64,
            Capacity::Unlimited => 1,
        }
    }

    /// Whether at least one more participant can be seated here.
    #[inline]
    pub fn has_room(self) -> bool {
        match self {
            Capacity::Finite(n) => n > 0,
            Capacity::Unlimited => true,
        }
    }

    /// Consume one slot. Callers must check `has_room` first; draining an
    /// exhausted finite capacity is a contract violation.
    #[inline]
    pub fn take_one(&mut self) {
        if let Capacity::Finite(n) = self {
            debug_assert!(*n > 0, "capacity underflow");
            *n = n.saturating_sub(1);
        }
    }
}
