//! muster_algo — the allocation engine proper.
//!
//! Pure, I/O-free algorithm layer over `muster_core`. One allocation call is
//! a single deterministic (modulo the injected lottery) pass over a fixed
//! input snapshot:
//!
//! 1. [`merge::merge_preferences`] — collapse each participant's submissions
//!    into per-tier role buckets (exactly one High role per participant).
//! 2. [`proportional::allocate`] — weight-major, priority-major, pool-minor
//!    weighted lottery over the merged buckets, consuming pool capacity.
//! 3. [`overflow::assign_overflow`] — fallback pass for everyone still
//!    unplaced, honoring each submission's preference-unavailable policy.
//! 4. [`access::derive_access_flags`] — per-pool reduced-access bit from the
//!    final assignment counts.
//!
//! The engine favors graceful degradation over failure: a participant with no
//! eligible role simply falls through to the overflow pass, and a participant
//! with no overflow option is left unassigned in the result. Host-managed
//! catalogs and the ban authority are injected as read interfaces so tests
//! run against fixed snapshots.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use muster_core::{Capacity, ParticipantId, PoolId, PriorityTier, RoleId};

pub mod access;
pub mod eligibility;
pub mod merge;
pub mod overflow;
pub mod proportional;

// Tight, explicit re-exports (avoid wildcard export drift).
pub use access::derive_access_flags;
pub use eligibility::role_candidates;
pub use merge::merge_preferences;
pub use overflow::assign_overflow;
pub use proportional::allocate;

// ----------------------------- Preferences (input side) -----------------------------

/// What to do with a participant whose preferred roles are all unavailable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnavailablePolicy {
    /// Leave them out of the round entirely.
    StayUnassigned,
    /// Seat them in a pool's overflow role.
    SpawnAsOverflow,
}

/// One participant-authored character record.
#[derive(Clone, Debug)]
pub struct CandidateSubmission {
    /// Declared interest per role; `Never` entries are ignored by the merge.
    pub role_priorities: BTreeMap<RoleId, PriorityTier>,
    /// Whether this submission is in the multi-submission round-start set.
    pub round_start_eligible: bool,
    /// Fallback policy when none of the submission's roles are available.
    pub unavailable_policy: UnavailablePolicy,
}

/// Everything the engine knows about one participant's wishes.
#[derive(Clone, Debug)]
pub struct ParticipantPreferences {
    pub submissions: Vec<CandidateSubmission>,
    /// Index of the selected submission (single-submission mode).
    pub selected: usize,
    /// Externally supplied hint breaking ties among several High roles
    /// (multi-submission mode only).
    pub preferred_top_role: Option<RoleId>,
}

impl ParticipantPreferences {
    /// The selected submission, if the index is in range.
    #[inline]
    pub fn selected_submission(&self) -> Option<&CandidateSubmission> {
        self.submissions.get(self.selected)
    }

    /// Submissions eligible as round-start candidates, with their indices.
    pub fn round_start_submissions(
        &self,
    ) -> impl Iterator<Item = (usize, &CandidateSubmission)> {
        self.submissions
            .iter()
            .enumerate()
            .filter(|(_, s)| s.round_start_eligible)
    }
}

// ----------------------------- Merged priorities -----------------------------

/// Per-participant tier → role-set buckets produced by the merge.
///
/// Invariants (enforced by [`merge::merge_preferences`]):
/// - at most one role in the High bucket,
/// - a role never appears at two tiers,
/// - `Never` is never a key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergedPriorities {
    pub buckets: BTreeMap<PriorityTier, BTreeSet<RoleId>>,
}

impl MergedPriorities {
    /// Roles at exactly this tier, if the bucket exists.
    pub fn roles_at(&self, tier: PriorityTier) -> Option<&BTreeSet<RoleId>> {
        self.buckets.get(&tier)
    }

    /// Union of all tiers' roles.
    pub fn all_roles(&self) -> BTreeSet<RoleId> {
        let mut out = BTreeSet::new();
        for roles in self.buckets.values() {
            out.extend(roles.iter().cloned());
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(|b| b.is_empty())
    }
}

// ----------------------------- Pools -----------------------------

/// One assignment pool (e.g., a station): role → remaining capacity, supplied
/// fresh per call. The engine mutates only its own working copy.
#[derive(Clone, Debug)]
pub struct PoolDef {
    pub id: PoolId,
    /// Capacity as it currently stands.
    pub current_slots: BTreeMap<RoleId, Capacity>,
    /// Capacity as configured for round start.
    pub round_start_slots: BTreeMap<RoleId, Capacity>,
    /// Headcount at or below which the pool runs on reduced access.
    pub reduced_access_threshold: u32,
}

impl PoolDef {
    /// The slot map selected by the caller's round-start flag.
    #[inline]
    pub fn slots(&self, use_round_start: bool) -> &BTreeMap<RoleId, Capacity> {
        if use_round_start {
            &self.round_start_slots
        } else {
            &self.current_slots
        }
    }
}

// ----------------------------- Results -----------------------------

/// Where one participant ended up. `submission` indexes into that
/// participant's `ParticipantPreferences::submissions`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub role: Option<RoleId>,
    pub pool: Option<PoolId>,
    pub submission: Option<usize>,
}

impl Placement {
    /// The explicit "nowhere" entry: no role, no pool, no submission.
    pub fn unassigned() -> Self {
        Self {
            role: None,
            pool: None,
            submission: None,
        }
    }

    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.role.is_some()
    }
}

/// One entry per input participant once the overflow pass has run.
pub type AllocationResult = BTreeMap<ParticipantId, Placement>;

// ----------------------------- Injected authorities -----------------------------

/// Read-only ban authority: which roles a participant may not hold.
/// `None` means "no bans recorded for this participant".
pub trait BanAuthority {
    fn banned_roles(&self, participant: &ParticipantId) -> Option<BTreeSet<RoleId>>;
}

/// Ban authority that bans nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBans;

impl BanAuthority for NoBans {
    fn banned_roles(&self, _participant: &ParticipantId) -> Option<BTreeSet<RoleId>> {
        None
    }
}

/// Fixed ban table, used by offline snapshots and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticBans {
    pub by_participant: BTreeMap<ParticipantId, BTreeSet<RoleId>>,
}

impl BanAuthority for StaticBans {
    fn banned_roles(&self, participant: &ParticipantId) -> Option<BTreeSet<RoleId>> {
        self.by_participant.get(participant).cloned()
    }
}

/// Observation point raised once per (participant, pre-filter candidate set)
/// eligibility query. Consumers may look, not touch: the returned list is what
/// downstream logic uses whether or not an observer reacted.
pub trait CandidateObserver {
    fn on_candidates(&mut self, participant: &ParticipantId, roles: &[RoleId]);
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl CandidateObserver for NullObserver {
    fn on_candidates(&mut self, _participant: &ParticipantId, _roles: &[RoleId]) {}
}

// ----------------------------- Errors -----------------------------

/// Errors surfaced by the proportional pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The allocator was handed zero pools; there is nowhere to place anyone.
    NoPools,
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AllocError::NoPools => write!(f, "no pools supplied"),
        }
    }
}

// ----------------------------- Test fixtures -----------------------------
