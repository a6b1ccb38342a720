//! Overflow pass: place whoever the proportional pass left behind.
//!
//! Contract:
//! - With zero pools this is a no-op; the result map is left untouched.
//! - A participant already in the result map is skipped.
//! - Whether they may overflow at all is a submission policy question:
//!   multi-submission mode draws uniformly among the round-start submissions
//!   that opted into SpawnAsOverflow, single-submission mode uses the
//!   selected submission iff it opted in.
//! - Pools are scanned in a fresh shuffled order per participant; the first
//!   pool owning at least one overflow-flagged role (in the slot map the
//!   round-start flag selects) takes them, via a shuffled pick among its
//!   overflow roles.
//! - Participants with no opted-in submission, or when no pool anywhere has
//!   an overflow role, get an explicit unassigned entry — never a missing
//!   one.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use muster_core::catalog::RoleCatalog;
use muster_core::rng::Lottery;
use muster_core::{Params, ParticipantId, RoleId};

use crate::{AllocationResult, ParticipantPreferences, Placement, PoolDef, UnavailablePolicy};

/// Seat every still-unassigned participant in an overflow role, or record
/// them as unassigned.
pub fn assign_overflow<L: Lottery>(
    catalog: &RoleCatalog,
    lottery: &mut L,
    params: &Params,
    results: &mut AllocationResult,
    participants: &[ParticipantId],
    preferences: &BTreeMap<ParticipantId, ParticipantPreferences>,
    pools: &[PoolDef],
    use_round_start: bool,
) {
    if pools.is_empty() {
        return; // nowhere to overflow into; leave the results untouched
    }

    for participant in participants {
        if results.contains_key(participant) {
            continue;
        }

        let submission = preferences
            .get(participant)
            .and_then(|prefs| overflow_submission(prefs, params, lottery));

        let Some(submission) = submission else {
            results.insert(participant.clone(), Placement::unassigned());
            continue;
        };

        let mut order: Vec<usize> = (0..pools.len()).collect();
        lottery.shuffle_in_place(&mut order);

        let mut placed = false;
        for ix in order {
            let pool = &pools[ix];
            let mut overflow_roles: Vec<RoleId> = pool
                .slots(use_round_start)
                .keys()
                .filter(|r| catalog.is_overflow(r))
                .cloned()
                .collect();

            // Pools with no overflow roles are simply skipped over.
            if overflow_roles.is_empty() {
                continue;
            }

            lottery.shuffle_in_place(&mut overflow_roles);
            results.insert(
                participant.clone(),
                Placement {
                    role: overflow_roles.into_iter().next(),
                    pool: Some(pool.id.clone()),
                    submission: Some(submission),
                },
            );
            placed = true;
            break;
        }

        if !placed {
            results.insert(participant.clone(), Placement::unassigned());
        }
    }
}

/// Which submission (by index) backs the overflow placement, if any.
fn overflow_submission<L: Lottery>(
    prefs: &ParticipantPreferences,
    params: &Params,
    lottery: &mut L,
) -> Option<usize> {
    if params.multi_submission {
        let opted: Vec<usize> = prefs
            .round_start_submissions()
            .filter(|(_, s)| s.unavailable_policy == UnavailablePolicy::SpawnAsOverflow)
            .map(|(ix, _)| ix)
            .collect();
        let pick = lottery.pick_index(opted.len())?;
        Some(opted[pick])
    } else {
        let sub = prefs.selected_submission()?;
        (sub.unavailable_policy == UnavailablePolicy::SpawnAsOverflow).then_some(prefs.selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{pid, plid, pool, prefs_multi, prefs_single, rid, sub};
    use muster_core::catalog::RoleDef;
    use muster_core::rng::SeededLottery;
    use muster_core::{Capacity, PriorityTier};

    fn catalog() -> RoleCatalog {
        RoleCatalog::from_roles([
            (rid("specialist"), RoleDef { weight: 10, is_overflow: false }),
            (rid("hand"), RoleDef { weight: 0, is_overflow: true }),
            (rid("steward"), RoleDef { weight: 0, is_overflow: true }),
        ])
    }

    fn overflow_prefs_single() -> ParticipantPreferences {
        let mut s = sub(&[("specialist", PriorityTier::High)]);
        s.unavailable_policy = UnavailablePolicy::SpawnAsOverflow;
        prefs_single(s)
    }

    #[test]
    fn zero_pools_is_a_no_op() {
        let mut results = AllocationResult::new();
        let prefs = BTreeMap::from([(pid("p1"), overflow_prefs_single())]);
        let mut lottery = SeededLottery::from_seed_u64(0);
        assign_overflow(
            &catalog(),
            &mut lottery,
            &Params::default(),
            &mut results,
            &[pid("p1")],
            &prefs,
            &[],
            true,
        );
        assert!(results.is_empty());
        assert_eq!(lottery.words_consumed(), 0);
    }

    #[test]
    fn already_assigned_participants_are_skipped() {
        let seated = Placement {
            role: Some(rid("specialist")),
            pool: Some(plid("alpha")),
            submission: Some(0),
        };
        let mut results = AllocationResult::from([(pid("p1"), seated.clone())]);
        let prefs = BTreeMap::from([(pid("p1"), overflow_prefs_single())]);
        let pools = [pool("alpha", &[("hand", Capacity::Unlimited)])];
        let mut lottery = SeededLottery::from_seed_u64(0);
        assign_overflow(
            &catalog(),
            &mut lottery,
            &Params::default(),
            &mut results,
            &[pid("p1")],
            &prefs,
            &pools,
            true,
        );
        assert_eq!(results[&pid("p1")], seated);
    }

    #[test]
    fn stay_unassigned_policy_gets_explicit_empty_entry() {
        let mut results = AllocationResult::new();
        let prefs = BTreeMap::from([(
            pid("p1"),
            prefs_single(sub(&[("specialist", PriorityTier::High)])), // StayUnassigned
        )]);
        let pools = [pool("alpha", &[("hand", Capacity::Unlimited)])];
        let mut lottery = SeededLottery::from_seed_u64(0);
        assign_overflow(
            &catalog(),
            &mut lottery,
            &Params::default(),
            &mut results,
            &[pid("p1")],
            &prefs,
            &pools,
            true,
        );
        assert_eq!(results[&pid("p1")], Placement::unassigned());
    }

    #[test]
    fn lands_in_the_pool_owning_an_overflow_role() {
        // Only "beta" has an overflow role; the shuffled pool order must not
        // matter.
        let prefs = BTreeMap::from([(pid("p1"), overflow_prefs_single())]);
        let pools = [
            pool("alpha", &[("specialist", Capacity::Finite(1))]),
            pool("beta", &[("hand", Capacity::Unlimited)]),
        ];
        for seed in 0..16 {
            let mut results = AllocationResult::new();
            let mut lottery = SeededLottery::from_seed_u64(seed);
            assign_overflow(
                &catalog(),
                &mut lottery,
                &Params::default(),
                &mut results,
                &[pid("p1")],
                &prefs,
                &pools,
                true,
            );
            let placement = &results[&pid("p1")];
            assert_eq!(placement.pool, Some(plid("beta")));
            assert_eq!(placement.role, Some(rid("hand")));
            assert_eq!(placement.submission, Some(0));
        }
    }

    #[test]
    fn no_overflow_roles_anywhere_leaves_explicit_unassigned() {
        let prefs = BTreeMap::from([(pid("p1"), overflow_prefs_single())]);
        let pools = [pool("alpha", &[("specialist", Capacity::Finite(1))])];
        let mut results = AllocationResult::new();
        let mut lottery = SeededLottery::from_seed_u64(1);
        assign_overflow(
            &catalog(),
            &mut lottery,
            &Params::default(),
            &mut results,
            &[pid("p1")],
            &prefs,
            &pools,
            true,
        );
        assert_eq!(results[&pid("p1")], Placement::unassigned());
    }

    #[test]
    fn multi_mode_draws_only_among_opted_in_submissions() {
        // Submission 0 stays unassigned, submission 1 opted into overflow.
        let mut opted = sub(&[("specialist", PriorityTier::Low)]);
        opted.unavailable_policy = UnavailablePolicy::SpawnAsOverflow;
        let prefs = BTreeMap::from([(
            pid("p1"),
            prefs_multi(
                alloc::vec![sub(&[("specialist", PriorityTier::High)]), opted],
                None,
            ),
        )]);
        let params = Params {
            multi_submission: true,
            lottery_seed: 0,
        };
        let pools = [pool("alpha", &[("hand", Capacity::Unlimited)])];
        for seed in 0..8 {
            let mut results = AllocationResult::new();
            let mut lottery = SeededLottery::from_seed_u64(seed);
            assign_overflow(
                &catalog(),
                &mut lottery,
                &params,
                &mut results,
                &[pid("p1")],
                &prefs,
                &pools,
                true,
            );
            assert_eq!(results[&pid("p1")].submission, Some(1));
            assert_eq!(results[&pid("p1")].role, Some(rid("hand")));
        }
    }

    #[test]
    fn multi_mode_without_opted_in_submission_is_unassigned() {
        let prefs = BTreeMap::from([(
            pid("p1"),
            prefs_multi(alloc::vec![sub(&[("specialist", PriorityTier::High)])], None),
        )]);
        let params = Params {
            multi_submission: true,
            lottery_seed: 0,
        };
        let pools = [pool("alpha", &[("hand", Capacity::Unlimited)])];
        let mut results = AllocationResult::new();
        let mut lottery = SeededLottery::from_seed_u64(3);
        assign_overflow(
            &catalog(),
            &mut lottery,
            &params,
            &mut results,
            &[pid("p1")],
            &prefs,
            &pools,
            true,
        );
        assert_eq!(results[&pid("p1")], Placement::unassigned());
    }
}
