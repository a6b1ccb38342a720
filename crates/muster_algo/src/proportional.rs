//! The weighted proportional lottery.
//!
//! Ordering is weight-major, priority-major, pool-minor: the outer loop walks
//! role weights descending, the inner loop walks priority tiers High → Low,
//! so higher-weight, higher-priority roles are always saturated before lower
//! ones are even considered. Within one (weight, priority) slice:
//!
//! 1. Eligible candidates are gathered and reverse-indexed by role.
//! 2. Each pool's share weight is the capacity sum of its roles in this
//!    weight tier (an unlimited role counts as one slot, so it cannot
//!    dominate the split).
//! 3. Target shares are `floor(pool_share / total_share * candidates)`; the
//!    rounding shortfall goes whole to one uniformly random pool, so a slice
//!    with more pools than candidates still places everyone.
//! 4. Each pool depletes its share by sweeping its roles in a shuffled order,
//!    drawing a uniform candidate per role, until a sweep changes nothing or
//!    the share is spent. The shuffle keeps the first-listed role from
//!    soaking up every pick.
//!
//! Placement removes the participant from every waiting set and from the
//! merged map, so the whole pass terminates as soon as the map empties.
//! Slice-local state is rebuilt per slice; nothing is carried across
//! iterations except the capacity working copy.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::vec::Vec;

use muster_core::catalog::RoleCatalog;
use muster_core::rng::Lottery;
use muster_core::{Capacity, Params, ParticipantId, PoolId, PriorityTier, RoleId};

use crate::eligibility::role_candidates;
use crate::merge::merge_preferences;
use crate::{
    AllocError, AllocationResult, BanAuthority, CandidateObserver, MergedPriorities,
    ParticipantPreferences, Placement, PoolDef,
};

/// Run the proportional pass. Returns one entry per *placed* participant;
/// everyone else is left for the overflow pass.
///
/// The round-start flag selects which of each pool's slot maps is consumed.
/// Pool capacity is mutated only on a working copy; the supplied `pools` are
/// untouched.
#[allow(clippy::too_many_arguments)]
pub fn allocate<B, O, L>(
    catalog: &RoleCatalog,
    bans: &B,
    observer: &mut O,
    lottery: &mut L,
    params: &Params,
    preferences: &BTreeMap<ParticipantId, ParticipantPreferences>,
    pools: &[PoolDef],
    use_round_start: bool,
) -> Result<AllocationResult, AllocError>
where
    B: BanAuthority,
    O: CandidateObserver,
    L: Lottery,
{
    if pools.is_empty() {
        return Err(AllocError::NoPools);
    }

    let mut results: AllocationResult = BTreeMap::new();
    if preferences.is_empty() {
        return Ok(results);
    }

    let mut merged = merge_preferences(preferences, params.multi_submission, lottery);

    // Working capacity copy, selected by the round-start flag.
    let mut pool_slots: BTreeMap<PoolId, BTreeMap<RoleId, Capacity>> = pools
        .iter()
        .map(|p| (p.id.clone(), p.slots(use_round_start).clone()))
        .collect();
    let pool_ids: Vec<PoolId> = pools.iter().map(|p| p.id.clone()).collect();

    'weights: for &weight in catalog.weights_descending() {
        for tier in PriorityTier::DESCENDING {
            // Everyone placed: nothing left to iterate for.
            if merged.is_empty() {
                break 'weights;
            }

            let candidates =
                role_candidates(catalog, bans, observer, Some(weight), Some(tier), &merged);
            if candidates.is_empty() {
                continue;
            }

            run_slice(
                weight,
                tier,
                &candidates,
                &pool_ids,
                catalog,
                lottery,
                params,
                preferences,
                &mut merged,
                &mut pool_slots,
                &mut results,
            );
        }
    }

    Ok(results)
}

/// Distribute one (weight, priority) slice of candidates across the pools.
#[allow(clippy::too_many_arguments)]
fn run_slice<L: Lottery>(
    weight: i32,
    tier: PriorityTier,
    candidates: &BTreeMap<ParticipantId, Vec<RoleId>>,
    pool_ids: &[PoolId],
    catalog: &RoleCatalog,
    lottery: &mut L,
    params: &Params,
    preferences: &BTreeMap<ParticipantId, ParticipantPreferences>,
    merged: &mut BTreeMap<ParticipantId, MergedPriorities>,
    pool_slots: &mut BTreeMap<PoolId, BTreeMap<RoleId, Capacity>>,
    results: &mut AllocationResult,
) {
    // Reverse index: role → waiting candidates. Sets are kept non-empty;
    // placement prunes as participants drop out.
    let mut waiting: BTreeMap<RoleId, BTreeSet<ParticipantId>> = BTreeMap::new();
    for (participant, roles) in candidates {
        for role in roles {
            waiting
                .entry(role.clone())
                .or_default()
                .insert(participant.clone());
        }
    }
    let mut remaining = candidates.len();

    let empty = BTreeSet::new();
    let weight_roles = catalog.roles_at_weight(weight).unwrap_or(&empty);

    // Each pool's active slice: its roles in this weight tier.
    let slice_roles: BTreeMap<PoolId, Vec<RoleId>> = pool_ids
        .iter()
        .map(|id| {
            let roles = pool_slots[id]
                .keys()
                .filter(|r| weight_roles.contains(*r))
                .cloned()
                .collect();
            (id.clone(), roles)
        })
        .collect();

    // Share weight per pool: capacity sum over the active slice, with
    // unlimited slots discounted to 1.
    let share_weight: BTreeMap<PoolId, u64> = pool_ids
        .iter()
        .map(|id| {
            let w = slice_roles[id]
                .iter()
                .map(|r| pool_slots[id][r].share_weight())
                .sum();
            (id.clone(), w)
        })
        .collect();
    let total_share: u64 = share_weight.values().sum();
    if total_share == 0 {
        return; // no eligible role capacity this round
    }

    // Floor shares, then hand the whole rounding shortfall to one random
    // pool. Without this, two pools and one candidate would both floor to
    // zero and nobody would be placed.
    let mut targets: BTreeMap<PoolId, usize> = BTreeMap::new();
    let mut distributed = 0usize;
    for id in pool_ids {
        let t = ((share_weight[id] as u128) * (remaining as u128) / (total_share as u128)) as usize;
        targets.insert(id.clone(), t);
        distributed += t;
    }
    if distributed < remaining {
        let ctx = format!("slice:w{weight}-{}/shortfall", tier.as_str());
        if let Some(ix) = lottery.pick_index_ctx(&ctx, pool_ids.len()) {
            *targets.get_mut(&pool_ids[ix]).expect("target seeded") += remaining - distributed;
        }
    }

    // Shake each pool until its share settles or the slice is exhausted.
    for id in pool_ids {
        let mut share = targets[id];
        if share == 0 {
            continue;
        }

        let mut role_order = slice_roles[id].clone();
        lottery.shuffle_in_place(&mut role_order);

        loop {
            let before = share;
            for role in &role_order {
                if share == 0 {
                    break;
                }
                if !pool_slots[id][role].has_room() {
                    continue;
                }
                let Some(set) = waiting.get(role) else {
                    continue;
                };
                let pick = lottery
                    .pick_index(set.len())
                    .expect("waiting sets are non-empty");
                let participant = set
                    .iter()
                    .nth(pick)
                    .cloned()
                    .expect("pick index in range");

                place(
                    &participant,
                    role,
                    id,
                    params,
                    preferences,
                    lottery,
                    &mut waiting,
                    merged,
                    pool_slots,
                    results,
                );
                share -= 1;
                remaining -= 1;
                if remaining == 0 {
                    return; // slice exhausted; skip the remaining pools
                }
            }
            if share == 0 || share == before {
                break;
            }
        }
    }
}

/// Seat one participant and update all the bookkeeping.
#[allow(clippy::too_many_arguments)]
fn place<L: Lottery>(
    participant: &ParticipantId,
    role: &RoleId,
    pool: &PoolId,
    params: &Params,
    preferences: &BTreeMap<ParticipantId, ParticipantPreferences>,
    lottery: &mut L,
    waiting: &mut BTreeMap<RoleId, BTreeSet<ParticipantId>>,
    merged: &mut BTreeMap<ParticipantId, MergedPriorities>,
    pool_slots: &mut BTreeMap<PoolId, BTreeMap<RoleId, Capacity>>,
    results: &mut AllocationResult,
) {
    // Drop the participant from every waiting set; they may have been
    // eligible for several roles in this slice.
    waiting.retain(|_, set| {
        set.remove(participant);
        !set.is_empty()
    });

    let submission = choose_submission(participant, role, params, preferences, lottery);

    if let Some(cap) = pool_slots
        .get_mut(pool)
        .and_then(|slots| slots.get_mut(role))
    {
        cap.take_one();
    }

    merged.remove(participant);
    let prior = results.insert(
        participant.clone(),
        Placement {
            role: Some(role.clone()),
            pool: Some(pool.clone()),
            submission,
        },
    );
    debug_assert!(prior.is_none(), "participant placed twice");
}

/// Which submission gets recorded for the assigned role.
///
/// Multi-submission mode draws among the round-start submissions that listed
/// the role, weighted by how highly each ranked it; single-submission mode
/// records the selected submission.
fn choose_submission<L: Lottery>(
    participant: &ParticipantId,
    role: &RoleId,
    params: &Params,
    preferences: &BTreeMap<ParticipantId, ParticipantPreferences>,
    lottery: &mut L,
) -> Option<usize> {
    let prefs = preferences.get(participant)?;
    if !params.multi_submission {
        return Some(prefs.selected);
    }

    let mut indices: Vec<usize> = Vec::new();
    let mut weights: Vec<u64> = Vec::new();
    for (ix, sub) in prefs.round_start_submissions() {
        if let Some(&tier) = sub.role_priorities.get(role) {
            indices.push(ix);
            weights.push(params.submission_selection_weight(tier) as u64);
        }
    }
    match lottery.pick_weighted(&weights) {
        Some(k) => Some(indices[k]),
        // No eligible submission listed the role; fall back to the selection.
        None => Some(prefs.selected),
    }
}
