//! Preference merge: one-or-many submissions → per-tier role buckets.
//!
//! Contract:
//! - Single-submission mode: the selected submission's role → tier map is
//!   copied into buckets as-is (minus `Never` entries).
//! - Multi-submission mode: every round-start-eligible submission is scanned.
//!   All High roles are collected; if the participant's preferred-top-role
//!   hint is among them it wins, otherwise one is drawn uniformly from the
//!   collected set. Every other collected High role is demoted to Medium.
//! - Tiers are mutually exclusive per participant: the chosen High role is
//!   scrubbed from Medium/Low, and every Medium role is scrubbed from Low.
//! - The output holds one entry per input participant; buckets that end up
//!   empty are pruned, and `Never` is never a key.
//!
//! Randomness: at most one draw per participant, and only when a High tie
//! actually needs breaking.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::vec::Vec;

use muster_core::rng::Lottery;
use muster_core::{ParticipantId, PriorityTier, RoleId};

use crate::{MergedPriorities, ParticipantPreferences};

/// Collapse every participant's submissions into [`MergedPriorities`].
pub fn merge_preferences<L: Lottery>(
    preferences: &BTreeMap<ParticipantId, ParticipantPreferences>,
    multi_submission: bool,
    lottery: &mut L,
) -> BTreeMap<ParticipantId, MergedPriorities> {
    let mut out = BTreeMap::new();
    for (participant, prefs) in preferences {
        let merged = if multi_submission {
            merge_multi(participant, prefs, lottery)
        } else {
            merge_single(prefs)
        };
        out.insert(participant.clone(), merged);
    }
    out
}

/// Single-submission mode: straight copy of the selected submission.
fn merge_single(prefs: &ParticipantPreferences) -> MergedPriorities {
    let mut merged = MergedPriorities::default();
    if let Some(sub) = prefs.selected_submission() {
        for (role, &tier) in &sub.role_priorities {
            if tier.selects() {
                merged
                    .buckets
                    .entry(tier)
                    .or_default()
                    .insert(role.clone());
            }
        }
    }
    prune_empty(&mut merged);
    merged
}

/// Multi-submission mode: collect, tie-break, demote, deduplicate.
fn merge_multi<L: Lottery>(
    participant: &ParticipantId,
    prefs: &ParticipantPreferences,
    lottery: &mut L,
) -> MergedPriorities {
    let mut merged = MergedPriorities::default();
    let hint = prefs.preferred_top_role.as_ref();

    // Collected High roles (distinct, first-seen order) minus the hint itself.
    let mut high_roles: Vec<RoleId> = Vec::new();
    let mut seen_high: BTreeSet<RoleId> = BTreeSet::new();
    let mut have_hint_high = false;

    for (_, sub) in prefs.round_start_submissions() {
        for (role, &tier) in &sub.role_priorities {
            match tier {
                PriorityTier::High => {
                    if hint == Some(role) {
                        have_hint_high = true;
                    } else if seen_high.insert(role.clone()) {
                        high_roles.push(role.clone());
                    }
                }
                PriorityTier::Never => {}
                tier => {
                    merged
                        .buckets
                        .entry(tier)
                        .or_default()
                        .insert(role.clone());
                }
            }
        }
    }

    // The sole High role: the hint when it was itself marked High somewhere,
    // otherwise a uniform draw over the collected set. A participant with no
    // High role anywhere simply has no High bucket.
    let chosen = if have_hint_high {
        hint.cloned()
    } else {
        lottery
            .pick_index_ctx(&format!("merge:{participant}/high-tie"), high_roles.len())
            .map(|ix| high_roles.remove(ix))
    };

    if let Some(chosen) = chosen {
        merged
            .buckets
            .entry(PriorityTier::High)
            .or_default()
            .insert(chosen.clone());
        if let Some(medium) = merged.buckets.get_mut(&PriorityTier::Medium) {
            medium.remove(&chosen);
        }
        if let Some(low) = merged.buckets.get_mut(&PriorityTier::Low) {
            low.remove(&chosen);
        }
    }

    // Losing High roles keep a Medium claim.
    for role in high_roles {
        merged
            .buckets
            .entry(PriorityTier::Medium)
            .or_default()
            .insert(role);
    }

    // Duplicates collapse upward: anything Medium leaves Low.
    if let Some(medium) = merged.buckets.get(&PriorityTier::Medium).cloned() {
        if let Some(low) = merged.buckets.get_mut(&PriorityTier::Low) {
            for role in &medium {
                low.remove(role);
            }
        }
    }

    prune_empty(&mut merged);
    merged
}

fn prune_empty(merged: &mut MergedPriorities) {
    merged.buckets.retain(|_, roles| !roles.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{pid, prefs_multi, prefs_single, rid, sub, ScriptedLottery};
    use crate::{CandidateSubmission, UnavailablePolicy};
    use muster_core::rng::SeededLottery;

    #[test]
    fn single_mode_copies_selected_submission() {
        let prefs = prefs_single(sub(&[("engineer", PriorityTier::High), ("mate", PriorityTier::Low), ("cook", PriorityTier::Never)]));
        let input = BTreeMap::from([(pid("p1"), prefs)]);
        let mut lottery = SeededLottery::from_seed_u64(0);

        let merged = merge_preferences(&input, false, &mut lottery);
        let m = &merged[&pid("p1")];
        assert_eq!(m.roles_at(PriorityTier::High).unwrap().len(), 1);
        assert!(m.roles_at(PriorityTier::High).unwrap().contains(&rid("engineer")));
        assert!(m.roles_at(PriorityTier::Low).unwrap().contains(&rid("mate")));
        // Never entries vanish; no draw was needed.
        assert!(m.all_roles().len() == 2);
        assert_eq!(lottery.words_consumed(), 0);
    }

    #[test]
    fn multi_mode_hint_wins_when_marked_high() {
        let prefs = prefs_multi(
            alloc::vec![
                sub(&[("engineer", PriorityTier::High)]),
                sub(&[("mate", PriorityTier::High), ("cook", PriorityTier::Low)]),
            ],
            Some("mate"),
        );
        let input = BTreeMap::from([(pid("p1"), prefs)]);
        let mut lottery = SeededLottery::from_seed_u64(7);

        let merged = merge_preferences(&input, true, &mut lottery);
        let m = &merged[&pid("p1")];
        let high = m.roles_at(PriorityTier::High).unwrap();
        assert_eq!(high.len(), 1);
        assert!(high.contains(&rid("mate")));
        // The losing High role is demoted to Medium.
        assert!(m.roles_at(PriorityTier::Medium).unwrap().contains(&rid("engineer")));
        // Hint resolution consumes no randomness.
        assert_eq!(lottery.words_consumed(), 0);
    }

    #[test]
    fn multi_mode_draws_one_high_without_hint() {
        let prefs = prefs_multi(
            alloc::vec![
                sub(&[("engineer", PriorityTier::High)]),
                sub(&[("mate", PriorityTier::High)]),
            ],
            None,
        );
        let input = BTreeMap::from([(pid("p1"), prefs)]);

        // Scripted draw: index 1 of the collected set (first-seen order).
        let mut lottery = ScriptedLottery::new(&[1]);
        let merged = merge_preferences(&input, true, &mut lottery);
        let m = &merged[&pid("p1")];
        let high = m.roles_at(PriorityTier::High).unwrap();
        assert_eq!(high.len(), 1);
        assert!(high.contains(&rid("mate")));
        assert!(m.roles_at(PriorityTier::Medium).unwrap().contains(&rid("engineer")));
    }

    #[test]
    fn tiers_are_mutually_exclusive() {
        // Same role marked High in one submission and Low in another, plus a
        // Medium/Low duplicate across submissions.
        let prefs = prefs_multi(
            alloc::vec![
                sub(&[("engineer", PriorityTier::High), ("mate", PriorityTier::Medium)]),
                sub(&[("engineer", PriorityTier::Low), ("mate", PriorityTier::Low)]),
            ],
            None,
        );
        let input = BTreeMap::from([(pid("p1"), prefs)]);
        let mut lottery = SeededLottery::from_seed_u64(3);

        let merged = merge_preferences(&input, true, &mut lottery);
        let m = &merged[&pid("p1")];
        assert!(m.roles_at(PriorityTier::High).unwrap().contains(&rid("engineer")));
        assert!(m.roles_at(PriorityTier::Medium).unwrap().contains(&rid("mate")));
        // Neither role retains a Low claim.
        assert!(m.roles_at(PriorityTier::Low).is_none());
    }

    #[test]
    fn no_high_roles_means_no_high_bucket() {
        let prefs = prefs_multi(
            alloc::vec![sub(&[("cook", PriorityTier::Low)])],
            Some("engineer"), // hint exists but nothing marked it High
        );
        let input = BTreeMap::from([(pid("p1"), prefs)]);
        let mut lottery = SeededLottery::from_seed_u64(0);

        let merged = merge_preferences(&input, true, &mut lottery);
        let m = &merged[&pid("p1")];
        assert!(m.roles_at(PriorityTier::High).is_none());
        assert!(m.roles_at(PriorityTier::Low).unwrap().contains(&rid("cook")));
    }

    #[test]
    fn ineligible_submissions_are_ignored_in_multi_mode() {
        let mut hidden = sub(&[("master", PriorityTier::High)]);
        hidden.round_start_eligible = false;
        let prefs = ParticipantPreferences {
            submissions: alloc::vec![hidden, sub(&[("mate", PriorityTier::Medium)])],
            selected: 0,
            preferred_top_role: None,
        };
        let input = BTreeMap::from([(pid("p1"), prefs)]);
        let mut lottery = SeededLottery::from_seed_u64(0);

        let merged = merge_preferences(&input, true, &mut lottery);
        let m = &merged[&pid("p1")];
        assert!(m.roles_at(PriorityTier::High).is_none());
        assert!(m.roles_at(PriorityTier::Medium).unwrap().contains(&rid("mate")));
    }

    #[test]
    fn merge_is_stable_on_already_merged_shape() {
        // One High role, distinct Medium/Low roles: re-merging the same
        // snapshot yields the identical structure, no randomness needed.
        let submission = CandidateSubmission {
            role_priorities: BTreeMap::from([
                (rid("master"), PriorityTier::High),
                (rid("mate"), PriorityTier::Medium),
                (rid("cook"), PriorityTier::Low),
            ]),
            round_start_eligible: true,
            unavailable_policy: UnavailablePolicy::StayUnassigned,
        };
        let prefs = prefs_multi(alloc::vec![submission], Some("master"));
        let input = BTreeMap::from([(pid("p1"), prefs)]);

        let mut l1 = SeededLottery::from_seed_u64(11);
        let mut l2 = SeededLottery::from_seed_u64(99);
        let a = merge_preferences(&input, true, &mut l1);
        let b = merge_preferences(&input, true, &mut l2);
        assert_eq!(a, b);
    }
}
