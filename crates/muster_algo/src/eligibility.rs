//! Eligibility filter: which roles each participant may actually hold.
//!
//! Contract:
//! - Gather the participant's merged roles at the requested tier (all tiers
//!   when `tier` is `None`).
//! - Raise the observer once per (participant, pre-filter candidate set)
//!   query; observers are read-only.
//! - Drop roles missing from the catalog (ineligible, never an error), roles
//!   outside the requested weight (when given), and roles the ban authority
//!   disallows.
//! - Participants whose surviving list is empty are omitted from the output
//!   entirely.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use muster_core::catalog::RoleCatalog;
use muster_core::{ParticipantId, PriorityTier, RoleId};

use crate::{BanAuthority, CandidateObserver, MergedPriorities};

/// Per-participant eligible roles for one (weight, tier) slice.
pub fn role_candidates<B, O>(
    catalog: &RoleCatalog,
    bans: &B,
    observer: &mut O,
    weight: Option<i32>,
    tier: Option<PriorityTier>,
    merged: &BTreeMap<ParticipantId, MergedPriorities>,
) -> BTreeMap<ParticipantId, Vec<RoleId>>
where
    B: BanAuthority,
    O: CandidateObserver,
{
    let mut out = BTreeMap::new();

    for (participant, priorities) in merged {
        let roles: BTreeSet<RoleId> = match tier {
            Some(tier) => priorities
                .roles_at(tier)
                .cloned()
                .unwrap_or_default(),
            None => priorities.all_roles(),
        };

        // Observation point for late rule injection; the list handed out here
        // is pre-filter and read-only.
        let pre_filter: Vec<RoleId> = roles.iter().cloned().collect();
        observer.on_candidates(participant, &pre_filter);

        let banned = bans.banned_roles(participant);

        let mut available: Vec<RoleId> = Vec::new();
        for role in roles {
            let Some(def) = catalog.role(&role) else {
                continue; // unknown role: ineligible, not fatal
            };
            if let Some(w) = weight {
                if def.weight != w {
                    continue;
                }
            }
            if banned.as_ref().is_some_and(|b| b.contains(&role)) {
                continue;
            }
            available.push(role);
        }

        if !available.is_empty() {
            out.insert(participant.clone(), available);
        }
    }

    out
}
