//! Wire shapes for one round snapshot, plus validation into typed inputs.
//!
//! Wire rules:
//! - ids are plain strings, validated into tokens on conversion;
//! - a capacity is a nonnegative integer or `null` for unlimited;
//! - priority tiers and policies are snake_case strings;
//! - `bans`, `selected`, thresholds and flags all default when omitted.
//!
//! Duplicate role/pool ids and out-of-range `selected` indices are rejected
//! here; roles referenced by pools or preferences but missing from the
//! catalog are *not* (the engine treats them as ineligible).

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use muster_algo::{
    CandidateSubmission, ParticipantPreferences, PoolDef, StaticBans, UnavailablePolicy,
};
use muster_core::catalog::{RoleCatalog, RoleDef};
use muster_core::{Capacity, Params, ParticipantId, PoolId, PriorityTier, RoleId};

use crate::IoError;

// ----------------------------- Wire model -----------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSnapshot {
    #[serde(default)]
    pub params: Params,
    pub roles: Vec<RoleEntry>,
    pub pools: Vec<PoolEntry>,
    #[serde(default)]
    pub bans: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub preferences: BTreeMap<String, PreferenceEntry>,
    /// Consume round-start slot maps instead of current ones.
    #[serde(default)]
    pub use_round_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntry {
    pub id: String,
    pub weight: i32,
    #[serde(default)]
    pub overflow: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolEntry {
    pub id: String,
    /// role id → capacity; `null` means unlimited.
    #[serde(default)]
    pub current_slots: BTreeMap<String, Option<u32>>,
    #[serde(default)]
    pub round_start_slots: BTreeMap<String, Option<u32>>,
    #[serde(default)]
    pub reduced_access_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub submissions: Vec<SubmissionEntry>,
    #[serde(default)]
    pub selected: usize,
    #[serde(default)]
    pub preferred_top_role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionEntry {
    /// role id → declared tier; `never` entries are legal and ignored later.
    #[serde(default)]
    pub roles: BTreeMap<String, PriorityTier>,
    #[serde(default = "default_true")]
    pub round_start_eligible: bool,
    #[serde(default)]
    pub unavailable_policy: PolicyEntry,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyEntry {
    #[default]
    StayUnassigned,
    SpawnAsOverflow,
}

impl From<PolicyEntry> for UnavailablePolicy {
    fn from(p: PolicyEntry) -> Self {
        match p {
            PolicyEntry::StayUnassigned => UnavailablePolicy::StayUnassigned,
            PolicyEntry::SpawnAsOverflow => UnavailablePolicy::SpawnAsOverflow,
        }
    }
}

// ----------------------------- Typed inputs -----------------------------

/// Everything one allocation round consumes, validated and typed.
#[derive(Debug, Clone)]
pub struct RoundInputs {
    pub params: Params,
    pub catalog: RoleCatalog,
    pub pools: Vec<PoolDef>,
    pub bans: StaticBans,
    pub preferences: BTreeMap<ParticipantId, ParticipantPreferences>,
    pub use_round_start: bool,
}

impl RoundSnapshot {
    /// Validate the wire document into typed round inputs.
    pub fn into_inputs(self) -> Result<RoundInputs, IoError> {
        let mut role_ids: BTreeSet<RoleId> = BTreeSet::new();
        let mut roles: Vec<(RoleId, RoleDef)> = Vec::with_capacity(self.roles.len());
        for entry in &self.roles {
            let id = parse_role(&entry.id)?;
            if !role_ids.insert(id.clone()) {
                return Err(snapshot_err(format!("duplicate role id '{}'", entry.id)));
            }
            roles.push((
                id,
                RoleDef {
                    weight: entry.weight,
                    is_overflow: entry.overflow,
                },
            ));
        }
        let catalog = RoleCatalog::from_roles(roles);

        let mut pool_ids: BTreeSet<PoolId> = BTreeSet::new();
        let mut pools: Vec<PoolDef> = Vec::with_capacity(self.pools.len());
        for entry in &self.pools {
            let id = PoolId::from_str(&entry.id)
                .map_err(|e| snapshot_err(format!("pool id '{}': {e}", entry.id)))?;
            if !pool_ids.insert(id.clone()) {
                return Err(snapshot_err(format!("duplicate pool id '{}'", entry.id)));
            }
            pools.push(PoolDef {
                id,
                current_slots: parse_slots(&entry.current_slots)?,
                round_start_slots: parse_slots(&entry.round_start_slots)?,
                reduced_access_threshold: entry.reduced_access_threshold,
            });
        }

        let mut bans = StaticBans::default();
        for (participant, roles) in &self.bans {
            let p = parse_participant(participant)?;
            let set: BTreeSet<RoleId> = roles
                .iter()
                .map(|r| parse_role(r))
                .collect::<Result<_, _>>()?;
            bans.by_participant.insert(p, set);
        }

        let mut preferences = BTreeMap::new();
        for (participant, entry) in &self.preferences {
            let p = parse_participant(participant)?;
            if !entry.submissions.is_empty() && entry.selected >= entry.submissions.len() {
                return Err(snapshot_err(format!(
                    "participant '{participant}': selected index {} out of range ({} submissions)",
                    entry.selected,
                    entry.submissions.len()
                )));
            }
            let submissions = entry
                .submissions
                .iter()
                .map(|s| {
                    Ok(CandidateSubmission {
                        role_priorities: s
                            .roles
                            .iter()
                            .map(|(r, &t)| Ok((parse_role(r)?, t)))
                            .collect::<Result<_, IoError>>()?,
                        round_start_eligible: s.round_start_eligible,
                        unavailable_policy: s.unavailable_policy.into(),
                    })
                })
                .collect::<Result<Vec<_>, IoError>>()?;
            let preferred_top_role = entry
                .preferred_top_role
                .as_deref()
                .map(parse_role)
                .transpose()?;
            preferences.insert(
                p,
                ParticipantPreferences {
                    submissions,
                    selected: entry.selected,
                    preferred_top_role,
                },
            );
        }

        Ok(RoundInputs {
            params: self.params,
            catalog,
            pools,
            bans,
            preferences,
            use_round_start: self.use_round_start,
        })
    }
}

fn parse_slots(slots: &BTreeMap<String, Option<u32>>) -> Result<BTreeMap<RoleId, Capacity>, IoError> {
    slots
        .iter()
        .map(|(role, cap)| {
            let id = parse_role(role)?;
            let cap = match cap {
                Some(n) => Capacity::Finite(*n),
                None => Capacity::Unlimited,
            };
            Ok((id, cap))
        })
        .collect()
}

fn parse_role(s: &str) -> Result<RoleId, IoError> {
    RoleId::from_str(s).map_err(|e| snapshot_err(format!("role id '{s}': {e}")))
}

fn parse_participant(s: &str) -> Result<ParticipantId, IoError> {
    ParticipantId::from_str(s).map_err(|e| snapshot_err(format!("participant id '{s}': {e}")))
}

fn snapshot_err(msg: String) -> IoError {
    IoError::Snapshot { msg }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> RoundSnapshot {
        serde_json::from_str(
            r#"{
                "roles": [
                    {"id": "specialist", "weight": 10},
                    {"id": "hand", "weight": 0, "overflow": true}
                ],
                "pools": [
                    {"id": "alpha",
                     "round_start_slots": {"specialist": 1, "hand": null},
                     "reduced_access_threshold": 2}
                ],
                "preferences": {
                    "crew1": {"submissions": [
                        {"roles": {"specialist": "high", "hand": "medium"},
                         "unavailable_policy": "spawn_as_overflow"}
                    ]}
                },
                "use_round_start": true
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn minimal_snapshot_round_trips_into_inputs() {
        let inputs = minimal().into_inputs().unwrap();
        assert_eq!(inputs.catalog.len(), 2);
        assert_eq!(inputs.pools.len(), 1);
        assert!(inputs.use_round_start);
        assert!(!inputs.params.multi_submission);

        let pool = &inputs.pools[0];
        assert_eq!(
            pool.round_start_slots[&"specialist".parse::<RoleId>().unwrap()],
            Capacity::Finite(1)
        );
        assert_eq!(
            pool.round_start_slots[&"hand".parse::<RoleId>().unwrap()],
            Capacity::Unlimited
        );

        let prefs = &inputs.preferences[&"crew1".parse::<ParticipantId>().unwrap()];
        let sub = prefs.selected_submission().unwrap();
        assert_eq!(sub.unavailable_policy, UnavailablePolicy::SpawnAsOverflow);
        assert!(sub.round_start_eligible);
        assert_eq!(
            sub.role_priorities[&"specialist".parse::<RoleId>().unwrap()],
            PriorityTier::High
        );
    }

    #[test]
    fn duplicate_role_id_is_rejected() {
        let mut snap = minimal();
        snap.roles.push(RoleEntry {
            id: "specialist".into(),
            weight: 5,
            overflow: false,
        });
        let err = snap.into_inputs().unwrap_err();
        assert!(matches!(err, IoError::Snapshot { .. }));
    }

    #[test]
    fn selected_out_of_range_is_rejected() {
        let mut snap = minimal();
        snap.preferences.get_mut("crew1").unwrap().selected = 3;
        let err = snap.into_inputs().unwrap_err();
        assert!(err.to_string().contains("selected index"));
    }

    #[test]
    fn invalid_token_is_rejected() {
        let mut snap = minimal();
        snap.bans
            .insert("bad participant".into(), vec!["specialist".into()]);
        let err = snap.into_inputs().unwrap_err();
        assert!(matches!(err, IoError::Snapshot { .. }));
    }

    #[test]
    fn unknown_roles_in_pools_and_prefs_pass_validation() {
        // The engine treats catalog-missing roles as ineligible, so the
        // loader lets them through.
        let mut snap = minimal();
        snap.pools[0]
            .round_start_slots
            .insert("ghost".into(), Some(1));
        assert!(snap.into_inputs().is_ok());
    }
}
