//! Read-only role catalog.
//!
//! The catalog is a per-call snapshot of the role definitions the allocator
//! consumes: each role carries a fill-order weight (higher fills first) and an
//! overflow flag. Construction also builds the weight → role-set index and the
//! descending weight list the allocation loop walks; both are rebuilt fresh
//! for every allocation call.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::tokens::RoleId;

/// One role definition as supplied by the host catalog.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoleDef {
    /// Organizational fill priority; higher-weight roles are saturated first.
    pub weight: i32,
    /// Designates a fallback destination for the overflow pass.
    pub is_overflow: bool,
}

/// Snapshot of all role definitions plus the derived weight index.
#[derive(Clone, Debug, Default)]
pub struct RoleCatalog {
    roles: BTreeMap<RoleId, RoleDef>,
    by_weight: BTreeMap<i32, BTreeSet<RoleId>>,
    weights_descending: Vec<i32>,
}

impl RoleCatalog {
    /// Build the catalog and its weight index from role definitions.
    /// Later duplicates of a role id overwrite earlier ones.
    pub fn from_roles<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = (RoleId, RoleDef)>,
    {
        let roles: BTreeMap<RoleId, RoleDef> = roles.into_iter().collect();

        let mut by_weight: BTreeMap<i32, BTreeSet<RoleId>> = BTreeMap::new();
        for (id, def) in roles.iter() {
            by_weight.entry(def.weight).or_default().insert(id.clone());
        }

        // BTreeMap iterates ascending; the allocation loop wants highest first.
        let weights_descending: Vec<i32> = by_weight.keys().rev().copied().collect();

        Self {
            roles,
            by_weight,
            weights_descending,
        }
    }

    /// Look up one role definition. Missing ids are treated as ineligible by
    /// callers, never as an error.
    #[inline]
    pub fn role(&self, id: &RoleId) -> Option<&RoleDef> {
        self.roles.get(id)
    }

    /// All distinct role weights, highest first.
    #[inline]
    pub fn weights_descending(&self) -> &[i32] {
        &self.weights_descending
    }

    /// The set of role ids at exactly this weight (empty set if none).
    pub fn roles_at_weight(&self, weight: i32) -> Option<&BTreeSet<RoleId>> {
        self.by_weight.get(&weight)
    }

    /// Whether this role is flagged as an overflow destination.
    /// Unknown roles are not overflow.
    #[inline]
    pub fn is_overflow(&self, id: &RoleId) -> bool {
        self.roles.get(id).map(|d| d.is_overflow).unwrap_or(false)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.roles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn rid(s: &str) -> RoleId {
        RoleId::from_str(s).unwrap()
    }

    fn catalog() -> RoleCatalog {
        RoleCatalog::from_roles([
            (rid("master"), RoleDef { weight: 20, is_overflow: false }),
            (rid("mate"), RoleDef { weight: 10, is_overflow: false }),
            (rid("engineer"), RoleDef { weight: 10, is_overflow: false }),
            (rid("deckhand"), RoleDef { weight: 0, is_overflow: true }),
        ])
    }

    #[test]
    fn weight_index_groups_roles() {
        let cat = catalog();
        assert_eq!(cat.weights_descending(), &[20, 10, 0]);
        let at_ten = cat.roles_at_weight(10).unwrap();
        assert!(at_ten.contains(&rid("mate")) && at_ten.contains(&rid("engineer")));
        assert!(cat.roles_at_weight(5).is_none());
    }

    #[test]
    fn overflow_flag_and_missing_roles() {
        let cat = catalog();
        assert!(cat.is_overflow(&rid("deckhand")));
        assert!(!cat.is_overflow(&rid("master")));
        assert!(!cat.is_overflow(&rid("ghost")));
        assert!(cat.role(&rid("ghost")).is_none());
    }
}
