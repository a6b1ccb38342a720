//! Per-pool access-level flags derived from final assignment counts.
//!
//! A pool whose seated headcount is at or below its configured threshold runs
//! on reduced access. Pure derived computation; callers log and publish it.

use alloc::collections::BTreeMap;

use muster_core::PoolId;

use crate::PoolDef;

/// `reduced_access = assigned_count <= threshold`, one entry per pool.
/// Pools with no entry in `counts` are treated as empty.
pub fn derive_access_flags(
    pools: &[PoolDef],
    counts: &BTreeMap<PoolId, u32>,
) -> BTreeMap<PoolId, bool> {
    pools
        .iter()
        .map(|pool| {
            let count = counts.get(&pool.id).copied().unwrap_or(0);
            (pool.id.clone(), count <= pool.reduced_access_threshold)
        })
        .collect()
}
