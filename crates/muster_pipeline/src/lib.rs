//! muster_pipeline — deterministic round orchestration
//! (load → merge → allocate → overflow → access flags → report).
//!
//! This crate stays I/O-free apart from delegating snapshot loading to
//! `muster_io`; all algorithmic work lives in `muster_algo`. One call to
//! [`run_round`] consumes one input snapshot and produces one
//! [`RoundOutcome`]: a complete participant → placement map, per-pool
//! assignment counts and reduced-access flags, and the lottery echo (seed,
//! words consumed, logged tie decisions) that makes a run auditable.

use std::collections::BTreeMap;

use muster_algo::{
    allocate, assign_overflow, derive_access_flags, AllocError, AllocationResult,
    CandidateObserver, NullObserver,
};
use muster_core::rng::{LotteryCrumb, SeededLottery};
use muster_core::{ParticipantId, PoolId};
use muster_io::{IoError, RoundInputs};

/// Everything one round produced.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    /// One entry per input participant, assigned or explicitly not.
    pub placements: AllocationResult,
    /// Seated headcount per pool.
    pub assigned_counts: BTreeMap<PoolId, u32>,
    /// Per-pool reduced-access flag (headcount at or below threshold).
    pub reduced_access: BTreeMap<PoolId, bool>,
    /// Total 64-bit lottery words drawn; data-dependent, echoed for audits.
    pub lottery_words_consumed: u128,
    /// Named random decisions (High tie-breaks, shortfall pool picks).
    pub tie_log: Vec<LotteryCrumb>,
}

/// Single error surface for the round orchestration.
#[derive(Debug)]
pub enum PipelineError {
    Io(String),
    Allocate(String),
}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        PipelineError::Io(e.to_string())
    }
}

impl From<AllocError> for PipelineError {
    fn from(e: AllocError) -> Self {
        PipelineError::Allocate(e.to_string())
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Io(msg) => write!(f, "io: {msg}"),
            PipelineError::Allocate(msg) => write!(f, "allocate: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

// -------------------------------------- Public API --------------------------------------

/// Run one allocation round over validated inputs.
pub fn run_round(inputs: &RoundInputs) -> Result<RoundOutcome, PipelineError> {
    run_round_observed(inputs, &mut NullObserver)
}

/// Like [`run_round`], with an eligibility observer threaded through for
/// late-rule observation points.
pub fn run_round_observed<O: CandidateObserver>(
    inputs: &RoundInputs,
    observer: &mut O,
) -> Result<RoundOutcome, PipelineError> {
    let mut lottery = SeededLottery::from_seed_u64(inputs.params.lottery_seed);

    let mut placements = allocate(
        &inputs.catalog,
        &inputs.bans,
        observer,
        &mut lottery,
        &inputs.params,
        &inputs.preferences,
        &inputs.pools,
        inputs.use_round_start,
    )?;

    let everyone: Vec<ParticipantId> = inputs.preferences.keys().cloned().collect();
    assign_overflow(
        &inputs.catalog,
        &mut lottery,
        &inputs.params,
        &mut placements,
        &everyone,
        &inputs.preferences,
        &inputs.pools,
        inputs.use_round_start,
    );

    // Contract: exactly one entry per input participant once overflow ran.
    debug_assert_eq!(placements.len(), inputs.preferences.len());

    let assigned_counts = count_assignments(&placements, &inputs.pools);
    let reduced_access = derive_access_flags(&inputs.pools, &assigned_counts);
    for (pool, reduced) in &reduced_access {
        tracing::debug!(pool = %pool, reduced_access = *reduced, "pool access level");
    }

    let unassigned = placements.values().filter(|p| !p.is_assigned()).count();
    tracing::debug!(
        participants = placements.len(),
        unassigned,
        words = %lottery.words_consumed(),
        "round complete"
    );

    Ok(RoundOutcome {
        placements,
        assigned_counts,
        reduced_access,
        lottery_words_consumed: lottery.words_consumed(),
        tie_log: lottery.take_crumbs(),
    })
}

/// Convenience entry: load a snapshot file via `muster_io`, then run.
pub fn run_from_snapshot_path<P: AsRef<std::path::Path>>(
    path: P,
) -> Result<RoundOutcome, PipelineError> {
    let inputs = muster_io::load_from_path(path)?;
    run_round(&inputs)
}

/// Tally seated participants per pool. A placement naming a pool missing
/// from the input set is a contract violation.
fn count_assignments(
    placements: &AllocationResult,
    pools: &[muster_algo::PoolDef],
) -> BTreeMap<PoolId, u32> {
    let mut counts: BTreeMap<PoolId, u32> = BTreeMap::new();
    for placement in placements.values() {
        let Some(pool) = &placement.pool else {
            continue;
        };
        debug_assert!(
            pools.iter().any(|p| &p.id == pool),
            "placement names unknown pool {pool}"
        );
        *counts.entry(pool.clone()).or_insert(0) += 1;
    }
    counts
}

// ---------------------------- Report document (wire shape) ----------------------------
// Minimal typed mirror of the outcome for presentation layers; ids flatten to
// strings so the document serializes without core types on the other side.

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RoundReportDoc {
    pub placements: BTreeMap<String, PlacementDoc>,
    pub pools: BTreeMap<String, PoolReportDoc>,
    pub lottery: LotteryEchoDoc,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlacementDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<usize>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PoolReportDoc {
    pub assigned: u32,
    pub reduced_access: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LotteryEchoDoc {
    pub seed: u64,
    pub words_consumed: String, // u128 as decimal string for wire stability
    pub ties: Vec<TieDoc>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TieDoc {
    pub ctx: String,
    pub pick: usize,
}

impl RoundReportDoc {
    /// Flatten an outcome (plus the seed that produced it) into wire form.
    pub fn from_outcome(outcome: &RoundOutcome, seed: u64) -> Self {
        let placements = outcome
            .placements
            .iter()
            .map(|(p, placement)| {
                (
                    p.to_string(),
                    PlacementDoc {
                        role: placement.role.as_ref().map(|r| r.to_string()),
                        pool: placement.pool.as_ref().map(|p| p.to_string()),
                        submission: placement.submission,
                    },
                )
            })
            .collect();

        let pools = outcome
            .reduced_access
            .iter()
            .map(|(pool, &reduced)| {
                (
                    pool.to_string(),
                    PoolReportDoc {
                        assigned: outcome.assigned_counts.get(pool).copied().unwrap_or(0),
                        reduced_access: reduced,
                    },
                )
            })
            .collect();

        let ties = outcome
            .tie_log
            .iter()
            .map(|crumb| TieDoc {
                ctx: crumb.ctx.to_string(),
                pick: crumb.pick,
            })
            .collect();

        Self {
            placements,
            pools,
            lottery: LotteryEchoDoc {
                seed,
                words_consumed: outcome.lottery_words_consumed.to_string(),
                ties,
            },
        }
    }
}
