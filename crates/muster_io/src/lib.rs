//! muster_io — offline snapshot model and loader.
//!
//! One JSON document carries everything a round needs: run parameters, the
//! role catalog, pool slot maps, the ban table, and participant preferences.
//! This crate owns the wire shapes and their validation; the typed inputs it
//! produces are what `muster_pipeline` consumes. No other I/O lives in the
//! engine.

#![forbid(unsafe_code)]

pub mod loader;
pub mod snapshot;

pub use loader::{load_from_path, parse_str};
pub use snapshot::{RoundInputs, RoundSnapshot};

/// Error surface for snapshot reading and validation.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("read: {0}")]
    Read(#[from] std::io::Error),
    #[error("json: {msg}")]
    Json { msg: String },
    #[error("snapshot: {msg}")]
    Snapshot { msg: String },
    #[error("limit: snapshot is {bytes} bytes, max {max}")]
    Limit { bytes: u64, max: u64 },
}
