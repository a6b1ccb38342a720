//! Snapshot loading: bytes → wire model → validated round inputs.
//!
//! Reads are bounded by a hard size limit so a malformed path can't balloon
//! memory; everything past the read is delegated to `snapshot`.

use std::fs;
use std::path::Path;

use crate::snapshot::{RoundInputs, RoundSnapshot};
use crate::IoError;

/// Hard ceiling for snapshot documents. Round snapshots are small; anything
/// near this size is a mistake.
pub const MAX_SNAPSHOT_BYTES: u64 = 16 * 1024 * 1024;

/// Parse a snapshot document from a JSON string.
pub fn parse_str(text: &str) -> Result<RoundInputs, IoError> {
    let snapshot: RoundSnapshot =
        serde_json::from_str(text).map_err(|e| IoError::Json { msg: e.to_string() })?;
    snapshot.into_inputs()
}

/// Load and validate a snapshot file.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<RoundInputs, IoError> {
    let path = path.as_ref();
    let bytes = fs::metadata(path)?.len();
    if bytes > MAX_SNAPSHOT_BYTES {
        return Err(IoError::Limit {
            bytes,
            max: MAX_SNAPSHOT_BYTES,
        });
    }
    let text = fs::read_to_string(path)?;
    parse_str(&text)
}
