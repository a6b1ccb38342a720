//! Offline CLI argument surface.
//!
//! Rules:
//! - One required snapshot path; no networked paths (reject any scheme://).
//! - `--seed` overrides the snapshot's lottery seed (decimal u64 or 0x-hex up
//!   to 16 nybbles).
//! - `--validate-only` performs load + snapshot validation without running
//!   the engine.

use clap::Parser;
use std::path::PathBuf;

/// Parsed CLI arguments (raw).
#[derive(Debug, Parser, Clone)]
#[command(
    name = "muster",
    disable_help_subcommand = true,
    about = "Offline, deterministic CLI for the muster allocation engine"
)]
pub struct Args {
    /// Round snapshot JSON path.
    pub snapshot: PathBuf,

    /// Lottery seed override. Accepts decimal u64 or 0x-hex (≤16 hex digits).
    #[arg(long, value_parser = parse_seed)]
    pub seed: Option<u64>,

    /// Validate the snapshot only; do not run the engine.
    #[arg(long)]
    pub validate_only: bool,

    /// Pretty-print the report JSON.
    #[arg(long)]
    pub pretty: bool,

    /// Suppress non-essential stderr logs.
    #[arg(long)]
    pub quiet: bool,
}

/// Errors surfaced by argument validation.
/// Keep messages short/stable (handy for scripts/tests).
#[derive(Debug)]
pub enum CliError {
    BadPath(&'static str),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::BadPath(msg) => write!(f, "bad path: {msg}"),
        }
    }
}

/// Parse and validate the process arguments.
pub fn parse_and_validate() -> Result<Args, CliError> {
    let args = Args::parse();
    validate(&args)?;
    Ok(args)
}

fn validate(args: &Args) -> Result<(), CliError> {
    // Offline-only: refuse anything that smells like a URL.
    if args.snapshot.to_string_lossy().contains("://") {
        return Err(CliError::BadPath("networked paths are not supported"));
    }
    Ok(())
}

/// Seed parser: decimal u64 or 0x-prefixed hex (at most 16 nybbles).
fn parse_seed(s: &str) -> Result<u64, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() || hex.len() > 16 {
            return Err("hex seed must be 1..=16 nybbles".into());
        }
        u64::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<u64>().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_accepts_decimal_and_hex() {
        assert_eq!(parse_seed("42").unwrap(), 42);
        assert_eq!(parse_seed("0xff").unwrap(), 255);
        assert_eq!(parse_seed("0X10").unwrap(), 16);
        assert!(parse_seed("0x").is_err());
        assert!(parse_seed("0x11223344556677889").is_err()); // 17 nybbles
        assert!(parse_seed("nope").is_err());
    }

    #[test]
    fn url_paths_are_rejected() {
        let args = Args {
            snapshot: PathBuf::from("https://example.invalid/round.json"),
            seed: None,
            validate_only: false,
            pretty: false,
            quiet: true,
        };
        assert!(validate(&args).is_err());
    }
}
