//! muster — run one allocation round from a snapshot file and print the
//! report JSON on stdout. Exit codes are stable for harnesses: 0 ok,
//! 2 validation, 4 io, 5 engine.

mod args;

mod exitcodes {
    pub const OK: i32 = 0;
    pub const VALIDATION: i32 = 2;
    pub const IO: i32 = 4;
    pub const ENGINE: i32 = 5;
}

use std::process::ExitCode;

use args::{parse_and_validate as parse_cli, Args};

use muster_io::IoError;
use muster_pipeline::{run_round, PipelineError, RoundReportDoc};

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Snapshot shape/domain failures.
    Validation(String),
    /// Read/path/limit failures.
    Io(String),
    /// Engine-level failures (allocation contract).
    Engine(String),
}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("muster: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION as u8);
        }
    };

    if !args.quiet {
        // Stderr only; stdout is reserved for the report document.
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let rc = match run_once(&args) {
        Ok(()) => exitcodes::OK,
        Err(e) => {
            let (code, msg) = match &e {
                MainError::Validation(m) => (exitcodes::VALIDATION, m),
                MainError::Io(m) => (exitcodes::IO, m),
                MainError::Engine(m) => (exitcodes::ENGINE, m),
            };
            eprintln!("muster: error: {msg}");
            code
        }
    };

    ExitCode::from(rc as u8)
}

/// Load → (optional seed override) → run → print.
fn run_once(args: &Args) -> Result<(), MainError> {
    let mut inputs = muster_io::load_from_path(&args.snapshot).map_err(map_io_err)?;

    if args.validate_only {
        if !args.quiet {
            eprintln!("validate-only: snapshot OK");
        }
        return Ok(());
    }

    if let Some(seed) = args.seed {
        inputs.params.lottery_seed = seed;
    }

    let outcome = run_round(&inputs).map_err(|e| match e {
        PipelineError::Io(m) => MainError::Io(m),
        PipelineError::Allocate(m) => MainError::Engine(m),
    })?;

    let doc = RoundReportDoc::from_outcome(&outcome, inputs.params.lottery_seed);
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&doc)
    } else {
        serde_json::to_string(&doc)
    }
    .map_err(|e| MainError::Engine(e.to_string()))?;

    println!("{rendered}");
    Ok(())
}

fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Read(_) | IoError::Limit { .. } => MainError::Io(e.to_string()),
        IoError::Json { .. } | IoError::Snapshot { .. } => MainError::Validation(e.to_string()),
    }
}
