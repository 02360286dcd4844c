//! CLI Exit Code Registry
//!
//! Single source of truth for `pricecheck` exit codes. Scripts and
//! schedulers rely on them, so codes are never reused.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain      | Description                              |
//! |---------|-------------|------------------------------------------|
//! | 0       | Universal   | Success                                  |
//! | 1       | Universal   | General error (unspecified)              |
//! | 2       | Universal   | CLI usage error (bad args, missing file) |
//! | 60-69   | recon       | Reconciliation run codes                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse failures.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (60-69)
// =============================================================================

/// Config file unreadable, unparseable or failing validation. Also used for
/// an invalid currency dictionary or static rate file.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 60;

/// A source table could not be loaded (missing file, bad sheet, no header).
pub const EXIT_RECON_SOURCE: u8 = 61;

/// The run itself failed (missing mapped column, duplicate join key) or an
/// output file could not be written.
pub const EXIT_RECON_RUNTIME: u8 = 62;

/// `--strict` only: the run completed but reported unmapped currencies or
/// failed exchange-rate lookups. Outputs are still written.
pub const EXIT_RECON_GAPS: u8 = 63;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &pricecheck_recon::ReconError) -> u8 {
    use pricecheck_recon::ReconError;
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) | ReconError::Io(_) => {
            EXIT_RECON_INVALID_CONFIG
        }
        ReconError::MissingColumn { .. } | ReconError::DuplicateKey { .. } => EXIT_RECON_RUNTIME,
    }
}
