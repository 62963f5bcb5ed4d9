//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Range | Domain    | Description                              |
//! |-------|-----------|------------------------------------------|
//! | 0     | Universal | Success                                  |
//! | 1     | Universal | General error (unspecified)              |
//! | 2     | Universal | CLI usage error (bad args, missing file) |
//! | 3-4   | Universal | IO / parse                               |
//! | 10-19 | reconcile | Reconciliation pipeline codes            |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// IO error - cannot read or write a file.
pub const EXIT_IO: u8 = 3;

/// Parse error - malformed input or configuration.
pub const EXIT_PARSE: u8 = 4;

/// Reconciliation ran but covered only part of the grid; the joined
/// output holds judgements for the covered rows only.
pub const EXIT_RECON_PARTIAL: u8 = 10;
