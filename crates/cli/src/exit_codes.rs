//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract: schedulers rely on them.
//!
//! | Code | Description                                              |
//! |------|----------------------------------------------------------|
//! | 0    | Run completed (individual folders may still have failed) |
//! | 1    | Fatal error: configuration, store, or logging setup      |
//! | 2    | CLI usage error (bad arguments)                          |
//!
//! Per-folder outcomes are reported in the run summary and the log, never
//! through the exit code.

/// Success - command completed.
pub const EXIT_SUCCESS: u8 = 0;

/// Fatal error before or outside the run.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse errors.
pub const EXIT_USAGE: u8 = 2;
