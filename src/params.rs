//! Shared constants for the frequency table and advisory loop
//!
//! The table schema values (`MAX_ENTRIES`, `MAX_FILENAME_LENGTH`) are a wire
//! contract with any pre-existing consumer of the shared table and must not
//! change independently of it.

/// Maximum number of unique binaries tracked in the frequency table.
pub const MAX_ENTRIES: usize = 100;

/// Maximum stored name length in bytes, including the NUL terminator.
/// Longer execution paths are truncated to 127 data bytes.
pub const MAX_FILENAME_LENGTH: usize = 128;

/// Counter cap. When any single counter would reach this value on increment,
/// every counter in the table is reset to zero instead (a fresh epoch).
pub const MAX_VALUE: u64 = 500;

/// Directory prefix that qualifies an executed path for tracking.
pub const BIN_PATH: &[u8] = b"/usr/bin/";

/// Number of top-ranked binaries advised for prefetch each round.
pub const MAX_NUM_BINS_PRF: usize = 4;

/// Default polling period of the advisory loop, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u16 = 300;
