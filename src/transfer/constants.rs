//! Constants for the transfer engine (timeouts, progress).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default deadline for a whole transfer (5 minutes for large videos).
pub const TRANSFER_DEADLINE_SECS: u64 = 300;

/// Percentage reported once every byte of a known-length body has arrived.
pub const COMPLETE_PERCENT: f64 = 100.0;
