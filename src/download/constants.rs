//! Constants for the download module (timeouts, polling intervals).

use std::time::Duration;

/// HTTP connect/headers timeout (10 seconds). The body stream itself has no
/// overall deadline; cancellation is cooperative at chunk granularity.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Timeout for the header-only extension probe (HEAD request).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep interval while a paused worker polls the control flags.
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Epsilon added to elapsed time when computing transfer speed.
pub const SPEED_EPSILON: f64 = 1e-4;
