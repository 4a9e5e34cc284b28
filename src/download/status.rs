//! Progress and result records plus the snapshot view consumed by reporters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal state of a finished transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Downloaded to completion.
    Completed,
    /// HTTP, network, disk, or extractor failure.
    Failed,
    /// Unwound after a global stop request.
    Stopped,
    /// Target file already existed; nothing was transferred.
    Exists,
}

impl TransferStatus {
    /// Returns the canonical string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
            Self::Exists => "exists",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Live progress state for one in-flight transfer.
///
/// Keyed by URL in the manager's active map; at most one record per URL
/// exists at any time, and only the worker owning the transfer mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRecord {
    /// The URL being transferred.
    pub url: String,
    /// Destination filename. The extractor path may rewrite this once the
    /// tool reports its actual output file.
    pub filename: String,
    /// Declared total size in bytes; 0 when the server did not say.
    pub total_bytes: u64,
    /// Bytes written so far.
    pub downloaded_bytes: u64,
    /// Percent complete; 0 while the total is unknown (indeterminate).
    pub progress_percent: f64,
    /// Current average transfer speed in bytes per second.
    pub speed_bps: f64,
}

impl ActiveRecord {
    /// Creates a fresh record for a transfer that is about to start.
    #[must_use]
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            total_bytes: 0,
            downloaded_bytes: 0,
            progress_percent: 0.0,
            speed_bps: 0.0,
        }
    }
}

/// Terminal outcome of a finished transfer, produced exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Which terminal state was reached.
    pub status: TransferStatus,
    /// The transferred URL.
    pub url: String,
    /// Final filename (for the extractor path, the name the tool chose).
    pub filename: String,
    /// Final size in bytes (0 for failed/stopped outcomes).
    pub size_bytes: u64,
    /// Wall-clock seconds from transfer start to the terminal state.
    pub elapsed_secs: f64,
    /// Human-readable error message for failed outcomes.
    pub error: Option<String>,
}

impl ResultRecord {
    /// Creates a completed result.
    #[must_use]
    pub fn completed(
        url: impl Into<String>,
        filename: impl Into<String>,
        size_bytes: u64,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            status: TransferStatus::Completed,
            url: url.into(),
            filename: filename.into(),
            size_bytes,
            elapsed_secs,
            error: None,
        }
    }

    /// Creates a failed result carrying a human-readable message.
    #[must_use]
    pub fn failed(
        url: impl Into<String>,
        filename: impl Into<String>,
        error: impl Into<String>,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            status: TransferStatus::Failed,
            url: url.into(),
            filename: filename.into(),
            size_bytes: 0,
            elapsed_secs,
            error: Some(error.into()),
        }
    }

    /// Creates a stopped result (cooperative cancellation, not a failure).
    #[must_use]
    pub fn stopped(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            status: TransferStatus::Stopped,
            url: url.into(),
            filename: filename.into(),
            size_bytes: 0,
            elapsed_secs: 0.0,
            error: None,
        }
    }

    /// Creates an exists result for an idempotent re-run short-circuit.
    #[must_use]
    pub fn exists(url: impl Into<String>, filename: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            status: TransferStatus::Exists,
            url: url.into(),
            filename: filename.into(),
            size_bytes,
            elapsed_secs: 0.0,
            error: None,
        }
    }
}

/// Point-in-time view of manager state for a status reporter.
///
/// `active` is a copy of the live records; `completed` and `failed` are
/// drained from the manager, so each result appears in exactly one snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// In-flight transfers at snapshot time.
    pub active: Vec<ActiveRecord>,
    /// Completed and already-existing results since the last snapshot.
    pub completed: Vec<ResultRecord>,
    /// Failed results since the last snapshot.
    pub failed: Vec<ResultRecord>,
}

impl StatusSnapshot {
    /// Returns true if the snapshot carries no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.completed.is_empty() && self.failed.is_empty()
    }
}

/// Formats a byte count with binary units, one decimal place.
///
/// Presentation only; stored byte counts are never rounded.
#[must_use]
pub fn format_size(size_bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    if size_bytes == 0 {
        return "0B".to_string();
    }

    #[allow(clippy::cast_precision_loss)]
    let bytes = size_bytes as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let exponent = (bytes.log(1024.0).floor() as usize).min(UNITS.len() - 1);
    #[allow(clippy::cast_possible_truncation)]
    let value = bytes / 1024_f64.powi(exponent as i32);
    let rounded = (value * 10.0).round() / 10.0;
    format!("{rounded}{}", UNITS[exponent])
}

/// Formats a transfer speed as size-per-second.
#[must_use]
pub fn format_speed(speed_bps: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bytes = speed_bps.max(0.0) as u64;
    format!("{}/s", format_size(bytes))
}
