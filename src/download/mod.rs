//! Concurrent download engine: queue, worker pool, and control protocol.
//!
//! This module family implements the core of the crate:
//!
//! - [`DownloadManager`] owns the pending queue, the bounded worker pool,
//!   and the result logs, and exposes the enqueue/start/pause/stop surface.
//! - The transfer worker streams one URL to one file with cooperative
//!   stop/pause checkpoints at chunk granularity.
//! - [`HttpClient`] wraps reqwest for streaming GETs and header probes.
//! - Status types ([`ActiveRecord`], [`ResultRecord`], [`StatusSnapshot`])
//!   are what reporters consume.
//!
//! Per-URL failures are isolated: one URL failing never aborts siblings.

mod client;
pub mod constants;
mod control;
mod error;
mod item;
mod manager;
mod status;
pub(crate) mod worker;

pub use client::HttpClient;
pub use control::ControlFlags;
pub use error::TransferError;
pub use item::{TransferKind, WorkItem};
pub use manager::{DEFAULT_POOL_SIZE, DownloadManager, ManagerError, StartOptions};
pub use status::{
    ActiveRecord, ResultRecord, StatusSnapshot, TransferStatus, format_size, format_speed,
};
