//! Batchget Core Library
//!
//! This library implements a concurrent multi-file download engine: given a
//! set of URLs it downloads each to local storage, tracks per-item progress
//! and speed, supports global pause/resume/stop, and resolves save filenames
//! from the URL, an assigned name, or a sequential batch-naming scheme.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - queue, worker pool, streaming transfers, control flags
//! - [`naming`] - filename and extension resolution, numbered batch URLs
//! - [`extract`] - external media-extraction tool integration
//!
//! Callers enqueue pre-named [`WorkItem`]s into a [`DownloadManager`],
//! call [`DownloadManager::start`], and poll
//! [`DownloadManager::snapshot`] to observe progress and drained results.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod extract;
pub mod naming;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use download::{
    ActiveRecord, ControlFlags, DEFAULT_POOL_SIZE, DownloadManager, HttpClient, ManagerError,
    ResultRecord, StartOptions, StatusSnapshot, TransferError, TransferKind, TransferStatus,
    WorkItem, format_size, format_speed,
};
pub use extract::{Quality, is_media_url};
pub use naming::{BatchError, FilenameResolver, filename_from_url, generate_numbered_urls};
