//! Work item types for the download queue.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::extract::is_media_url;

/// Which transfer path handles a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    /// Direct streaming HTTP download.
    Http,
    /// Delegated to the external media extraction tool.
    Extractor,
}

impl TransferKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Extractor => "extractor",
        }
    }
}

/// One queued (URL, filename, destination) tuple awaiting transfer.
///
/// Immutable once created; consumed exactly once by a worker. Filenames are
/// resolved before enqueue, so workers never consult the resolver.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Source URL.
    pub url: String,
    /// Pre-resolved destination filename.
    pub filename: String,
    /// Directory the file is saved into. The caller is responsible for
    /// creating it before enqueue.
    pub dest_dir: PathBuf,
    /// Transfer path for this item.
    pub kind: TransferKind,
}

impl WorkItem {
    /// Creates a work item with an explicit transfer kind.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        filename: impl Into<String>,
        dest_dir: impl Into<PathBuf>,
        kind: TransferKind,
    ) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            dest_dir: dest_dir.into(),
            kind,
        }
    }

    /// Creates a work item, picking the transfer kind from the URL host.
    #[must_use]
    pub fn detect(
        url: impl Into<String>,
        filename: impl Into<String>,
        dest_dir: impl Into<PathBuf>,
    ) -> Self {
        let url = url.into();
        let kind = if is_media_url(&url) {
            TransferKind::Extractor
        } else {
            TransferKind::Http
        };
        Self::new(url, filename, dest_dir, kind)
    }
}
