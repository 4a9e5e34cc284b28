//! Streaming transfer worker: one URL to one file.
//!
//! Implements the per-item state machine `queued → active → {completed |
//! failed | stopped | exists}`. All suspension points live inside the chunk
//! loop, so a stop or pause request is observed within one chunk interval.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};

use super::client::HttpClient;
use super::constants::SPEED_EPSILON;
use super::control::ControlFlags;
use super::error::TransferError;
use super::item::WorkItem;
use super::status::{ActiveRecord, ResultRecord};

/// Inserts an active record for `url`, enforcing at most one per URL.
///
/// Returns false when a transfer for the same URL is already in flight; the
/// caller must record a failure instead of starting a second transfer.
pub(crate) fn register_active(
    active: &DashMap<String, ActiveRecord>,
    url: &str,
    filename: &str,
) -> bool {
    match active.entry(url.to_string()) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(ActiveRecord::new(url, filename));
            true
        }
    }
}

/// Message recorded when a duplicate URL is dispatched while active.
pub(crate) const ALREADY_IN_FLIGHT: &str = "transfer already in flight for this URL";

/// Internal outcome of the streaming loop.
enum StreamOutcome {
    /// Body fully written; carries bytes written and the declared total.
    Finished { bytes_written: u64, declared: u64 },
    /// Stop flag observed; partial file already needs cleanup.
    Stopped,
}

/// Performs one URL→file transfer, returning its terminal record.
///
/// - Existing target file: returns `exists` with zero network traffic and
///   zero writes.
/// - Stop flag: deletes the partial file, returns `stopped`.
/// - Any error: deletes the partial file, returns `failed` with a
///   human-readable message.
/// - Success: returns `completed`; the size falls back to bytes written when
///   the server declared no Content-Length.
#[instrument(level = "debug", skip(client, flags, active), fields(url = %item.url, filename = %item.filename))]
pub(crate) async fn transfer(
    client: &HttpClient,
    item: &WorkItem,
    flags: &ControlFlags,
    active: &DashMap<String, ActiveRecord>,
) -> ResultRecord {
    let target = item.dest_dir.join(&item.filename);

    if target.exists() {
        debug!(path = %target.display(), "target already exists, skipping transfer");
        let size = std::fs::metadata(&target).map(|meta| meta.len()).unwrap_or(0);
        return ResultRecord::exists(&item.url, &item.filename, size);
    }

    if !register_active(active, &item.url, &item.filename) {
        warn!(url = %item.url, "duplicate dispatch for active URL");
        return ResultRecord::failed(&item.url, &item.filename, ALREADY_IN_FLIGHT, 0.0);
    }

    let started = Instant::now();
    let outcome = stream_to_disk(client, item, &target, flags, active, started).await;
    active.remove(&item.url);
    let elapsed = started.elapsed().as_secs_f64();

    match outcome {
        Ok(StreamOutcome::Finished {
            bytes_written,
            declared,
        }) => {
            let size = if declared > 0 { declared } else { bytes_written };
            ResultRecord::completed(&item.url, &item.filename, size, elapsed)
        }
        Ok(StreamOutcome::Stopped) => {
            remove_partial(&target).await;
            ResultRecord::stopped(&item.url, &item.filename)
        }
        Err(error) => {
            remove_partial(&target).await;
            ResultRecord::failed(&item.url, &item.filename, error.to_string(), elapsed)
        }
    }
}

/// Streams the response body to `target`, updating the active record after
/// every chunk and honoring the control flags between chunks.
async fn stream_to_disk(
    client: &HttpClient,
    item: &WorkItem,
    target: &Path,
    flags: &ControlFlags,
    active: &DashMap<String, ActiveRecord>,
    started: Instant,
) -> Result<StreamOutcome, TransferError> {
    if flags.is_stopped() {
        return Ok(StreamOutcome::Stopped);
    }

    let response = client.get_stream(&item.url).await?;
    let declared = response.content_length().unwrap_or(0);
    if let Some(mut record) = active.get_mut(&item.url) {
        record.total_bytes = declared;
    }

    let file = File::create(target)
        .await
        .map_err(|e| TransferError::io(target, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    loop {
        if flags.is_stopped() {
            return Ok(StreamOutcome::Stopped);
        }
        if flags.is_paused() {
            flags.wait_while_paused().await;
            if flags.is_stopped() {
                return Ok(StreamOutcome::Stopped);
            }
        }

        let Some(chunk_result) = stream.next().await else {
            break;
        };
        let chunk = chunk_result.map_err(|e| TransferError::network(&item.url, e))?;
        if chunk.is_empty() {
            continue;
        }

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| TransferError::io(target, e))?;
        bytes_written += chunk.len() as u64;

        if let Some(mut record) = active.get_mut(&item.url) {
            record.downloaded_bytes = bytes_written;
            let elapsed = started.elapsed().as_secs_f64();
            #[allow(clippy::cast_precision_loss)]
            {
                record.speed_bps = bytes_written as f64 / (elapsed + SPEED_EPSILON);
                record.progress_percent = if declared > 0 {
                    bytes_written as f64 / declared as f64 * 100.0
                } else {
                    0.0
                };
            }
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| TransferError::io(target, e))?;

    Ok(StreamOutcome::Finished {
        bytes_written,
        declared,
    })
}

/// Best-effort removal of a partial file. A failed delete is logged, never
/// escalated.
async fn remove_partial(target: &Path) {
    if let Err(error) = tokio::fs::remove_file(target).await {
        if error.kind() != ErrorKind::NotFound {
            warn!(path = %target.display(), %error, "failed to remove partial file");
        }
    } else {
        debug!(path = %target.display(), "removed partial file");
    }
}
