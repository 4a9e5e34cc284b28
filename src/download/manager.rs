//! Download manager: work queue, bounded worker pool, and status snapshots.
//!
//! The manager owns the pending FIFO queue, the map of in-flight transfers,
//! and the drained completed/failed result logs. A `start()` call spawns a
//! dispatch task that feeds queued items into a semaphore-bounded pool of
//! transfer tasks; the caller polls `snapshot()` to observe progress and
//! steers all workers at once through `pause`/`resume`/`stop_all`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use super::control::ControlFlags;
use super::item::{TransferKind, WorkItem};
use super::status::{ActiveRecord, ResultRecord, StatusSnapshot, TransferStatus};
use super::worker;
use crate::extract::{self, Quality};

/// Minimum allowed worker pool size.
const MIN_POOL_SIZE: usize = 1;

/// Maximum allowed worker pool size.
const MAX_POOL_SIZE: usize = 100;

/// Default worker pool size. Deliberately small: unbounded concurrent
/// connections to arbitrary hosts invite server-side throttling.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Error type for manager construction.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// Invalid worker pool size provided.
    #[error("invalid worker pool size {value}: must be between {MIN_POOL_SIZE} and {MAX_POOL_SIZE}")]
    InvalidPoolSize {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Per-batch options injected into `start()`.
///
/// Carries configuration that used to live in UI state; passing it here
/// keeps the manager free of back-references to its caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    /// Quality selector forwarded to the external extraction tool.
    pub quality: Quality,
}

/// Concurrent multi-file download manager.
///
/// Cheap to clone; clones share the same queue, pool, and result logs. A
/// "clear all" is expressed by dropping the manager and constructing a fresh
/// one, which guarantees no stale records leak across sessions.
///
/// # Concurrency model
///
/// - `start()` spawns one dispatch task per call; each transfer runs in its
///   own Tokio task holding a semaphore permit (RAII release).
/// - The `active` map has a single writer per key: only the worker that owns
///   a URL mutates its record. Map-level insert/remove is synchronized by
///   the map itself.
/// - Completed/failed logs are mutex-guarded vectors, drained by
///   `snapshot()` so every result is observed exactly once.
#[derive(Debug, Clone)]
pub struct DownloadManager {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    queue: Mutex<VecDeque<WorkItem>>,
    active: DashMap<String, ActiveRecord>,
    completed: Mutex<Vec<ResultRecord>>,
    failed: Mutex<Vec<ResultRecord>>,
    flags: ControlFlags,
    semaphore: Arc<Semaphore>,
    pool_size: usize,
    client: HttpClient,
}

/// Locks a mutex, recovering the guard if a worker panicked mid-append.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DownloadManager {
    /// Creates a manager with the given worker pool size and a default
    /// HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidPoolSize`] if the value is outside
    /// 1..=100.
    pub fn new(pool_size: usize) -> Result<Self, ManagerError> {
        Self::with_client(pool_size, HttpClient::new())
    }

    /// Creates a manager with an explicit HTTP client (shared pool reuse,
    /// or a short-timeout client in tests).
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidPoolSize`] if the value is outside
    /// 1..=100.
    #[instrument(level = "debug", skip(client))]
    pub fn with_client(pool_size: usize, client: HttpClient) -> Result<Self, ManagerError> {
        if !(MIN_POOL_SIZE..=MAX_POOL_SIZE).contains(&pool_size) {
            return Err(ManagerError::InvalidPoolSize { value: pool_size });
        }

        debug!(pool_size, "creating download manager");

        Ok(Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                active: DashMap::new(),
                completed: Mutex::new(Vec::new()),
                failed: Mutex::new(Vec::new()),
                flags: ControlFlags::new(),
                semaphore: Arc::new(Semaphore::new(pool_size)),
                pool_size,
                client,
            }),
        })
    }

    /// Returns the configured worker pool size.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.inner.pool_size
    }

    /// Appends work items to the queue in order. No deduplication; FIFO is
    /// the dispatch-order contract.
    pub fn enqueue(&self, items: impl IntoIterator<Item = WorkItem>) {
        let mut queue = lock(&self.inner.queue);
        for item in items {
            debug!(url = %item.url, filename = %item.filename, kind = item.kind.as_str(), "enqueued");
            queue.push_back(item);
        }
    }

    /// Returns the number of items still waiting for dispatch.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        lock(&self.inner.queue).len()
    }

    /// Returns true if any transfer is currently in flight.
    #[must_use]
    pub fn has_active(&self) -> bool {
        !self.inner.active.is_empty()
    }

    /// Pauses all active workers cooperatively.
    pub fn pause(&self) {
        info!("pause requested");
        self.inner.flags.request_pause();
    }

    /// Resumes paused workers.
    pub fn resume(&self) {
        info!("resume requested");
        self.inner.flags.resume();
    }

    /// Stops everything: sets the stop flag (clearing pause) so every active
    /// worker unwinds within one chunk interval, deleting its partial file.
    pub fn stop_all(&self) {
        info!("stop requested for all transfers");
        self.inner.flags.request_stop();
    }

    /// Returns true if transfers are paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.flags.is_paused()
    }

    /// Returns true if a global stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.flags.is_stopped()
    }

    /// Starts dispatching queued items into the worker pool.
    ///
    /// Clears the stop/pause flags, then spawns a dispatch task that
    /// dequeues items one at a time and submits each to the pool until the
    /// queue is empty or a stop is observed mid-loop. Submission is
    /// fire-and-forget for the caller; the returned handle resolves when
    /// every transfer dispatched by *this* call has reached a terminal
    /// state, and may simply be dropped.
    ///
    /// Safe to call while transfers from a previous `start()` are still
    /// active ("add more, start again").
    #[instrument(level = "debug", skip(self))]
    pub fn start(&self, options: StartOptions) -> JoinHandle<()> {
        self.inner.flags.reset();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(dispatch_loop(inner, options))
    }

    /// Returns a snapshot for the status reporter.
    ///
    /// `active` is copied; `completed` and `failed` are drained, so each
    /// result is reported exactly once across successive snapshots.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            active: self
                .inner
                .active
                .iter()
                .map(|entry| entry.value().clone())
                .collect(),
            completed: std::mem::take(&mut *lock(&self.inner.completed)),
            failed: std::mem::take(&mut *lock(&self.inner.failed)),
        }
    }
}

/// Dequeues items and submits them to the pool until drained or stopped.
async fn dispatch_loop(inner: Arc<Inner>, options: StartOptions) {
    info!("starting queue dispatch");
    let mut handles = Vec::new();

    loop {
        if inner.flags.is_stopped() {
            debug!("stop observed, aborting dispatch");
            break;
        }

        let Some(item) = lock(&inner.queue).pop_front() else {
            break;
        };

        // Blocks only when the pool is saturated; the dispatch task itself
        // runs off the caller's path, so the caller never waits here.
        let permit = match Arc::clone(&inner.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("worker pool semaphore closed, aborting dispatch");
                break;
            }
        };

        debug!(url = %item.url, kind = item.kind.as_str(), "dispatching transfer");
        let task_inner = Arc::clone(&inner);
        handles.push(tokio::spawn(async move {
            // Permit released when this task exits (RAII).
            let _permit = permit;

            let record = match item.kind {
                TransferKind::Http => {
                    worker::transfer(
                        &task_inner.client,
                        &item,
                        &task_inner.flags,
                        &task_inner.active,
                    )
                    .await
                }
                TransferKind::Extractor => {
                    extract::run_extraction(
                        &item,
                        options.quality,
                        &task_inner.flags,
                        &task_inner.active,
                    )
                    .await
                }
            };

            route_result(&task_inner, record);
        }));
    }

    debug!(task_count = handles.len(), "waiting for transfers to finish");
    for handle in handles {
        if let Err(error) = handle.await {
            warn!(%error, "transfer task panicked");
        }
    }

    info!("queue dispatch complete");
}

/// Appends a terminal record to the list its status belongs in.
///
/// Stopped outcomes are transient: the record leaving the active map while
/// the stop flag is set is their observable effect.
fn route_result(inner: &Inner, record: ResultRecord) {
    match record.status {
        TransferStatus::Completed | TransferStatus::Exists => {
            info!(url = %record.url, status = %record.status, size = record.size_bytes, "transfer finished");
            lock(&inner.completed).push(record);
        }
        TransferStatus::Failed => {
            warn!(url = %record.url, error = record.error.as_deref().unwrap_or(""), "transfer failed");
            lock(&inner.failed).push(record);
        }
        TransferStatus::Stopped => {
            debug!(url = %record.url, "transfer stopped by user");
        }
    }
}
