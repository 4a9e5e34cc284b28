//! Shared pause/stop control flags for in-flight transfers.
//!
//! One [`ControlFlags`] instance is shared by every worker a manager spawns.
//! Workers poll the flags at chunk boundaries, so a flag change is observed
//! within one chunk-read interval. Stop supersedes pause: requesting a stop
//! always clears the pause flag, and the two are never both meaningfully set.

use std::sync::atomic::{AtomicBool, Ordering};

use super::constants::PAUSE_POLL_INTERVAL;

/// Cooperative stop/pause signal shared across all workers of a manager.
///
/// Both flags are plain atomics read by many workers and written by the
/// controlling caller. Eventual visibility is all workers need; a worker may
/// take up to one chunk interval to observe a change.
#[derive(Debug, Default)]
pub struct ControlFlags {
    stop: AtomicBool,
    pause: AtomicBool,
}

impl ControlFlags {
    /// Creates flags with neither stop nor pause set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a global stop. Clears pause so paused workers wake and unwind.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.pause.store(false, Ordering::SeqCst);
    }

    /// Requests a pause of all active transfers. Ignored while stopping.
    pub fn request_pause(&self) {
        if !self.is_stopped() {
            self.pause.store(true, Ordering::SeqCst);
        }
    }

    /// Clears the pause flag, letting paused workers continue.
    pub fn resume(&self) {
        self.pause.store(false, Ordering::SeqCst);
    }

    /// Clears both flags. Called when a new dispatch round starts.
    pub fn reset(&self) {
        self.stop.store(false, Ordering::SeqCst);
        self.pause.store(false, Ordering::SeqCst);
    }

    /// Returns true if a stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Returns true if transfers are paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    /// Sleeps in short intervals while paused, re-checking stop each round.
    ///
    /// Returns once the flags are no longer paused. Callers must re-check
    /// [`is_stopped`](Self::is_stopped) afterwards: a stop request during the
    /// wait clears pause and ends the loop.
    pub async fn wait_while_paused(&self) {
        while self.is_paused() && !self.is_stopped() {
            tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_flags_are_clear() {
        let flags = ControlFlags::new();
        assert!(!flags.is_stopped());
        assert!(!flags.is_paused());
    }

    #[test]
    fn test_stop_supersedes_pause() {
        let flags = ControlFlags::new();
        flags.request_pause();
        assert!(flags.is_paused());

        flags.request_stop();
        assert!(flags.is_stopped());
        assert!(!flags.is_paused(), "stop must clear pause");
    }

    #[test]
    fn test_pause_ignored_while_stopping() {
        let flags = ControlFlags::new();
        flags.request_stop();
        flags.request_pause();
        assert!(!flags.is_paused());
    }

    #[test]
    fn test_resume_clears_pause() {
        let flags = ControlFlags::new();
        flags.request_pause();
        flags.resume();
        assert!(!flags.is_paused());
    }

    #[test]
    fn test_reset_clears_both() {
        let flags = ControlFlags::new();
        flags.request_stop();
        flags.reset();
        assert!(!flags.is_stopped());
        assert!(!flags.is_paused());
    }

    #[tokio::test]
    async fn test_wait_while_paused_returns_immediately_when_not_paused() {
        let flags = ControlFlags::new();
        // Completes without sleeping; a hang here would time the test out.
        flags.wait_while_paused().await;
    }

    #[tokio::test]
    async fn test_wait_while_paused_wakes_on_stop() {
        use std::sync::Arc;

        let flags = Arc::new(ControlFlags::new());
        flags.request_pause();

        let waiter = {
            let flags = Arc::clone(&flags);
            tokio::spawn(async move {
                flags.wait_while_paused().await;
                flags.is_stopped()
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        flags.request_stop();

        let stopped_during_wait = waiter.await.unwrap();
        assert!(stopped_during_wait);
    }
}
