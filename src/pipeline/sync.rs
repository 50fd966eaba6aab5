//! CPU-visible synchronization primitives shared with the backend.
//!
//! A [`Fence`] is the single correctness gate for frame-slot reuse: the
//! backend signals it when the GPU work of a submission completes, and the
//! pipeline waits on it before touching that slot's resources again.
//! [`Semaphore`]s order GPU-side work (image acquire, submit, present);
//! the CPU never waits on them, so on this side they are just identities
//! the backend can key queue dependencies on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a non-blocking fence query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    /// The gated submission has completed.
    Signaled,
    /// The gated submission is still in flight.
    Unsignaled,
}

/// Binary CPU/GPU fence.
///
/// Cloning shares the underlying state; the backend holds a clone to
/// signal on completion while the pipeline holds its own for waiting.
#[derive(Debug, Clone)]
pub struct Fence {
    signaled: Arc<AtomicBool>,
    id: u64,
}

impl Fence {
    pub(crate) fn new(id: u64, signaled: bool) -> Self {
        Self {
            signaled: Arc::new(AtomicBool::new(signaled)),
            id,
        }
    }

    /// Identity for diagnostics.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mark the fence signaled. Called by the backend on completion.
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    /// Return the fence to the unsignaled state before reuse.
    pub fn reset(&self) {
        self.signaled.store(false, Ordering::Release);
    }

    /// Non-blocking query.
    pub fn status(&self) -> FenceStatus {
        if self.signaled.load(Ordering::Acquire) {
            FenceStatus::Signaled
        } else {
            FenceStatus::Unsignaled
        }
    }

    /// Block until signaled or `timeout` elapses. Returns `true` if the
    /// fence was observed signaled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.status() == FenceStatus::Signaled {
                return true;
            }
            if Instant::now() >= deadline {
                return self.status() == FenceStatus::Signaled;
            }
            std::thread::yield_now();
        }
    }
}

/// GPU-side ordering primitive. Opaque to the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Semaphore {
    id: u64,
}

impl Semaphore {
    pub(crate) fn new(id: u64) -> Self {
        Self { id }
    }

    /// Identity for diagnostics and backend bookkeeping.
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_signal_and_reset() {
        let fence = Fence::new(0, false);
        assert_eq!(fence.status(), FenceStatus::Unsignaled);

        fence.signal();
        assert_eq!(fence.status(), FenceStatus::Signaled);
        assert!(fence.wait_timeout(Duration::from_millis(1)));

        fence.reset();
        assert_eq!(fence.status(), FenceStatus::Unsignaled);
    }

    #[test]
    fn test_fence_wait_times_out() {
        let fence = Fence::new(0, false);
        assert!(!fence.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn test_fence_clone_shares_state() {
        let fence = Fence::new(7, false);
        let backend_side = fence.clone();
        backend_side.signal();
        assert_eq!(fence.status(), FenceStatus::Signaled);
        assert_eq!(fence.id(), backend_side.id());
    }

    #[test]
    fn test_fence_signaled_from_other_thread() {
        let fence = Fence::new(0, false);
        let signaler = fence.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            signaler.signal();
        });
        assert!(fence.wait_timeout(Duration::from_secs(1)));
        handle.join().unwrap();
    }
}
