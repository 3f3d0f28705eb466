use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// Session-wide reentrant lock serializing all stack traffic.
///
/// The operand stack has no per-call identity, so a push-call-pop
/// sequence must never interleave with another one.
#[derive(Default)]
pub struct TransportLock {
    inner: ReentrantMutex<()>,
    acquisitions: AtomicUsize,
}

impl TransportLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock; reentrant on the owning thread.
    pub fn acquire(&self) -> ReentrantMutexGuard<'_, ()> {
        let guard = self.inner.lock();
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        guard
    }

    /// Total number of acquisitions so far.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::Relaxed)
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl std::fmt::Debug for TransportLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportLock")
            .field("locked", &self.is_locked())
            .field("acquisitions", &self.acquisitions())
            .finish()
    }
}
