//! The "process-local mutual exclusion primitive" of spec §4.3/§5.
//!
//! A `BackendMutex` brackets the span from the first operation after a
//! commit through commit completion. Re-acquiring after a release can
//! signal that someone else mutated the backend's state while we didn't
//! hold the lock — the scheduler turns that into an
//! `onPossibleUnknownChanges` notification.

/// What `acquire` learned about the time since our last hold of the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexAcquireOutcome {
    /// Nothing changed the backend's generation since we last released.
    Fresh,
    /// The backend's generation moved since we last released: some other
    /// holder mutated state we didn't see.
    Stale,
}

/// A factory-produced handle, one per `Backend::create_mutex()` call.
pub trait BackendMutex: Send + Sync {
    /// Blocks until the lock is held, then reports freshness.
    fn acquire(&self) -> MutexAcquireOutcome;

    /// Releases the lock. Must only be called while held.
    fn release(&self);
}
