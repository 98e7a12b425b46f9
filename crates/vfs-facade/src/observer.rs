//! The observer interface and its listener registry (spec §6, §9).
//!
//! Per spec §1 this registry is deliberately a thin state holder — just a
//! list of listeners and synchronous, snapshot-based dispatch — not a
//! subsystem with its own invariants to maintain.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use vfs_backend::FileType;
use vfs_incremental::UnknownChangesObserver;

/// The four callbacks a registered listener may receive. Every method has a
/// no-op default so a listener only implements the ones it cares about.
///
/// Callbacks fire synchronously, from within the facade call that caused
/// them, before that call returns (spec §6) — not deferred to commit time.
pub trait Observer: Send + Sync {
    fn on_file_created(&self, _path: &str, _file_type: FileType) {}
    fn on_file_contents_changed(&self, _path: &str, _file_type: FileType) {}
    fn on_file_deleted(&self, _path: &str) {}
    /// Advisory: the backend mutex reported a foreign writer since our last
    /// acquisition. The cache does not self-invalidate (spec §7) — this is
    /// just a signal for the listener to act on if it cares to.
    fn on_possible_unknown_changes(&self) {}
}

/// An opaque handle returned by [`ObserverRegistry::register`], used to
/// unregister the same listener later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// The listener registry: synchronous dispatch over a snapshot of the
/// currently-registered listeners (spec §9 — "iterate a snapshot of the
/// listener set; listeners may unregister during dispatch; one failing
/// callback must not abort the operation").
pub struct ObserverRegistry {
    listeners: Mutex<Vec<(ObserverId, Arc<dyn Observer>)>>,
    next_id: AtomicU64,
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        ObserverRegistry {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn register(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().push((id, observer));
        id
    }

    pub fn unregister(&self, id: ObserverId) {
        self.listeners.lock().retain(|(existing, _)| *existing != id);
    }

    fn snapshot(&self) -> Vec<Arc<dyn Observer>> {
        self.listeners.lock().iter().map(|(_, o)| Arc::clone(o)).collect()
    }

    /// Runs `call` against every listener in a snapshot taken up front. A
    /// listener that panics is caught and logged rather than propagated —
    /// one broken observer must not take down the rest, or the operation
    /// that triggered the notification.
    fn dispatch(&self, call: impl Fn(&dyn Observer)) {
        for observer in self.snapshot() {
            if panic::catch_unwind(AssertUnwindSafe(|| call(observer.as_ref()))).is_err() {
                log::warn!("an observer callback panicked; continuing dispatch to the rest");
            }
        }
    }

    pub fn dispatch_created(&self, path: &str, file_type: FileType) {
        self.dispatch(|o| o.on_file_created(path, file_type));
    }

    pub fn dispatch_contents_changed(&self, path: &str, file_type: FileType) {
        self.dispatch(|o| o.on_file_contents_changed(path, file_type));
    }

    pub fn dispatch_deleted(&self, path: &str) {
        self.dispatch(|o| o.on_file_deleted(path));
    }
}

/// Bridges the scheduler's narrow mutex-staleness hook to the full observer
/// interface, so `vfs-scheduler` never needs to depend on this crate.
impl UnknownChangesObserver for ObserverRegistry {
    fn on_possible_unknown_changes(&self) {
        self.dispatch(|o| o.on_possible_unknown_changes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Recorder {
        created: AtomicUsize,
        deleted: AtomicUsize,
    }

    impl Observer for Recorder {
        fn on_file_created(&self, _path: &str, _file_type: FileType) {
            self.created.fetch_add(1, Ordering::SeqCst);
        }
        fn on_file_deleted(&self, _path: &str) {
            self.deleted.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicker;
    impl Observer for Panicker {
        fn on_file_created(&self, _path: &str, _file_type: FileType) {
            panic!("boom");
        }
    }

    #[test]
    fn dispatch_reaches_every_registered_listener() {
        let registry = ObserverRegistry::new();
        let recorder = Arc::new(Recorder { created: AtomicUsize::new(0), deleted: AtomicUsize::new(0) });
        registry.register(recorder.clone());

        registry.dispatch_created("/a", FileType::File);
        registry.dispatch_deleted("/a");

        assert_eq!(recorder.created.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.deleted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregistered_listener_receives_nothing() {
        let registry = ObserverRegistry::new();
        let recorder = Arc::new(Recorder { created: AtomicUsize::new(0), deleted: AtomicUsize::new(0) });
        let id = registry.register(recorder.clone());
        registry.unregister(id);

        registry.dispatch_created("/a", FileType::File);
        assert_eq!(recorder.created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn a_panicking_listener_does_not_block_the_rest() {
        let registry = ObserverRegistry::new();
        registry.register(Arc::new(Panicker));
        let recorder = Arc::new(Recorder { created: AtomicUsize::new(0), deleted: AtomicUsize::new(0) });
        registry.register(recorder.clone());

        registry.dispatch_created("/a", FileType::File);
        assert_eq!(recorder.created.load(Ordering::SeqCst), 1);
    }
}
