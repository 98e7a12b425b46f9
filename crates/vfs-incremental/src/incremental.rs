//! Advisory-signal plumbing for "possible unknown changes" (spec §4.7, §5).
//!
//! The backend mutex (`vfs-backend::BackendMutex`) reports, on each
//! re-acquisition, whether some other holder mutated the backend since we
//! last released it. That outcome by itself is just an enum value; something
//! has to turn a `Stale` outcome into the single observer call the rest of
//! the system promises (`onPossibleUnknownChanges`). That's this crate's
//! whole job — the scheduler calls [`notify_if_stale`] once per mutex
//! acquisition and never has to know the observer's full interface.

use vfs_backend::MutexAcquireOutcome;

/// The minimal hook the scheduler needs: a place to deliver a "some other
/// holder mutated the backend while we weren't looking" notification.
///
/// `vfs-facade`'s observer registry implements this trait so the scheduler
/// can hand it a notification without depending on the facade crate (which
/// depends on the scheduler, not the other way around).
pub trait UnknownChangesObserver: Send + Sync {
    fn on_possible_unknown_changes(&self);
}

/// Delivers `observer.on_possible_unknown_changes()` iff `outcome` is
/// [`MutexAcquireOutcome::Stale`]. A `Fresh` outcome is silent — the signal
/// is advisory, not a cache invalidation (spec §7): the cache keeps using
/// its existing shadow tree regardless.
pub fn notify_if_stale(outcome: MutexAcquireOutcome, observer: Option<&dyn UnknownChangesObserver>) {
    if outcome == MutexAcquireOutcome::Stale {
        log::warn!("backend mutex reports a foreign writer since our last acquisition");
        if let Some(observer) = observer {
            observer.on_possible_unknown_changes();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);
    impl UnknownChangesObserver for Counter {
        fn on_possible_unknown_changes(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn fresh_outcome_does_not_notify() {
        let counter = Counter(AtomicUsize::new(0));
        notify_if_stale(MutexAcquireOutcome::Fresh, Some(&counter));
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stale_outcome_notifies_exactly_once() {
        let counter = Counter(AtomicUsize::new(0));
        notify_if_stale(MutexAcquireOutcome::Stale, Some(&counter));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stale_outcome_without_observer_does_not_panic() {
        notify_if_stale(MutexAcquireOutcome::Stale, None);
    }
}
