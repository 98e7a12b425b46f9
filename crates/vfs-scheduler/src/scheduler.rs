//! Serialises filesystem operations against one [`FileCache`] and drives the
//! commit engine on the idle/staleness triggers of spec §4.7 and §5.
//!
//! There is no concurrent multi-client coordination to model (spec §1
//! non-goals), so the "FIFO promise chain" of the source is implemented here
//! as a single `parking_lot::Mutex<State>`: every operation locks it for the
//! span of its own work, which gives exactly the serial, no-interleaving
//! guarantee spec §5 asks for without pulling in an async runtime the rest of
//! the stack doesn't use. A dedicated background thread (the idle timer)
//! parks on a condvar and wakes either when its deadline passes or when an
//! operation rearms/cancels it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use vfs_backend::{Backend, BackendMutex};
use vfs_cache::FileCache;
use vfs_core::{VfsConfig, VfsResult};
use vfs_incremental::UnknownChangesObserver;

struct State {
    cache: FileCache,
    backend_mutex: Option<Box<dyn BackendMutex>>,
    in_flight: u32,
    last_commit: Instant,
    /// When set, the timer thread should fire a commit once this instant
    /// passes (and no operation is in flight at that time).
    timer_deadline: Option<Instant>,
    /// Bumped on every rearm/cancel so the timer thread can detect that the
    /// deadline it was about to act on has since been superseded.
    timer_epoch: u64,
    observer: Option<Arc<dyn UnknownChangesObserver>>,
    shutdown: bool,
}

/// The operation scheduler and commit orchestrator (spec §4.7).
///
/// Every call to [`Scheduler::run`] is one "operation": it acquires the
/// backend mutex if not already held, runs the given closure against the
/// shadow tree, and on completion either commits immediately (staleness
/// trigger), arms the idle timer, or leaves things as they are because
/// another operation is still in flight.
pub struct Scheduler {
    state: Arc<Mutex<State>>,
    condvar: Arc<Condvar>,
    config: VfsConfig,
    backend: Arc<dyn Backend>,
    timer_thread: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(backend: Arc<dyn Backend>, config: VfsConfig) -> Self {
        let state = Arc::new(Mutex::new(State {
            cache: FileCache::new(Arc::clone(&backend)),
            backend_mutex: None,
            in_flight: 0,
            last_commit: Instant::now(),
            timer_deadline: None,
            timer_epoch: 0,
            observer: None,
            shutdown: false,
        }));
        let condvar = Arc::new(Condvar::new());

        let timer_thread = {
            let state = Arc::clone(&state);
            let condvar = Arc::clone(&condvar);
            thread::spawn(move || timer_loop(state, condvar))
        };

        Scheduler {
            state,
            condvar,
            config,
            backend,
            timer_thread: Some(timer_thread),
        }
    }

    /// Registers the sink for `onPossibleUnknownChanges` notifications
    /// (normally the facade's observer registry).
    pub fn set_unknown_changes_observer(&self, observer: Arc<dyn UnknownChangesObserver>) {
        self.state.lock().observer = Some(observer);
    }

    /// Runs one operation against the shadow tree, serialised with respect
    /// to every other call to `run`/`commit` on this scheduler.
    ///
    /// Acquires the backend mutex first if it is not already held (the span
    /// starts at "the first operation after the last commit", spec §5).
    /// After the closure returns, arms or fires the appropriate commit
    /// trigger per the in-flight counter reaching zero.
    pub fn run<T>(&self, op: impl FnOnce(&mut FileCache) -> VfsResult<T>) -> VfsResult<T> {
        let mut state = self.state.lock();

        // Any new operation cancels a pending idle timer (spec §4.7 step 1).
        state.timer_deadline = None;
        state.timer_epoch = state.timer_epoch.wrapping_add(1);
        state.in_flight += 1;

        if state.backend_mutex.is_none() {
            let mutex = self.backend.create_mutex();
            let outcome = mutex.acquire();
            state.backend_mutex = Some(mutex);
            let observer = state.observer.clone();
            vfs_incremental::notify_if_stale(outcome, observer.as_deref());
        }

        let result = op(&mut state.cache);

        state.in_flight -= 1;
        if state.in_flight == 0 {
            self.arm_or_fire(&mut state);
        }

        drop(state);
        self.condvar.notify_all();
        result
    }

    /// Forces an immediate commit, cancelling any pending timer first.
    pub fn commit(&self) -> VfsResult<()> {
        let mut state = self.state.lock();
        state.timer_deadline = None;
        state.timer_epoch = state.timer_epoch.wrapping_add(1);
        let result = commit_locked(&mut state);
        drop(state);
        self.condvar.notify_all();
        result
    }

    /// True iff a root has ever been materialised — used by callers that
    /// want to skip a pointless commit, mirroring `FileCache::is_materialized`.
    pub fn is_materialized(&self) -> bool {
        self.state.lock().cache.is_materialized()
    }

    /// Called once the in-flight counter has reached zero: commits
    /// immediately if the staleness bound has elapsed, else arms the idle
    /// timer if it is finite.
    fn arm_or_fire(&self, state: &mut State) {
        let elapsed = state.last_commit.elapsed();
        let past_staleness_bound = matches!(self.config.always_commit_cache_after, Some(bound) if elapsed >= bound);

        if past_staleness_bound {
            log::debug!("staleness bound elapsed, committing immediately");
            if let Err(err) = commit_locked(state) {
                log::warn!("commit failed: {err}");
            }
            return;
        }

        if let Some(delay) = self.config.cache_commit_delay {
            log::trace!("arming idle commit timer for {delay:?}");
            state.timer_deadline = Some(Instant::now() + delay);
            state.timer_epoch = state.timer_epoch.wrapping_add(1);
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        {
            let mut state = self.state.lock();
            state.shutdown = true;
        }
        self.condvar.notify_all();
        if let Some(handle) = self.timer_thread.take() {
            let _ = handle.join();
        }
    }
}

fn commit_locked(state: &mut State) -> VfsResult<()> {
    let result = state.cache.commit();
    state.last_commit = Instant::now();
    state.timer_deadline = None;
    state.timer_epoch = state.timer_epoch.wrapping_add(1);
    if let Some(mutex) = state.backend_mutex.take() {
        mutex.release();
    }
    result
}

/// The idle-timer background thread: waits on the deadline currently armed
/// in `state`, re-checking after every wake (whether from timeout, rearm, or
/// shutdown) since the deadline it was waiting on may have moved under it.
fn timer_loop(state: Arc<Mutex<State>>, condvar: Arc<Condvar>) {
    loop {
        let mut guard = state.lock();
        if guard.shutdown {
            return;
        }

        let Some(deadline) = guard.timer_deadline else {
            condvar.wait(&mut guard);
            continue;
        };

        let now = Instant::now();
        if now < deadline {
            condvar.wait_for(&mut guard, deadline - now);
            continue;
        }

        let epoch_at_wake = guard.timer_epoch;
        guard.timer_deadline = None;
        if guard.in_flight != 0 {
            // An operation is mid-flight; its own completion will rearm or
            // commit, so there's nothing for the timer to do here.
            continue;
        }
        if guard.timer_epoch != epoch_at_wake {
            // Rearmed or cancelled between reading the deadline and taking
            // the lock for real; let the next loop iteration see the latest.
            continue;
        }

        log::debug!("idle timer fired, committing");
        if let Err(err) = commit_locked(&mut guard) {
            log::warn!("commit failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use vfs_backend::InMemoryBackend;

    fn scheduler_with(config: VfsConfig) -> Scheduler {
        Scheduler::new(Arc::new(InMemoryBackend::new()), config)
    }

    #[test]
    fn operations_run_sequentially_with_no_interleaving() {
        let scheduler = scheduler_with(VfsConfig::default());
        for i in 0..5 {
            let path = format!("/f{i}");
            scheduler.run(|cache| cache.write_file(&path, vec![i as u8])).unwrap();
        }
        for i in 0..5 {
            let path = format!("/f{i}");
            let bytes = scheduler.run(|cache| cache.read_file_direct(&path)).unwrap();
            assert_eq!(bytes, vec![i as u8]);
        }
    }

    #[test]
    fn explicit_commit_flushes_to_backend() {
        let scheduler = scheduler_with(VfsConfig::default());
        scheduler.run(|cache| cache.write_file("/a", vec![1, 2, 3])).unwrap();
        scheduler.commit().unwrap();
        assert_eq!(scheduler.backend.read_file("/a").unwrap(), vec![1, 2, 3]);
        assert!(!scheduler.is_materialized());
    }

    #[test]
    fn commit_on_empty_cache_is_a_no_op() {
        let scheduler = scheduler_with(VfsConfig::default());
        scheduler.commit().unwrap();
    }

    #[test]
    fn zero_idle_delay_commits_after_every_quiet_interval() {
        let config = VfsConfig::new(None, Some(Duration::from_millis(0)));
        let scheduler = scheduler_with(config);
        scheduler.run(|cache| cache.write_file("/a", vec![1])).unwrap();

        let mut waited = Duration::from_millis(0);
        let step = Duration::from_millis(10);
        while scheduler.backend.linfo("/a").unwrap().is_none() && waited < Duration::from_secs(2) {
            thread::sleep(step);
            waited += step;
        }
        assert!(scheduler.backend.linfo("/a").unwrap().is_some(), "idle timer never committed");
    }

    #[test]
    fn unknown_changes_observer_fires_on_stale_mutex_reacquire() {
        struct Counter(AtomicUsize);
        impl UnknownChangesObserver for Counter {
            fn on_possible_unknown_changes(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let backend = Arc::new(InMemoryBackend::new());
        let scheduler = Scheduler::new(Arc::clone(&backend) as Arc<dyn Backend>, VfsConfig::default());
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        scheduler.set_unknown_changes_observer(counter.clone());

        scheduler.run(|cache| cache.write_file("/a", vec![1])).unwrap();
        scheduler.commit().unwrap();

        backend.force_external_mutation();

        scheduler.run(|cache| cache.write_file("/b", vec![2])).unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
