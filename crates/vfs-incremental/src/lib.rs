pub mod incremental;

pub use incremental::{notify_if_stale, UnknownChangesObserver};
