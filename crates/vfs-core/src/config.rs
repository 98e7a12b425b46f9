use std::time::Duration;

/// The two scheduler tunables from spec §6.
///
/// Both may be set to `None` to mean "infinite" — disabling the corresponding
/// trigger, per spec §4.7 and §5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsConfig {
    /// Absolute staleness bound: if this much time has passed since the last
    /// commit when the in-flight operation count drops to zero, commit
    /// immediately rather than arming the idle timer.
    pub always_commit_cache_after: Option<Duration>,

    /// Idle bound: once the in-flight operation count drops to zero, wait this
    /// long with no new operations before committing.
    pub cache_commit_delay: Option<Duration>,
}

impl Default for VfsConfig {
    fn default() -> Self {
        VfsConfig {
            always_commit_cache_after: Some(Duration::from_millis(5000)),
            cache_commit_delay: Some(Duration::from_millis(500)),
        }
    }
}

impl VfsConfig {
    pub fn new(always_commit_cache_after: Option<Duration>, cache_commit_delay: Option<Duration>) -> Self {
        VfsConfig {
            always_commit_cache_after,
            cache_commit_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = VfsConfig::default();
        assert_eq!(cfg.always_commit_cache_after, Some(Duration::from_millis(5000)));
        assert_eq!(cfg.cache_commit_delay, Some(Duration::from_millis(500)));
    }
}
