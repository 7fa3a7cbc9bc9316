use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Utilization counters of a conversion engine.
///
/// Counting is skipped entirely while disabled.
#[derive(Debug)]
pub struct Statistics {
    enabled: AtomicBool,
    noop: AtomicU64,
    attempts: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
    promotions: AtomicU64,
}

/// Point-in-time copy of [`Statistics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    /// Conversions that needed no work (null input or identity).
    pub noop: u64,
    /// Conversions that needed a converter.
    pub attempts: u64,
    pub hits: u64,
    pub misses: u64,
    pub failures: u64,
    /// Fallback converters promoted to direct entries.
    pub promotions: u64,
}

impl Statistics {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            noop: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            promotions: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn bump(&self, counter: &AtomicU64) {
        if self.is_enabled() {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_noop(&self) {
        self.bump(&self.noop);
    }

    pub(crate) fn record_attempt(&self) {
        self.bump(&self.attempts);
    }

    pub(crate) fn record_hit(&self) {
        self.bump(&self.hits);
    }

    pub(crate) fn record_miss(&self) {
        self.bump(&self.misses);
    }

    pub(crate) fn record_failure(&self) {
        self.bump(&self.failures);
    }

    pub(crate) fn record_promotion(&self) {
        self.bump(&self.promotions);
    }

    pub fn reset(&self) {
        for counter in [
            &self.noop,
            &self.attempts,
            &self.hits,
            &self.misses,
            &self.failures,
            &self.promotions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            noop: self.noop.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "conversion engine utilization[noop={}, attempts={}, hits={}, misses={}, failures={}, promotions={}]",
            self.noop, self.attempts, self.hits, self.misses, self.failures, self.promotions
        )
    }
}
