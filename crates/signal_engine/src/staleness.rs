//! Per-field freshness decisions

use contracts::{LatestRecord, ValueKey};

/// How a field's value was chosen for a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Updated within the threshold
    Live,
    /// Observed before, but not recently
    Stale,
    /// Never observed this session
    Unobserved,
}

#[derive(Debug, Clone, Copy)]
pub struct StalenessResolver {
    threshold_ms: i64,
}

impl StalenessResolver {
    pub fn new(threshold_ms: u64) -> Self {
        Self {
            threshold_ms: i64::try_from(threshold_ms).unwrap_or(i64::MAX),
        }
    }

    pub fn threshold_ms(&self) -> i64 {
        self.threshold_ms
    }

    /// A field never written counts as written at time 0
    pub fn is_fresh(&self, record: &LatestRecord, key: ValueKey, now_ms: i64) -> bool {
        let last = record.last_update(key).unwrap_or(0);
        now_ms.saturating_sub(last) < self.threshold_ms
    }

    pub fn classify(&self, record: &LatestRecord, key: ValueKey, now_ms: i64) -> Freshness {
        if !record.has_observed(key) {
            Freshness::Unobserved
        } else if self.is_fresh(record, key, now_ms) {
            Freshness::Live
        } else {
            Freshness::Stale
        }
    }

    /// `live` while the field is fresh, `default` otherwise
    pub fn resolve<T>(
        &self,
        record: &LatestRecord,
        key: ValueKey,
        now_ms: i64,
        live: T,
        default: T,
    ) -> T {
        if self.is_fresh(record, key, now_ms) {
            live
        } else {
            default
        }
    }
}

/// The device reports a heart rate of exactly zero when the watch is
/// off the wrist.
pub fn is_off_wrist(record: &LatestRecord) -> bool {
    record.heart_rate == Some(0)
}
