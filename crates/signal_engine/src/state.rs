//! Shared session state
//!
//! Both stores are copy-on-write behind an `Arc`: readers clone the `Arc`
//! and never hold the lock while they work; writers mutate a private copy
//! and swap it in under the write lock.

use std::sync::{Arc, PoisonError, RwLock};

use contracts::{DerivedMetrics, LatestRecord, WindowConfig};

use crate::windows::SignalWindows;

/// Latest observed value per field
#[derive(Debug, Default)]
pub struct LatestStore {
    inner: RwLock<Arc<LatestRecord>>,
}

impl LatestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a mutation to the record
    ///
    /// The closure runs under the write lock, so concurrent writers to
    /// different fields never lose each other's updates.
    pub fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut LatestRecord),
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        mutate(Arc::make_mut(&mut guard));
    }

    pub fn snapshot(&self) -> Arc<LatestRecord> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(LatestRecord::default());
    }
}

/// Last generation of derived metrics
#[derive(Debug, Default)]
pub struct DerivedCache {
    inner: RwLock<Arc<DerivedMetrics>>,
}

impl DerivedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Arc<DerivedMetrics> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole generation
    pub fn store(&self, metrics: DerivedMetrics) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(metrics);
    }

    pub fn reset(&self) {
        self.store(DerivedMetrics::default());
    }
}

/// State owned by one engine and shared with its tasks
#[derive(Debug)]
pub struct SharedState {
    pub latest: LatestStore,
    pub windows: SignalWindows,
    pub derived: DerivedCache,
}

impl SharedState {
    pub fn new(windows: &WindowConfig) -> Self {
        Self {
            latest: LatestStore::new(),
            windows: SignalWindows::new(windows),
            derived: DerivedCache::new(),
        }
    }

    /// Back to "nothing observed": empty windows, default record and cache
    pub fn reset(&self) {
        self.windows.clear();
        self.latest.reset();
        self.derived.reset();
    }
}
