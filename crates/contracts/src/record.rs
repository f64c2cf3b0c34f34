//! Session records
//!
//! `LatestRecord` and `DerivedMetrics` are shared between the ingest task
//! and the two processing cadences; `OutgoingSnapshot` is what leaves the
//! engine once per fast tick.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ValueKey;

/// Most recently observed value per field.
///
/// `None` means the field has never been observed in this session.
/// `updated_at` holds the receive time of the last write per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestRecord {
    pub heart_rate: Option<i32>,
    pub ibi: Option<Vec<i32>>,
    pub ppg_green: Option<i32>,
    pub ppg_red: Option<i32>,
    pub ppg_ir: Option<i32>,
    pub acc_x: Option<i32>,
    pub acc_y: Option<i32>,
    pub acc_z: Option<i32>,
    pub skin_temperature: Option<f32>,
    pub eda: Option<f32>,

    pub updated_at: HashMap<ValueKey, i64>,
}

impl LatestRecord {
    /// Last update time of a field, if it was ever written
    pub fn last_update(&self, key: ValueKey) -> Option<i64> {
        self.updated_at.get(&key).copied()
    }

    /// Whether a field has produced live data at least once
    pub fn has_observed(&self, key: ValueKey) -> bool {
        self.updated_at.contains_key(&key)
    }

    pub fn touch(&mut self, key: ValueKey, now_ms: i64) {
        self.updated_at.insert(key, now_ms);
    }

    pub fn is_empty(&self) -> bool {
        self == &LatestRecord::default()
    }
}

/// Last computed derived metrics, replaced wholesale each slow tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// Last element of the detrended green PPG window
    pub bvp: Option<f32>,

    /// Ratio-of-ratios estimate, 0..=100
    pub spo2: Option<f32>,

    /// Breaths per minute from the heart-rate spectrum
    pub respiration_rate: Option<f64>,

    /// When this generation was computed
    pub computed_at_ms: Option<i64>,
}

/// Composite record emitted once per fast tick.
///
/// Field names follow the companion app's record layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingSnapshot {
    pub timestamp: i64,
    pub acc_x: i32,
    pub acc_y: i32,
    pub acc_z: i32,
    pub ppg_green: i32,
    pub ppg_ir: i32,
    pub ppg_red: i32,
    pub hr: i32,
    pub ibi: Option<Vec<i32>>,
    pub skin_temp: f32,
    pub eda: f32,
    pub ecg: f32,
    pub spo2: Option<f32>,
    pub bvp: Option<f32>,
    pub respiration_rate: Option<f64>,
}
