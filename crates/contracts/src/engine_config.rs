//! Signal engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Loop cadences and staleness threshold
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TimingConfig {
    /// Fast cadence: one snapshot per tick
    #[serde(default = "default_snapshot_interval_ms")]
    #[validate(range(min = 1, max = 60_000))]
    pub snapshot_interval_ms: u64,

    /// Slow cadence: derived metrics recomputed per tick
    #[serde(default = "default_processing_interval_ms")]
    #[validate(range(min = 1, max = 600_000))]
    pub processing_interval_ms: u64,

    /// Fields older than this fall back to their default
    #[serde(default = "default_stale_threshold_ms")]
    #[validate(range(min = 1))]
    pub stale_threshold_ms: u64,
}

fn default_snapshot_interval_ms() -> u64 {
    1_000
}

fn default_processing_interval_ms() -> u64 {
    5_000
}

fn default_stale_threshold_ms() -> u64 {
    60_000
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_ms: default_snapshot_interval_ms(),
            processing_interval_ms: default_processing_interval_ms(),
            stale_threshold_ms: default_stale_threshold_ms(),
        }
    }
}

/// Sliding window sizing and metric thresholds
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WindowConfig {
    /// Samples per PPG channel (5 s at 25 Hz)
    #[serde(default = "default_ppg_capacity")]
    #[validate(range(min = 2, max = 65_536))]
    pub ppg_capacity: usize,

    /// Fraction of `ppg_capacity` required before PPG metrics are computed
    #[serde(default = "default_ppg_min_fill_ratio")]
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub ppg_min_fill_ratio: f64,

    /// Heart-rate samples kept (120 s at 1 Hz)
    #[serde(default = "default_hr_capacity")]
    #[validate(range(min = 2, max = 65_536))]
    pub hr_capacity: usize,

    /// Heart-rate samples required before respiration is estimated
    #[serde(default = "default_min_hr_samples")]
    #[validate(range(min = 2))]
    pub min_hr_samples: usize,

    /// Assumed heart-rate sampling rate for the spectral search
    #[serde(default = "default_hr_sample_rate_hz")]
    #[validate(range(exclusive_min = 0.0))]
    pub hr_sample_rate_hz: f64,

    /// Respiration search band (Hz), exclusive on both ends
    #[serde(default = "default_respiration_band_hz")]
    pub respiration_band_hz: [f64; 2],
}

fn default_ppg_capacity() -> usize {
    125
}

fn default_ppg_min_fill_ratio() -> f64 {
    0.8
}

fn default_hr_capacity() -> usize {
    120
}

fn default_min_hr_samples() -> usize {
    30
}

fn default_hr_sample_rate_hz() -> f64 {
    1.0
}

fn default_respiration_band_hz() -> [f64; 2] {
    [0.1, 0.5]
}

impl WindowConfig {
    /// Minimum PPG window length for SpO2/BVP
    pub fn ppg_min_samples(&self) -> usize {
        (self.ppg_capacity as f64 * self.ppg_min_fill_ratio) as usize
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            ppg_capacity: default_ppg_capacity(),
            ppg_min_fill_ratio: default_ppg_min_fill_ratio(),
            hr_capacity: default_hr_capacity(),
            min_hr_samples: default_min_hr_samples(),
            hr_sample_rate_hz: default_hr_sample_rate_hz(),
            respiration_band_hz: default_respiration_band_hz(),
        }
    }
}

/// Synthetic fallback for never-observed channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// When disabled, never-observed fields read their default instead
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fixed seed for reproducible runs; entropy otherwise
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: None,
        }
    }
}

/// Everything the signal engine needs to run a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub windows: WindowConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_watch_rates() {
        let config = EngineConfig::default();
        assert_eq!(config.timing.snapshot_interval_ms, 1_000);
        assert_eq!(config.timing.processing_interval_ms, 5_000);
        assert_eq!(config.timing.stale_threshold_ms, 60_000);
        assert_eq!(config.windows.ppg_capacity, 125);
        assert_eq!(config.windows.ppg_min_samples(), 100);
        assert_eq!(config.windows.hr_capacity, 120);
        assert_eq!(config.windows.min_hr_samples, 30);
        assert!(config.simulation.enabled);
    }

    #[test]
    fn test_validator_rejects_zero_interval() {
        let timing = TimingConfig {
            snapshot_interval_ms: 0,
            ..TimingConfig::default()
        };
        assert!(timing.validate().is_err());
        assert!(TimingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validator_rejects_fill_ratio_out_of_range() {
        let windows = WindowConfig {
            ppg_min_fill_ratio: 1.5,
            ..WindowConfig::default()
        };
        assert!(windows.validate().is_err());
        assert!(WindowConfig::default().validate().is_ok());
    }
}
