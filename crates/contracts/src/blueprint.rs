//! SessionBlueprint - Config Loader output
//!
//! Describes a complete tracking session: subscribed channels, engine
//! cadences and windows, the sensor source, and output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{ChannelKind, EngineConfig, SimulationConfig, TimingConfig, WindowConfig};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Channels to subscribe
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub windows: WindowConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Sensor source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Output routing
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,

    /// Capacity of the engine -> dispatcher outbox
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

fn default_outbox_capacity() -> usize {
    64
}

/// Session-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelKind>,
}

fn default_channels() -> Vec<ChannelKind> {
    ChannelKind::ALL.to_vec()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
        }
    }
}

/// Mock tracking service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// When false, the service refuses connections and sessions fail to start
    #[serde(default = "default_connected")]
    pub connected: bool,

    /// Channels the device reports as unsupported
    #[serde(default)]
    pub unavailable: Vec<ChannelKind>,

    /// Delivery rate per channel (Hz); missing entries use the watch defaults
    #[serde(default)]
    pub rate_hz: HashMap<ChannelKind, f64>,

    /// Data points per callback
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Baseline heart rate of the synthetic wearer
    #[serde(default = "default_heart_rate_bpm")]
    pub heart_rate_bpm: f64,

    /// Breathing rate modulating the synthetic heart rate
    #[serde(default = "default_breaths_per_minute")]
    pub breaths_per_minute: f64,

    /// Emit a malformed data point every N points (0 disables)
    #[serde(default)]
    pub decode_error_every: u64,

    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_connected() -> bool {
    true
}

fn default_batch_size() -> usize {
    1
}

fn default_heart_rate_bpm() -> f64 {
    68.0
}

fn default_breaths_per_minute() -> f64 {
    12.0
}

impl SourceConfig {
    /// Delivery rate for a channel, falling back to the watch's native rate
    pub fn rate_for(&self, channel: ChannelKind) -> f64 {
        self.rate_hz
            .get(&channel)
            .copied()
            .unwrap_or_else(|| default_rate_hz(channel))
    }
}

/// Native delivery rates of the wearable
pub fn default_rate_hz(channel: ChannelKind) -> f64 {
    match channel {
        ChannelKind::Ppg => 25.0,
        ChannelKind::HeartRate => 1.0,
        ChannelKind::Accelerometer => 25.0,
        ChannelKind::SkinTemperature => 1.0,
        ChannelKind::Eda => 1.0,
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            connected: default_connected(),
            unavailable: Vec::new(),
            rate_hz: HashMap::new(),
            batch_size: default_batch_size(),
            heart_rate_bpm: default_heart_rate_bpm(),
            breaths_per_minute: default_breaths_per_minute(),
            decode_error_every: 0,
            seed: None,
        }
    }
}

/// Sink output config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// JSON-lines file
    File,
    /// UDP datagrams to the companion
    Network,
}

impl SessionBlueprint {
    /// Engine settings carried by this blueprint
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            timing: self.timing.clone(),
            windows: self.windows.clone(),
            simulation: self.simulation.clone(),
        }
    }

    /// Subscribed channels the source is expected to deliver
    pub fn live_channels(&self) -> impl Iterator<Item = ChannelKind> + '_ {
        self.session
            .channels
            .iter()
            .copied()
            .filter(|channel| !self.source.unavailable.contains(channel))
    }
}

impl Default for SessionBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            session: SessionConfig::default(),
            timing: TimingConfig::default(),
            windows: WindowConfig::default(),
            simulation: SimulationConfig::default(),
            source: SourceConfig::default(),
            sinks: Vec::new(),
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_from_blueprint() {
        let mut blueprint = SessionBlueprint::default();
        blueprint.timing.snapshot_interval_ms = 40;
        blueprint.windows.ppg_capacity = 250;
        blueprint.simulation.seed = Some(7);

        let config = blueprint.to_engine_config();
        assert_eq!(config.timing.snapshot_interval_ms, 40);
        assert_eq!(config.windows.ppg_capacity, 250);
        assert_eq!(config.simulation.seed, Some(7));
    }

    #[test]
    fn test_live_channels_exclude_unavailable() {
        let mut blueprint = SessionBlueprint::default();
        blueprint.source.unavailable = vec![ChannelKind::Eda];

        let live: Vec<_> = blueprint.live_channels().collect();
        assert_eq!(live.len(), 4);
        assert!(!live.contains(&ChannelKind::Eda));
    }

    #[test]
    fn test_source_rates_default_to_watch() {
        let mut source = SourceConfig::default();
        assert_eq!(source.rate_for(ChannelKind::Ppg), 25.0);
        source.rate_hz.insert(ChannelKind::Ppg, 50.0);
        assert_eq!(source.rate_for(ChannelKind::Ppg), 50.0);
        assert_eq!(source.rate_for(ChannelKind::HeartRate), 1.0);
    }
}
