//! Sensor data types
//!
//! Raw data points as delivered by a tracking service, and the typed
//! samples the ingestion adapters decode them into.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Subscribable sensor channel on the wearable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Photoplethysmography, green/red/infrared LEDs
    Ppg,
    /// Heart rate with inter-beat intervals
    HeartRate,
    Accelerometer,
    SkinTemperature,
    /// Electrodermal activity (skin conductance)
    Eda,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Ppg,
        ChannelKind::HeartRate,
        ChannelKind::Accelerometer,
        ChannelKind::SkinTemperature,
        ChannelKind::Eda,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Ppg => "ppg",
            ChannelKind::HeartRate => "heart_rate",
            ChannelKind::Accelerometer => "accelerometer",
            ChannelKind::SkinTemperature => "skin_temperature",
            ChannelKind::Eda => "eda",
        }
    }

    /// Raw value keys this channel delivers
    pub fn value_keys(&self) -> &'static [ValueKey] {
        match self {
            ChannelKind::Ppg => &[ValueKey::PpgGreen, ValueKey::PpgRed, ValueKey::PpgIr],
            ChannelKind::HeartRate => &[ValueKey::HeartRate, ValueKey::IbiList],
            ChannelKind::Accelerometer => &[
                ValueKey::AccelerometerX,
                ValueKey::AccelerometerY,
                ValueKey::AccelerometerZ,
            ],
            ChannelKind::SkinTemperature => &[ValueKey::ObjectTemperature],
            ChannelKind::Eda => &[ValueKey::SkinConductance],
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a single raw field.
///
/// Also used as the key of the per-field last-update map in
/// [`LatestRecord`](crate::LatestRecord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKey {
    PpgGreen,
    PpgRed,
    PpgIr,
    HeartRate,
    IbiList,
    AccelerometerX,
    AccelerometerY,
    AccelerometerZ,
    ObjectTemperature,
    SkinConductance,
}

/// Raw field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Int(i64),
    Float(f64),
    IntList(Vec<i32>),
}

/// One raw reading as delivered by a sensor source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Sensor-side timestamp (ms)
    pub timestamp_ms: i64,

    pub values: HashMap<ValueKey, DataValue>,
}

impl DataPoint {
    pub fn new(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            values: HashMap::new(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: ValueKey, value: DataValue) -> Self {
        self.values.insert(key, value);
        self
    }

    /// Numeric value, widening integers
    pub fn get_f64(&self, key: ValueKey) -> Option<f64> {
        match self.values.get(&key)? {
            DataValue::Int(v) => Some(*v as f64),
            DataValue::Float(v) => Some(*v),
            DataValue::IntList(_) => None,
        }
    }

    /// Integer value; floats are accepted only when integral
    pub fn get_i64(&self, key: ValueKey) -> Option<i64> {
        match self.values.get(&key)? {
            DataValue::Int(v) => Some(*v),
            DataValue::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn get_int_list(&self, key: ValueKey) -> Option<&[i32]> {
        match self.values.get(&key)? {
            DataValue::IntList(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn contains(&self, key: ValueKey) -> bool {
        self.values.contains_key(&key)
    }
}

/// Typed sensor sample.
///
/// Produced by the ingestion adapters, consumed once by the engine and then
/// dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensorSample {
    Ppg { green: f64, red: f64, ir: f64 },
    HeartRate { bpm: i32, ibi: Option<Vec<i32>> },
    Accelerometer { x: i32, y: i32, z: i32 },
    SkinTemperature { celsius: f32 },
    Eda { microsiemens: f32 },
}

impl SensorSample {
    pub fn channel(&self) -> ChannelKind {
        match self {
            SensorSample::Ppg { .. } => ChannelKind::Ppg,
            SensorSample::HeartRate { .. } => ChannelKind::HeartRate,
            SensorSample::Accelerometer { .. } => ChannelKind::Accelerometer,
            SensorSample::SkinTemperature { .. } => ChannelKind::SkinTemperature,
            SensorSample::Eda { .. } => ChannelKind::Eda,
        }
    }
}

/// Sample stamped with the time it reached the ingestion boundary
#[derive(Debug, Clone, PartialEq)]
pub struct TimedSample {
    pub received_at_ms: i64,
    pub sample: SensorSample,
}
