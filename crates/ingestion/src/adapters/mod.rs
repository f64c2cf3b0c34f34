//! Per-channel decoders
//!
//! Each decoder turns one raw `DataPoint` into a typed `SensorSample`.

#[macro_use]
mod macros;

pub mod common;
mod heart_rate;
mod motion;
mod ppg;
mod skin;

use contracts::{ChannelKind, DataPoint, SensorSample};

use crate::error::Result;

/// Decode a data point delivered on `channel`
pub fn decode_point(channel: ChannelKind, point: &DataPoint) -> Result<SensorSample> {
    match channel {
        ChannelKind::Ppg => ppg::decode(point),
        ChannelKind::HeartRate => heart_rate::decode(point),
        ChannelKind::Accelerometer => motion::decode(point),
        ChannelKind::SkinTemperature => skin::decode_temperature(point),
        ChannelKind::Eda => skin::decode_eda(point),
    }
}
