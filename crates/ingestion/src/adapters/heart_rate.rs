//! Heart-rate decoder

use contracts::{ChannelKind, DataPoint, SensorSample, ValueKey};

use crate::error::{IngestionError, Result};

const CHANNEL: ChannelKind = ChannelKind::HeartRate;

/// Beyond any physiological rate; treated as a corrupt reading
const MAX_BPM: i64 = 300;

/// Decode heart rate plus the optional inter-beat-interval list.
///
/// A reading of 0 bpm is valid: the watch reports it when there is no skin
/// contact.
pub fn decode(point: &DataPoint) -> Result<SensorSample> {
    let bpm = require_field!(point, CHANNEL, ValueKey::HeartRate, get_i64);
    if !(0..=MAX_BPM).contains(&bpm) {
        return Err(IngestionError::invalid_value(
            CHANNEL,
            ValueKey::HeartRate,
            format!("{bpm} bpm out of range"),
        ));
    }

    let ibi = if point.contains(ValueKey::IbiList) {
        Some(require_field!(point, CHANNEL, ValueKey::IbiList, get_int_list).to_vec())
    } else {
        None
    };

    Ok(SensorSample::HeartRate {
        bpm: bpm as i32,
        ibi,
    })
}
