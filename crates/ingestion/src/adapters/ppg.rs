//! PPG decoder

use contracts::{ChannelKind, DataPoint, SensorSample, ValueKey};

use crate::error::Result;

const CHANNEL: ChannelKind = ChannelKind::Ppg;

/// Decode a green/red/infrared LED triple
pub fn decode(point: &DataPoint) -> Result<SensorSample> {
    let green = require_field!(point, CHANNEL, ValueKey::PpgGreen, get_f64);
    let red = require_field!(point, CHANNEL, ValueKey::PpgRed, get_f64);
    let ir = require_field!(point, CHANNEL, ValueKey::PpgIr, get_f64);

    Ok(SensorSample::Ppg {
        green: require_finite!(green, CHANNEL, ValueKey::PpgGreen),
        red: require_finite!(red, CHANNEL, ValueKey::PpgRed),
        ir: require_finite!(ir, CHANNEL, ValueKey::PpgIr),
    })
}
