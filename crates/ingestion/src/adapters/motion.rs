//! Accelerometer decoder

use contracts::{ChannelKind, DataPoint, SensorSample, ValueKey};

use crate::error::{IngestionError, Result};

const CHANNEL: ChannelKind = ChannelKind::Accelerometer;

fn axis(point: &DataPoint, key: ValueKey) -> Result<i32> {
    let raw = require_field!(point, CHANNEL, key, get_i64);
    i32::try_from(raw)
        .map_err(|_| IngestionError::invalid_value(CHANNEL, key, format!("{raw} overflows i32")))
}

/// Decode raw x/y/z accelerometer counts
pub fn decode(point: &DataPoint) -> Result<SensorSample> {
    Ok(SensorSample::Accelerometer {
        x: axis(point, ValueKey::AccelerometerX)?,
        y: axis(point, ValueKey::AccelerometerY)?,
        z: axis(point, ValueKey::AccelerometerZ)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DataValue;

    fn point(x: i64, y: i64, z: i64) -> DataPoint {
        DataPoint::new(0)
            .with(ValueKey::AccelerometerX, DataValue::Int(x))
            .with(ValueKey::AccelerometerY, DataValue::Int(y))
            .with(ValueKey::AccelerometerZ, DataValue::Int(z))
    }

    #[test]
    fn test_decode_accelerometer() {
        assert_eq!(
            decode(&point(-12, 40, 4090)).unwrap(),
            SensorSample::Accelerometer {
                x: -12,
                y: 40,
                z: 4090
            }
        );
    }

    #[test]
    fn test_decode_accelerometer_overflow() {
        assert!(decode(&point(0, i64::MAX, 0)).is_err());
    }
}
