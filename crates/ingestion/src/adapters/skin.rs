//! Skin temperature and electrodermal activity decoders

use contracts::{ChannelKind, DataPoint, SensorSample, ValueKey};

use crate::error::{IngestionError, Result};

pub fn decode_temperature(point: &DataPoint) -> Result<SensorSample> {
    let channel = ChannelKind::SkinTemperature;
    let key = ValueKey::ObjectTemperature;
    let celsius = require_finite!(require_field!(point, channel, key, get_f64), channel, key);

    Ok(SensorSample::SkinTemperature {
        celsius: celsius as f32,
    })
}

pub fn decode_eda(point: &DataPoint) -> Result<SensorSample> {
    let channel = ChannelKind::Eda;
    let key = ValueKey::SkinConductance;
    let microsiemens = require_finite!(require_field!(point, channel, key, get_f64), channel, key);
    if microsiemens < 0.0 {
        return Err(IngestionError::invalid_value(
            channel,
            key,
            format!("negative conductance {microsiemens}"),
        ));
    }

    Ok(SensorSample::Eda {
        microsiemens: microsiemens as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DataValue;

    #[test]
    fn test_decode_temperature() {
        let point = DataPoint::new(0).with(ValueKey::ObjectTemperature, DataValue::Float(33.5));
        assert_eq!(
            decode_temperature(&point).unwrap(),
            SensorSample::SkinTemperature { celsius: 33.5 }
        );
    }

    #[test]
    fn test_decode_eda_rejects_negative() {
        let point = DataPoint::new(0).with(ValueKey::SkinConductance, DataValue::Float(-0.2));
        assert!(decode_eda(&point).is_err());

        let point = DataPoint::new(0).with(ValueKey::SkinConductance, DataValue::Float(0.8));
        assert_eq!(
            decode_eda(&point).unwrap(),
            SensorSample::Eda { microsiemens: 0.8 }
        );
    }
}
