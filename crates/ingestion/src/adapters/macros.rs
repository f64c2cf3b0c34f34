//! Decoder macros
//!
//! Declarative helpers shared by the per-channel decoders.

/// Extract a required field from a data point, returning early with a
/// decode error when it is absent or of the wrong type.
///
/// # Usage
/// ```ignore
/// let green = require_field!(point, ChannelKind::Ppg, ValueKey::PpgGreen, get_f64);
/// ```
macro_rules! require_field {
    ($point:expr, $channel:expr, $key:expr, $getter:ident) => {
        match $point.$getter($key) {
            Some(value) => value,
            None if $point.contains($key) => {
                return Err($crate::error::IngestionError::invalid_value(
                    $channel,
                    $key,
                    "unexpected value type",
                ))
            }
            None => {
                return Err($crate::error::IngestionError::missing_field(
                    $channel, $key,
                ))
            }
        }
    };
}

/// Reject NaN and infinities
macro_rules! require_finite {
    ($value:expr, $channel:expr, $key:expr) => {{
        let value = $value;
        if !value.is_finite() {
            return Err($crate::error::IngestionError::invalid_value(
                $channel,
                $key,
                format!("non-finite value {value}"),
            ));
        }
        value
    }};
}
