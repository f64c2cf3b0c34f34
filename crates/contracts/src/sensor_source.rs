//! SensorSource / TrackingService traits - sensor data source abstraction
//!
//! A tracking service hands out one sensor source per channel; each source
//! delivers batches of raw [`DataPoint`]s through a callback.
//! Real watch SDK bindings and the mock service implement the same API.

use std::sync::Arc;

use crate::{ChannelKind, ContractError, DataPoint};

/// Sensor data callback type
///
/// Sources deliver data points in batches, in arrival order.
/// Uses `Arc` to allow callback sharing across multiple contexts.
pub type SensorDataCallback = Arc<dyn Fn(Vec<DataPoint>) + Send + Sync>;

/// Sensor data source trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn SensorSource> = service.tracker(ChannelKind::Ppg)?;
/// source.listen(Arc::new(|batch| {
///     println!("received {} points", batch.len());
/// }));
/// // ... use source ...
/// source.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Channel this source delivers
    fn channel(&self) -> ChannelKind;

    /// Register data callback
    ///
    /// If already listening, repeated calls are idempotent (won't register
    /// multiple callbacks).
    fn listen(&self, callback: SensorDataCallback);

    /// Stop listening. Idempotent.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}

/// Connection to the on-device health tracking service
pub trait TrackingService: Send + Sync {
    /// Fails when the underlying service connection is not available
    fn ensure_connected(&self) -> Result<(), ContractError>;

    /// Subscribe to one channel
    ///
    /// # Errors
    /// `ContractError::ChannelUnavailable` when the device lacks the sensor
    /// or refuses the subscription.
    fn tracker(&self, channel: ChannelKind) -> Result<Box<dyn SensorSource>, ContractError>;
}
