//! 传感器适配器 trait

use std::sync::Arc;

use contracts::ChannelKind;

use crate::adapters::common::SampleOutlet;
use crate::config::IngestionMetrics;

/// 传感器适配器 trait
///
/// Responsibilities:
/// 1. Register the sensor source callback
/// 2. Decode each raw data point into a `SensorSample`
/// 3. Stamp it with its receive time
/// 4. Forward it into the shared channel (handling backpressure)
pub trait SensorAdapter: Send + Sync {
    fn channel(&self) -> ChannelKind;

    /// Start data collection
    ///
    /// # Arguments
    /// * `outlet` - shared sample channel
    /// * `metrics` - shared ingestion metrics
    fn start(&self, outlet: SampleOutlet, metrics: Arc<IngestionMetrics>);

    fn stop(&self);

    fn is_listening(&self) -> bool;
}
