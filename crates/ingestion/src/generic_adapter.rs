//! 通用传感器适配器
//!
//! 基于 `SensorSource` trait 的统一适配器实现。
//! Decodes every data point of a delivered batch; a point that fails to
//! decode is logged, counted and skipped without affecting the rest.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{ChannelKind, Clock, SensorDataCallback, SensorSource, TimedSample};
use tracing::{debug, trace, warn};

use crate::adapter::SensorAdapter;
use crate::adapters::common::SampleOutlet;
use crate::adapters::decode_point;
use crate::config::{BackpressureConfig, IngestionMetrics};

/// 通用传感器适配器
///
/// Bridges a tracking service `SensorSource` into the ingestion channel.
pub struct GenericSensorAdapter {
    source: Box<dyn SensorSource>,
    config: BackpressureConfig,
    /// Receive stamps; the session's staleness check reads the same clock
    clock: Arc<dyn Clock>,
    listening: Arc<AtomicBool>,
}

impl GenericSensorAdapter {
    pub fn new(
        source: Box<dyn SensorSource>,
        config: BackpressureConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            config,
            clock,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SensorAdapter for GenericSensorAdapter {
    fn channel(&self) -> ChannelKind {
        self.source.channel()
    }

    fn start(&self, outlet: SampleOutlet, metrics: Arc<IngestionMetrics>) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let channel = self.source.channel();
        let drop_policy = self.config.drop_policy;
        let listening = self.listening.clone();
        let clock = self.clock.clone();

        debug!(channel = %channel, "starting generic adapter");

        let callback: SensorDataCallback = Arc::new(move |batch| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            let received_at_ms = clock.now_ms();
            trace!(channel = %channel, points = batch.len(), "generic adapter received batch");

            for point in &batch {
                metrics.record_received();
                match decode_point(channel, point) {
                    Ok(sample) => outlet.send(
                        TimedSample {
                            received_at_ms,
                            sample,
                        },
                        &metrics,
                        channel,
                        drop_policy,
                    ),
                    Err(e) => {
                        metrics.record_decode_error();
                        metrics::counter!(
                            "biosync_decode_errors_total",
                            "channel" => channel.as_str()
                        )
                        .increment(1);
                        warn!(
                            channel = %channel,
                            sensor_ts = point.timestamp_ms,
                            error = %e,
                            "skipping undecodable data point"
                        );
                    }
                }
            }
        });

        self.source.listen(callback);
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(channel = %self.source.channel(), "stopping generic adapter");
            self.source.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
