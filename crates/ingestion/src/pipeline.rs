//! Ingestion Pipeline main entry

use std::collections::BTreeMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{ChannelKind, Clock, SensorSource, SystemClock, TimedSample};
use tracing::{debug, info, instrument, warn};

use crate::adapter::SensorAdapter;
use crate::adapters::common::SampleOutlet;
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::generic_adapter::GenericSensorAdapter;

/// Ingestion Pipeline
///
/// Manages one adapter per subscribed channel and merges their output into
/// a single stream of receive-stamped samples.
pub struct IngestionPipeline {
    adapters: BTreeMap<ChannelKind, Box<dyn SensorAdapter>>,

    metrics: Arc<IngestionMetrics>,

    /// Shared by all adapters
    tx: Sender<TimedSample>,

    /// Kept for `DropOldest` eviction even after the receiver is taken
    evict_rx: Receiver<TimedSample>,

    rx: Option<Receiver<TimedSample>>,

    default_config: BackpressureConfig,

    clock: Arc<dyn Clock>,
}

impl IngestionPipeline {
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(BackpressureConfig {
            channel_capacity,
            ..Default::default()
        })
    }

    /// Create with custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        Self {
            adapters: BTreeMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            evict_rx: rx.clone(),
            rx: Some(rx),
            default_config: config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Stamp receive times from `clock` instead of the wall clock.
    ///
    /// Applies to sources registered afterwards.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a sensor source
    ///
    /// A second source for the same channel replaces the first, which is
    /// stopped.
    #[instrument(
        name = "ingestion_register_sensor_source",
        skip(self, source, config),
        fields(channel = %source.channel())
    )]
    pub fn register_sensor_source(
        &mut self,
        source: Box<dyn SensorSource>,
        config: Option<BackpressureConfig>,
    ) {
        let channel = source.channel();
        let adapter = GenericSensorAdapter::new(
            source,
            config.unwrap_or_else(|| self.default_config.clone()),
            self.clock.clone(),
        );
        if let Some(previous) = self.adapters.insert(channel, Box::new(adapter)) {
            warn!(channel = %channel, "replacing existing sensor source");
            previous.stop();
        }
        debug!(channel = %channel, "registered sensor source");
    }

    /// Start all registered sensors
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.adapters.len(), "starting all sensor adapters");
        for (channel, adapter) in &self.adapters {
            if !adapter.is_listening() {
                debug!(channel = %channel, "starting adapter");
                adapter.start(
                    SampleOutlet::new(self.tx.clone(), self.evict_rx.clone()),
                    self.metrics.clone(),
                );
            }
        }
    }

    /// Stop all sensors
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.adapters.len(), "stopping all sensor adapters");
        for (channel, adapter) in &self.adapters {
            if adapter.is_listening() {
                debug!(channel = %channel, "stopping adapter");
                adapter.stop();
            }
        }
    }

    /// Get data stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<TimedSample>> {
        self.rx.take()
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn channel_count(&self) -> usize {
        self.adapters.len()
    }

    pub fn channels(&self) -> Vec<ChannelKind> {
        self.adapters.keys().copied().collect()
    }

    pub fn is_channel_listening(&self, channel: ChannelKind) -> bool {
        self.adapters
            .get(&channel)
            .map(|a| a.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
