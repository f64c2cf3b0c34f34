//! Mock tracking service
//!
//! Stands in for the on-device health tracking service. Supports injected
//! failure scenarios: a refused connection and per-channel unavailability.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use contracts::{ChannelKind, ContractError, SensorSource, SourceConfig, TrackingService};
use tracing::{debug, instrument};

use crate::manual::ManualFeed;
use crate::mock_watch::{MockWatchConfig, MockWatchSensor};

/// How trackers produce data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    /// Background threads generating synthetic wearer data
    Synthetic,
    /// Data pushed by the caller through [`MockTrackingService::feed`]
    Manual,
}

/// Mock tracking service
pub struct MockTrackingService {
    mode: ServiceMode,
    source: SourceConfig,
    connected: AtomicBool,
    unavailable: Mutex<HashSet<ChannelKind>>,
    feeds: Mutex<HashMap<ChannelKind, ManualFeed>>,
}

impl MockTrackingService {
    /// Synthetic service driven by a source config
    pub fn synthetic(source: SourceConfig) -> Self {
        Self::with_mode(ServiceMode::Synthetic, source)
    }

    /// Manually fed service with every channel available
    pub fn manual() -> Self {
        Self::with_mode(ServiceMode::Manual, SourceConfig::default())
    }

    pub fn with_mode(mode: ServiceMode, source: SourceConfig) -> Self {
        let unavailable = source.unavailable.iter().copied().collect();
        Self {
            mode,
            connected: AtomicBool::new(source.connected),
            source,
            unavailable: Mutex::new(unavailable),
            feeds: Mutex::new(HashMap::new()),
        }
    }

    pub fn mode(&self) -> ServiceMode {
        self.mode
    }

    /// Simulate the service connection dropping or recovering
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Mark a channel as unsupported by the device
    pub fn set_unavailable(&self, channel: ChannelKind) {
        self.unavailable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel);
    }

    /// Push handle for a channel (manual mode)
    ///
    /// The same feed backs every tracker handed out for that channel, so it
    /// stays valid across session restarts.
    pub fn feed(&self, channel: ChannelKind) -> ManualFeed {
        self.feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(channel)
            .or_insert_with(|| ManualFeed::new(channel))
            .clone()
    }

    fn is_unavailable(&self, channel: ChannelKind) -> bool {
        self.unavailable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&channel)
    }
}

impl Default for MockTrackingService {
    fn default() -> Self {
        Self::manual()
    }
}

impl TrackingService for MockTrackingService {
    fn ensure_connected(&self) -> Result<(), ContractError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ContractError::tracking_unavailable(
                "health tracking service not connected",
            ))
        }
    }

    #[instrument(name = "mock_tracking_tracker", skip(self), fields(channel = %channel))]
    fn tracker(&self, channel: ChannelKind) -> Result<Box<dyn SensorSource>, ContractError> {
        self.ensure_connected()?;

        if self.is_unavailable(channel) {
            return Err(ContractError::channel_unavailable(
                channel,
                "sensor not supported by device",
            ));
        }

        debug!(mode = ?self.mode, "tracker created");
        let source: Box<dyn SensorSource> = match self.mode {
            ServiceMode::Synthetic => Box::new(MockWatchSensor::new(
                channel,
                MockWatchConfig::for_channel(channel, &self.source),
            )),
            ServiceMode::Manual => Box::new(self.feed(channel).sensor()),
        };
        Ok(source)
    }
}
