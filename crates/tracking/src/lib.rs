//! # Tracking
//!
//! Health tracking service bindings.
//!
//! Responsibilities:
//! - Provide `TrackingService` implementations handing out per-channel `SensorSource`s
//! - Subscribe a session's channel set, recording channels the device refuses
//! - Synthetic watch sensors for development without a device
//! - Manually fed sensors for deterministic tests and replays

pub mod manual;
pub mod mock_service;
pub mod mock_watch;
pub mod subscriber;

pub use contracts::{SensorSource, TrackingService};
pub use manual::{ManualFeed, ManualSensor};
pub use mock_service::{MockTrackingService, ServiceMode};
pub use mock_watch::{MockWatchConfig, MockWatchSensor};
pub use subscriber::{subscribe_channels, Subscription, UnavailableChannel};
