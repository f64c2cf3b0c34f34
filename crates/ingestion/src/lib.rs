//! # Ingestion Pipeline
//!
//! Sensor data ingestion module.
//!
//! Responsibilities:
//! - Register per-channel sensor sources from a tracking service
//! - Decode raw data points into typed `SensorSample`s, isolating decode failures
//! - Stamp samples with their receive time
//! - Backpressure management and drop policy
//! - Send to downstream via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::IngestionPipeline;
//!
//! let mut pipeline = IngestionPipeline::new(1024);
//! for source in subscription.sources {
//!     pipeline.register_sensor_source(source, None);
//! }
//!
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all();
//! while let Ok(timed) = rx.recv().await {
//!     // Apply sample
//! }
//! ```

mod adapter;
mod adapters;
mod config;
mod error;
mod generic_adapter;
mod pipeline;

// Re-exports
pub use adapter::SensorAdapter;
pub use adapters::common::SampleOutlet;
pub use adapters::decode_point;
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use contracts::{SensorSample, TimedSample};
pub use error::{IngestionError, Result};
pub use generic_adapter::GenericSensorAdapter;
pub use pipeline::IngestionPipeline;
