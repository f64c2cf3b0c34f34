//! # Contracts
//!
//! Shared interface contracts for the biosync workspace: sensor data types,
//! the session-wide records read by both processing cadences, configuration
//! blueprints and the source/sink traits.
//! All business crates depend on this crate, never the other way around.
//!
//! ## Time Model
//! - All timestamps are wall-clock milliseconds since the Unix epoch (`i64`)
//! - Samples are stamped with their *receive* time, which drives staleness

mod blueprint;
mod clock;
mod engine_config;
mod error;
mod record;
mod sensor;
mod sensor_source;
mod sink;

pub use blueprint::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine_config::*;
pub use error::*;
pub use record::*;
pub use sensor::*;
pub use sensor_source::{SensorDataCallback, SensorSource, TrackingService};
pub use sink::*;
