//! # Dispatcher
//!
//! 快照分发模块。
//!
//! 负责：
//! - 消费会话输出的 `OutgoingSnapshot`
//! - Fan-out 到多个 sinks
//! - 隔离慢 sink，不阻塞主链路

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{DataSink, OutgoingSnapshot};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{
    FileSink, FileSinkConfig, LogSink, NetworkFormat, NetworkSink, NetworkSinkConfig,
};
