//! 快照输出端：日志、JSON Lines 文件、UDP 数据报

mod file;
mod log;
mod network;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::network::{NetworkFormat, NetworkSink, NetworkSinkConfig, DEFAULT_MAX_PACKET_SIZE};
