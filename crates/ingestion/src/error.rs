//! Ingestion 错误类型

use contracts::{ChannelKind, ValueKey};
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// A required field is absent from the data point
    #[error("{channel} data point missing field {key:?}")]
    MissingField { channel: ChannelKind, key: ValueKey },

    /// A field is present but unusable
    #[error("{channel} field {key:?} invalid: {message}")]
    InvalidValue {
        channel: ChannelKind,
        key: ValueKey,
        message: String,
    },

    /// 通道已关闭
    #[error("sample channel closed for {channel}")]
    ChannelClosed { channel: ChannelKind },
}

impl IngestionError {
    pub fn missing_field(channel: ChannelKind, key: ValueKey) -> Self {
        Self::MissingField { channel, key }
    }

    pub fn invalid_value(channel: ChannelKind, key: ValueKey, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            channel,
            key,
            message: message.into(),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
