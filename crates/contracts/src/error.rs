//! Layered error definitions
//!
//! Categorized by source: config / tracking / decode / sink

use thiserror::Error;

use crate::ChannelKind;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Tracking Errors =====
    /// The tracking service itself is unreachable
    #[error("tracking service unavailable: {message}")]
    TrackingUnavailable { message: String },

    /// A single channel could not be subscribed
    #[error("channel '{channel}' unavailable: {message}")]
    ChannelUnavailable {
        channel: ChannelKind,
        message: String,
    },

    // ===== Decode Errors =====
    /// Data point could not be decoded into a typed sample
    #[error("payload decode error for channel '{channel}': {message}")]
    PayloadDecode {
        channel: ChannelKind,
        message: String,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn tracking_unavailable(message: impl Into<String>) -> Self {
        Self::TrackingUnavailable {
            message: message.into(),
        }
    }

    pub fn channel_unavailable(channel: ChannelKind, message: impl Into<String>) -> Self {
        Self::ChannelUnavailable {
            channel,
            message: message.into(),
        }
    }

    pub fn payload_decode(channel: ChannelKind, message: impl Into<String>) -> Self {
        Self::PayloadDecode {
            channel,
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
