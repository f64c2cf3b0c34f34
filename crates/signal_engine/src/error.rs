//! Signal engine errors

use contracts::ContractError;
use thiserror::Error;

/// Session-level failure
#[derive(Debug, Error)]
pub enum EngineError {
    /// The tracking service could not be reached; nothing was started
    #[error("tracking service unavailable: {0}")]
    TrackingUnavailable(#[source] ContractError),

    #[error("session misconfigured: {0}")]
    Config(String),
}

/// Why a derived metric could not be computed this tick
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    #[error("insufficient samples: have {have}, need {need}")]
    InsufficientSamples { have: usize, need: usize },

    #[error("empty series")]
    EmptySeries,

    /// A PPG channel's mean is zero
    #[error("zero DC component on {channel}")]
    ZeroDc { channel: &'static str },

    #[error("zero AC component on {channel}")]
    ZeroAc { channel: &'static str },

    #[error("non-finite intermediate: {0}")]
    NonFinite(&'static str),

    #[error("no spectral peak inside the search band")]
    NoSpectralPeak,
}

impl MetricError {
    /// Short label for the failure counter
    pub fn kind(&self) -> &'static str {
        match self {
            MetricError::InsufficientSamples { .. } => "insufficient_samples",
            MetricError::EmptySeries => "empty_series",
            MetricError::ZeroDc { .. } => "zero_dc",
            MetricError::ZeroAc { .. } => "zero_ac",
            MetricError::NonFinite(_) => "non_finite",
            MetricError::NoSpectralPeak => "no_spectral_peak",
        }
    }
}

impl From<ContractError> for EngineError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::TrackingUnavailable { .. } => EngineError::TrackingUnavailable(err),
            other => EngineError::Config(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
