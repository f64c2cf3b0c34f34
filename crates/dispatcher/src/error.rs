use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A configured sink could not be opened; no worker was started for it
    #[error("sink '{name}' could not be created: {message}")]
    SinkCreation { name: String, message: String },
}

impl DispatcherError {
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Name of the sink the error refers to
    pub fn sink_name(&self) -> &str {
        match self {
            Self::SinkCreation { name, .. } => name,
        }
    }
}
