//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration failed to load or validate
    #[error("Invalid configuration {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Session could not be started
    #[error("Failed to start session: {0}")]
    SessionStart(#[from] signal_engine::EngineError),

    /// Dispatcher could not be built
    #[error("Failed to create dispatcher: {0}")]
    Dispatcher(#[from] dispatcher::DispatcherError),
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn config(path: &Path, source: contracts::ContractError) -> Self {
        Self::Config {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Load and validate a blueprint, checking the path first
pub fn load_blueprint(path: &Path) -> Result<contracts::SessionBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path));
    }
    config_loader::ConfigLoader::load_from_path(path).map_err(|e| CliError::config(path, e))
}
