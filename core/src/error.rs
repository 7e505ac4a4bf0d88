//! Error types for the core contracts

use std::path::PathBuf;
use thiserror::Error;

/// Errors during configuration access
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("skin file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read skin file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("section '{section}' not found")]
    SectionNotFound { section: String },
}

/// Errors during settings persistence
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings")]
    Load(#[from] confy::ConfyError),

    #[error("failed to save settings")]
    Save(#[source] confy::ConfyError),
}
