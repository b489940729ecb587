//! Loading `ParseConfig` from JSON.
//!
//! Every field is optional; missing fields keep their defaults and unknown
//! fields are rejected.

use std::path::{Path, PathBuf};

use picklejar_foundation::ParseConfig;
use thiserror::Error;

/// Failure to load a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not a valid configuration document.
    #[error("invalid config '{}': {source}", path.display())]
    Parse {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Parses a configuration document.
///
/// # Errors
/// Returns the JSON error for malformed documents or unknown fields.
pub fn config_from_json(text: &str) -> Result<ParseConfig, serde_json::Error> {
    serde_json::from_str(text)
}

/// Reads a configuration file.
///
/// # Errors
/// Returns an error if the file cannot be read or is not valid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ParseConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    config_from_json(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
