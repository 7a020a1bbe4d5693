//! Logging options

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ObservabilityError;

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Options passed to [`crate::init_logging`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingOptions {
    /// Base level for everything not raised by a debug flag
    pub level: String,

    /// Write JSON run logs (needs the `file-logging` feature)
    pub file_logging: bool,

    /// Parent of the `run_*` folders
    pub log_dir: PathBuf,

    /// Most recent run folders to keep
    pub retention_runs: usize,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_runs: 10,
        }
    }
}

impl LoggingOptions {
    /// Lower-cased base level
    ///
    /// # Errors
    /// `ObservabilityError::InvalidLevel` for anything but trace, debug,
    /// info, warn or error
    pub fn base_level(&self) -> Result<String, ObservabilityError> {
        let level = self.level.trim().to_lowercase();
        if LEVELS.contains(&level.as_str()) {
            Ok(level)
        } else {
            Err(ObservabilityError::InvalidLevel(self.level.clone()))
        }
    }
}
