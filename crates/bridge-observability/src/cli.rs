//! Per-crate debug flags
//!
//! Supports `--debug bridge-io` (repeatable), `--debug-all` and the
//! `BRIDGE_DEBUG` environment variable to raise individual crates to debug
//! level while everything else stays at the base level.

use std::collections::HashMap;
use std::env;

use crate::{crate_target, ObservabilityError, KNOWN_CRATES};

/// Crates selected for debug logging
///
/// # Example
/// ```rust
/// use bridge_observability::CrateDebugFlags;
///
/// let mut flags = CrateDebugFlags::default();
/// flags.enable("bridge-io").unwrap();
/// assert!(flags.is_enabled("bridge-io"));
/// assert!(flags.enable("bridge-protocol").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    pub enabled_crates: HashMap<String, bool>,
}

impl CrateDebugFlags {
    /// Enable debug for one crate
    ///
    /// # Errors
    /// `ObservabilityError::UnknownCrate` if the name is not a workspace crate
    pub fn enable(&mut self, crate_name: &str) -> Result<(), ObservabilityError> {
        let crate_name = crate_name.trim();
        if !KNOWN_CRATES.contains(&crate_name) {
            return Err(ObservabilityError::UnknownCrate(crate_name.to_string()));
        }
        self.enabled_crates.insert(crate_name.to_string(), true);
        Ok(())
    }

    pub fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enabled_crates.insert(crate_name.to_string(), true);
        }
    }

    /// Merge crates listed in `BRIDGE_DEBUG`
    ///
    /// Format: comma-separated crate names, or `all`.
    pub fn merge_env(&mut self) -> Result<(), ObservabilityError> {
        match env::var("BRIDGE_DEBUG") {
            Ok(value) => self.merge_list(&value),
            Err(_) => Ok(()),
        }
    }

    fn merge_list(&mut self, value: &str) -> Result<(), ObservabilityError> {
        if value.trim() == "all" {
            self.enable_all();
            return Ok(());
        }
        for crate_name in value.split(',').filter(|name| !name.trim().is_empty()) {
            self.enable(crate_name)?;
        }
        Ok(())
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains_key(crate_name)
    }

    /// Get all enabled crates, sorted
    pub fn enabled_crates(&self) -> Vec<&String> {
        let mut crates: Vec<&String> = self.enabled_crates.keys().collect();
        crates.sort();
        crates
    }

    /// Check if debug is enabled for any crate
    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// `DEBUG` for enabled crates, `INFO` otherwise
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Create an `EnvFilter` directive string
    ///
    /// Format: `actuator_bridge=debug,bridge_io=debug,info`, or just the base
    /// level when no crate is enabled. Tracing targets use underscores.
    pub fn to_filter_string(&self, base_level: &str) -> String {
        let mut filters: Vec<String> = self
            .enabled_crates()
            .into_iter()
            .map(|crate_name| format!("{}=debug", crate_target(crate_name)))
            .collect();
        filters.push(base_level.to_string());
        filters.join(",")
    }
}
