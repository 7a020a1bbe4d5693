// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output is always on. With the `file-logging` feature and
//! `LoggingOptions::file_logging` set, JSON logs are also written to a
//! timestamped run folder and old runs are pruned.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::LoggingOptions;

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps file writers alive; buffered log lines are flushed on drop
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    run_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving file logs, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }
}

/// Install the global tracing subscriber
///
/// With file logging the layout is:
/// ```text
/// ./logs/
///   └── run_20250101_120000/
///       ├── bridge-io.log.<date>
///       ├── actuator-bridge.log.<date>
///       └── bridge.log.<date> (combined)
/// ```
///
/// # Errors
/// Fails on an invalid base level, when the run folder cannot be created,
/// or when a global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> Result<LoggingGuard> {
    let base_level = options.base_level()?;
    let filter = debug_flags.to_filter_string(&base_level);
    let env_filter =
        EnvFilter::try_new(&filter).with_context(|| format!("Invalid log filter: {}", filter))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(env_filter)
        .boxed();
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let (file_guards, run_dir) = if options.file_logging {
        let (file_layers, guards, run_dir) = file_layers(debug_flags, options, &filter)?;
        layers.extend(file_layers);
        (guards, Some(run_dir))
    } else {
        (Vec::new(), None)
    };

    #[cfg(not(feature = "file-logging"))]
    let run_dir = {
        if options.file_logging {
            eprintln!("Warning: file logging requested but the file-logging feature is disabled");
        }
        None
    };

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        run_dir,
    })
}

#[cfg(feature = "file-logging")]
fn file_layers(
    debug_flags: &CrateDebugFlags,
    options: &LoggingOptions,
    filter: &str,
) -> Result<(
    Vec<BoxedLayer>,
    Vec<tracing_appender::non_blocking::WorkerGuard>,
    PathBuf,
)> {
    use tracing_appender::rolling;

    let run_folder = options.log_dir.join(run_folder_name(Utc::now()));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    cleanup_old_logs(&options.log_dir, options.retention_runs)?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guards = Vec::new();

    // one file per crate
    for crate_name in crate::KNOWN_CRATES {
        let appender = rolling::daily(&run_folder, format!("{}.log", crate_name));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);

        let level = debug_flags.log_level(crate_name).to_string().to_lowercase();
        let crate_filter = format!("{}={}", crate::crate_target(crate_name), level);
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(EnvFilter::try_new(&crate_filter)?)
                .boxed(),
        );
    }

    let combined = rolling::daily(&run_folder, "bridge.log");
    let (writer, guard) = tracing_appender::non_blocking(combined);
    guards.push(guard);
    layers.push(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(EnvFilter::try_new(filter)?)
            .boxed(),
    );

    Ok((layers, guards, run_folder))
}

/// Folder name for a run started at `started`
pub fn run_folder_name(started: DateTime<Utc>) -> String {
    format!("{}{}", RUN_PREFIX, started.format(RUN_TIMESTAMP_FORMAT))
}

/// Remove all but the `retention_runs` most recent run folders
///
/// Entries that are not `run_<timestamp>` folders are left alone.
/// Returns how many folders were removed.
pub fn cleanup_old_logs(base_log_dir: &Path, retention_runs: usize) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let mut runs: Vec<(PathBuf, NaiveDateTime)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)
        .with_context(|| format!("Failed to list {}", base_log_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let started = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|ts| NaiveDateTime::parse_from_str(ts, RUN_TIMESTAMP_FORMAT).ok());
        if let Some(started) = started {
            runs.push((path, started));
        }
    }

    if runs.len() <= retention_runs {
        return Ok(0);
    }

    // oldest first
    runs.sort_by_key(|(_, started)| *started);
    let to_remove = runs.len() - retention_runs;

    let mut removed = 0;
    for (path, _) in runs.iter().take(to_remove) {
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_run_folder_name() {
        let started = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(run_folder_name(started), "run_20250102_030405");
    }

    #[test]
    fn test_cleanup_keeps_most_recent_runs() {
        let dir = tempdir().unwrap();
        for name in [
            "run_20250101_120000",
            "run_20250103_120000",
            "run_20250102_120000",
            "run_not_a_date",
        ] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("run_20240101_000000"), b"a file").unwrap();

        let removed = cleanup_old_logs(dir.path(), 2).unwrap();

        assert_eq!(removed, 1);
        assert!(!dir.path().join("run_20250101_120000").exists());
        assert!(dir.path().join("run_20250102_120000").exists());
        assert!(dir.path().join("run_20250103_120000").exists());
        assert!(dir.path().join("run_not_a_date").exists());
        assert!(dir.path().join("run_20240101_000000").exists());
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(cleanup_old_logs(&dir.path().join("absent"), 3).unwrap(), 0);
    }

    #[test]
    fn test_invalid_level_is_rejected_before_install() {
        let options = LoggingOptions {
            level: "chatty".to_string(),
            ..LoggingOptions::default()
        };
        assert!(init_logging(&CrateDebugFlags::default(), &options).is_err());
    }
}
