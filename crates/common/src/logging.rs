//! Logging setup
//!
//! One subscriber per process: a console layer on stderr and, when enabled,
//! a plain-text file layer under the configured log directory.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::Span;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use crate::types::BrowserKind;

/// Build the log file path for a run starting now
pub fn log_file_path(dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("test_run_{}.log", stamp))
}

/// Install the global subscriber.
///
/// Returns the log file path when file logging is enabled. Fails if a
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::Logging(format!("invalid level '{}': {}", config.level, e)))?;

    let (file_layer, log_file) = if config.file {
        std::fs::create_dir_all(&config.path)?;
        let path = log_file_path(&config.path);
        let file = File::create(&path)?;
        let layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(Mutex::new(file));
        (Some(layer), Some(path))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    if let Some(path) = &log_file {
        tracing::info!("Logging to {}", path.display());
    }
    Ok(log_file)
}

/// Per-run logging context.
///
/// Owns the span that tags every event of a scenario with the device and
/// browser it runs on.
#[derive(Debug, Clone)]
pub struct LogContext {
    span: Span,
}

impl LogContext {
    pub fn new(scenario: &str, device: &str, browser: BrowserKind) -> Self {
        let span = tracing::info_span!(
            "scenario",
            name = %scenario,
            device = %device,
            browser = %browser
        );
        Self { span }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Run `f` with the context span entered
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        self.span.in_scope(f)
    }
}
