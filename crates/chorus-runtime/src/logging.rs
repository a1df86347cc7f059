//! Logging setup for the Chorus runtime.
//!
//! A unified `tracing` + `tracing-subscriber` configuration, driven by
//! [`LoggingConfig`] or assembled manually via [`LoggingBuilder`].
//!
//! ```rust,ignore
//! use chorus_runtime::logging;
//!
//! // From loaded configuration:
//! logging::init_from_config(&config.logging);
//!
//! // Or manually:
//! logging::LoggingBuilder::new()
//!     .directive("chorus=debug")
//!     .init();
//! ```

use std::sync::OnceLock;

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingConfig};

// Keeps the non-blocking file writer alive for the process lifetime.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initializes logging from configuration. Safe to call more than once;
/// later calls are no-ops with a warning.
pub fn init_from_config(config: &LoggingConfig) {
    let mut builder = LoggingBuilder::new()
        .directive(&config.level)
        .format(config.format);
    if let Some(file) = &config.file {
        builder = builder.file(file.clone());
    }
    builder.init();
}

/// Builder for the tracing subscriber.
pub struct LoggingBuilder {
    directives: Vec<String>,
    format: LogFormat,
    file: Option<std::path::PathBuf>,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Creates a builder with the default "info" level.
    pub fn new() -> Self {
        Self {
            directives: Vec::new(),
            format: LogFormat::Pretty,
            file: None,
        }
    }

    /// Adds a filter directive (a level like "debug", or a full
    /// `target=level` directive). `RUST_LOG` still takes precedence.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Sets the output format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Routes output to a file instead of stderr.
    pub fn file(mut self, path: std::path::PathBuf) -> Self {
        self.file = Some(path);
        self
    }

    /// Installs the subscriber. A second initialization (for example in
    /// tests) is a warning, not an error.
    pub fn init(self) {
        let mut filter = EnvFilter::from_default_env();
        for directive in &self.directives {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(err) => warn!(directive = %directive, error = %err, "Ignoring bad log directive"),
            }
        }

        let result = match &self.file {
            Some(path) => {
                let appender = tracing_appender::rolling::never(
                    path.parent().unwrap_or_else(|| std::path::Path::new(".")),
                    path.file_name().unwrap_or_else(|| "chorus.log".as_ref()),
                );
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                match self.format {
                    LogFormat::Pretty => fmt()
                        .with_env_filter(filter)
                        .with_writer(writer)
                        .with_ansi(false)
                        .try_init(),
                    LogFormat::Compact => fmt()
                        .compact()
                        .with_env_filter(filter)
                        .with_writer(writer)
                        .with_ansi(false)
                        .try_init(),
                }
            }
            None => match self.format {
                LogFormat::Pretty => fmt().with_env_filter(filter).try_init(),
                LogFormat::Compact => fmt().compact().with_env_filter(filter).try_init(),
            },
        };

        if result.is_err() {
            warn!("Logging already initialized, keeping the existing subscriber");
        }
    }
}
