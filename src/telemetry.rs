//! Logging setup and standard spans.

use std::fs::OpenOptions;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::{LogConfig, LogFormat, LogSink};

/// Errors installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{directive}': {reason}")]
    Filter { directive: String, reason: String },
    #[error("log.path is required for the file sink")]
    MissingPath,
    #[error("failed to open log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to install subscriber: {0}")]
    Install(String),
}

/// Install the global `tracing` subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.level`. Raw protocol lines are
/// logged under [`WIRE_TARGET`](crate::connection::WIRE_TARGET), so
/// `RUST_LOG=info,slirc_bot::wire=trace` shows the wire without turning on
/// every other trace.
pub fn init(config: &LogConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::Filter {
            directive: config.level.clone(),
            reason: e.to_string(),
        })?,
    };

    let writer = match config.sink {
        LogSink::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogSink::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogSink::File => {
            let path = config.path.as_ref().ok_or(TelemetryError::MissingPath)?;
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(writer);

    let installed = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| TelemetryError::Install(e.to_string()))
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span wrapping every task of one session.
    pub fn session(server: &str, generation: u64) -> Span {
        info_span!("session", server = %server, generation)
    }
}
