//! Tracing initialisation for validator binaries and tests

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Error, Result};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `log_level` when set. With a `log_dir`, a daily rolling
/// file layer is added and the returned guard must be held until shutdown so
/// buffered lines are flushed.
pub fn init_logging(log_level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| Error::logging(format!("Invalid log filter '{}': {}", log_level, e)))?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("icn-validator")
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| Error::logging(format!("Failed to open log directory {}: {}", dir.display(), e)))?;
            let (writer, guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .try_init()
                .map_err(|e| Error::logging(format!("Failed to initialize logging: {}", e)))?;

            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init()
                .map_err(|e| Error::logging(format!("Failed to initialize logging: {}", e)))?;

            Ok(None)
        }
    }
}
