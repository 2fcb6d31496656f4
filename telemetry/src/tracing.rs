//! Tracing setup shared by the loader binary and the test suites.

use std::sync::Once;

use config::Environment;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Directory the rolling log files are written to, relative to the working directory.
const LOGS_DIRECTORY: &str = "logs";

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Environment variable that turns on log output in tests.
const ENABLE_TRACING_ENV_NAME: &str = "ENABLE_TRACING";

static INIT_TEST_TRACING: Once = Once::new();

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] std::io::Error),

    #[error("failed to install the tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Keeps the non-blocking file writer alive; buffered records are flushed on drop.
#[must_use = "dropping the flusher stops file logging"]
pub struct LogFlusher {
    _file_guard: WorkerGuard,
}

/// Installs the global subscriber for `app_name`.
///
/// Records go to stderr (human readable in dev, JSON in prod) and to a daily rolling file
/// `logs/{app_name}.log.YYYY-MM-DD` in JSON. `RUST_LOG` overrides the default `info` filter.
/// Records of the `log` crate, emitted by sqlx, are bridged in by the installed subscriber.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    let environment = Environment::load()?;

    let file_appender = tracing_appender::rolling::daily(LOGS_DIRECTORY, format!("{app_name}.log"));
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    // Stdout carries the run summary only.
    let stderr_layer = match environment {
        Environment::Dev => fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
        Environment::Prod => fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };
    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(file_writer)
        .boxed();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(app_name, environment = %environment, "tracing initialized");

    Ok(LogFlusher {
        _file_guard: file_guard,
    })
}

/// Installs a test subscriber once per process when `ENABLE_TRACING` is set.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var(ENABLE_TRACING_ENV_NAME).is_err() {
            return;
        }

        let _ = fmt()
            .with_env_filter(env_filter())
            .with_test_writer()
            .try_init();
    });
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
