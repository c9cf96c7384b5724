//! Tracing setup for the server binary.
//!
//! `GEOTRACK_ENV=production` writes JSON to a daily rolling file and compact
//! plain text to stdout for the journal. Anything else gets pretty stdout with
//! span open/close events. The filter comes from `RUST_LOG`, falling back to
//! `GEOTRACK_LOG_LEVEL` and then `info`.

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the fallback log filter.
pub const LOG_LEVEL_ENV: &str = "GEOTRACK_LOG_LEVEL";

/// Environment variable selecting production mode when set to `production`.
pub const ENVIRONMENT_ENV: &str = "GEOTRACK_ENV";

const DEFAULT_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "geotrack";

// Dropping these stops the background writers.
static WRITER_GUARDS: OnceLock<[WorkerGuard; 2]> = OnceLock::new();

/// Whether `GEOTRACK_ENV` selects production logging.
#[must_use]
pub fn is_production() -> bool {
    std::env::var(ENVIRONMENT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("production"))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter does not parse or a subscriber is already
/// installed.
pub fn init(is_production: bool) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter()?);

    if !is_production {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE),
            )
            .try_init()?;
        return Ok(());
    }

    let log_dir = log_directory();
    let _ = std::fs::create_dir_all(&log_dir);
    let (file_writer, file_guard) = tracing_appender::non_blocking(RollingFileAppender::new(
        Rotation::DAILY,
        &log_dir,
        LOG_FILE_PREFIX,
    ));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    registry
        .with(
            fmt::layer()
                .json()
                .with_writer(file_writer)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(fmt::layer().compact().with_writer(stdout_writer).with_ansi(false))
        .try_init()?;

    let _ = WRITER_GUARDS.set([file_guard, stdout_guard]);
    Ok(())
}

fn env_filter() -> Result<EnvFilter, ParseError> {
    EnvFilter::try_from_default_env().or_else(|_| {
        let fallback = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_owned());
        EnvFilter::try_new(fallback)
    })
}

fn log_directory() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/log/geotrack")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "geotrack")
            .map_or_else(|| PathBuf::from("./logs"), |dirs| dirs.data_dir().join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_is_named_for_the_app() {
        let dir = log_directory();
        assert!(dir.to_string_lossy().contains("geotrack") || dir.ends_with("logs"));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
