//! The run log: a tracing layer that appends replayable records to a file.
//!
//! Records are written as `YYYY-MM-DD HH:MM:SS - LEVEL - message`. Messages
//! containing newlines (prompts, model output) spill onto continuation lines,
//! which is exactly the shape [`crate::replay`] parses on the next start. The
//! file layer is pinned to INFO for this crate's events so the replay records
//! are always persisted whatever `RUST_LOG` says; console diagnostics go
//! through a separate stderr layer filtered by `RUST_LOG`.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::{EnvFilter, Targets};
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{ShelverError, ShelverResult};

/// Timestamp layout of a record line; replay keys on the leading year.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Event formatter producing run-log record lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLogFormat;

/// Level names as they appear in the log (and in logs written by older tools).
fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

impl<S, N> FormatEvent<S, N> for RunLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
        write!(
            writer,
            "{timestamp} - {} - ",
            level_name(event.metadata().level())
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Open `path` for appending, creating it (and its directory) if needed.
pub fn open_log(path: &Path) -> ShelverResult<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ShelverError::LogOpen {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ShelverError::LogOpen {
            path: path.display().to_string(),
            source: e,
        })
}

/// A layer appending this crate's INFO-and-above events to `file`.
pub fn run_log_layer<S>(file: File) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .event_format(RunLogFormat)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_filter(Targets::new().with_target(env!("CARGO_CRATE_NAME"), Level::INFO))
}

/// Install the global subscriber: run log file + stderr console.
///
/// Console verbosity follows `RUST_LOG` and defaults to warnings only, since
/// user-facing progress is printed separately.
pub fn init(log_path: &Path) -> ShelverResult<()> {
    let file = open_log(log_path)?;

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        );

    tracing_subscriber::registry()
        .with(run_log_layer(file))
        .with(console)
        .try_init()
        .ok(); // Ignore error if a subscriber is already set (e.g., in tests)

    Ok(())
}
