//! Diagnostics logging for the probe binaries.
//!
//! The probe report owns stdout, so diagnostics go to stderr or to a JSON
//! lines file, never to stdout.
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::{debug, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

pub const OBSERVABILITY_ENABLED_ENV: &str = "STREAM_DELAY_OBSERVABILITY_ENABLED";
pub const LOG_LEVEL_ENV: &str = "STREAM_DELAY_LOG_LEVEL";
pub const JSON_LOG_PATH_ENV: &str = "STREAM_DELAY_JSON_LOG_PATH";

const DEFAULT_FILTER: &str = "warn";
const DEFAULT_LOG_FILE: &str = "stream-delay.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Where diagnostics are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogSink {
    Off,
    Stderr,
    JsonFile(PathBuf),
}

/// Resolved logging settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub sink: LogSink,
    /// `EnvFilter` directive, already validated.
    pub filter: String,
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`.
    ///
    /// - `STREAM_DELAY_OBSERVABILITY_ENABLED`: on/off switch, on when unset or
    ///   unrecognized.
    /// - `STREAM_DELAY_LOG_LEVEL`, then `RUST_LOG`: first valid filter wins,
    ///   `warn` otherwise.
    /// - `STREAM_DELAY_JSON_LOG_PATH`: JSON lines file instead of stderr.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup(OBSERVABILITY_ENABLED_ENV)
            .and_then(|value| parse_switch(&value))
            .unwrap_or(true);

        let filter = [LOG_LEVEL_ENV, "RUST_LOG"]
            .into_iter()
            .filter_map(&lookup)
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty() && EnvFilter::try_new(value).is_ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        let sink = if !enabled {
            LogSink::Off
        } else {
            match lookup(JSON_LOG_PATH_ENV).filter(|path| !path.trim().is_empty()) {
                Some(path) => LogSink::JsonFile(PathBuf::from(path.trim())),
                None => LogSink::Stderr,
            }
        };

        Self { sink, filter }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

fn json_file_appender(path: &Path) -> Result<RollingFileAppender, tracing_appender::rolling::InitError> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    let _ = std::fs::create_dir_all(dir);
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
}

/// Initializes diagnostics from the environment, once per process.
pub fn init_observability() {
    init_with(&LogSettings::from_env());
}

/// Initializes diagnostics with explicit settings. Later calls are no-ops.
pub fn init_with(settings: &LogSettings) {
    INIT.get_or_init(|| {
        let registry = tracing_subscriber::registry().with(settings.env_filter());
        let installed = match &settings.sink {
            LogSink::Off => return,
            LogSink::Stderr => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogSink::JsonFile(path) => match json_file_appender(path) {
                Ok(appender) => registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_current_span(true)
                            .with_target(false)
                            .with_writer(appender),
                    )
                    .try_init(),
                Err(err) => {
                    let installed = registry
                        .with(
                            tracing_subscriber::fmt::layer()
                                .compact()
                                .with_target(false)
                                .with_writer(std::io::stderr),
                        )
                        .try_init();
                    warn!(path = %path.display(), error = %err, "JSON log file unavailable, logging to stderr");
                    installed
                }
            },
        };
        // Fails when another global subscriber is already installed.
        if installed.is_ok() {
            debug!(sink = ?settings.sink, filter = %settings.filter, "diagnostics initialized");
        }
    });
}
