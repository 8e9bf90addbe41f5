// Import color configuration for pretty terminal output using fern
use fern::colors::{Color, ColoredLevelConfig};

// Import local time formatting tools from chrono
use chrono::Local;

// Set the global log level (e.g., Debug, Info, Warn, Error)
use log::LevelFilter;

use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

// Used to initialize a static value only once in a thread-safe way
use std::sync::OnceLock;

/// Logging settings shared by the server and client configs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum level, parsed by `log::LevelFilter` ("debug", "info", ...)
    pub level: String,

    /// Also write a `<name>.log` file next to the process
    pub to_file: bool,

    /// Explicit log file path; wins over `to_file`
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            to_file: false,
            file: None,
        }
    }
}

impl LogConfig {
    /// Unknown level names fall back to INFO.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.level).unwrap_or(LevelFilter::Info)
    }

    /// Where the file branch writes, if there is one.
    pub fn file_path(&self, name: &str) -> Option<PathBuf> {
        match (&self.file, self.to_file) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => Some(PathBuf::from(format!("{}.log", name.replace('.', "_")))),
            (None, false) => None,
        }
    }
}

/// A simple Logger struct that wraps logging functions.
/// Clonable to allow use across the reactor and receiver threads.
#[derive(Clone, Debug, Default)]
pub struct Logger;

impl Logger {
    pub fn debug(&self, msg: &str) {
        log::debug!("{}", msg);
    }

    /// Logs a message at INFO level
    pub fn info(&self, msg: &str) {
        log::info!("{}", msg);
    }

    /// Logs a message at WARN level
    pub fn warn(&self, msg: &str) {
        log::warn!("{}", msg);
    }

    /// Logs a message at ERROR level
    pub fn error(&self, msg: &str) {
        log::error!("{}", msg);
    }
}

/// Static global LOGGER instance, initialized once
static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Initializes and returns the global logger with:
/// - Colored console output on stdout
/// - An optional timestamped file branch (see [`LogConfig::file_path`])
///
/// Only the first call configures the dispatch; later calls get the same handle.
pub fn get_logger(name: &str, config: &LogConfig) -> Logger {
    LOGGER
        .get_or_init(|| {
            let colors = ColoredLevelConfig::new()
                .info(Color::Green)
                .warn(Color::Yellow)
                .error(Color::Red)
                .debug(Color::Blue)
                .trace(Color::Magenta);

            let console_name = name.to_string();
            let log_format_console = move |out: fern::FormatCallback, message: &std::fmt::Arguments, record: &log::Record| {
                out.finish(format_args!(
                    "\x1b[92m{}\x1b[0m - \x1b[94m{}\x1b[0m - {} - {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    console_name,
                    colors.color(record.level()),
                    message
                ))
            };

            let mut dispatch = fern::Dispatch::new().level(config.level_filter()).chain(
                fern::Dispatch::new()
                    .format(log_format_console)
                    .chain(std::io::stdout()),
            );

            // [timestamp] - [logger name] - [log level] - [message]
            if let Some(path) = config.file_path(name) {
                let file_name = name.to_string();
                match fern::log_file(&path) {
                    Ok(file) => {
                        dispatch = dispatch.chain(
                            fern::Dispatch::new()
                                .format(move |out, message, record| {
                                    out.finish(format_args!(
                                        "{} - {} - {} - {}",
                                        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                                        file_name,
                                        record.level(),
                                        message
                                    ))
                                })
                                .chain(file),
                        );
                    }
                    Err(e) => eprintln!("Warning: cannot open log file {}: {}", path.display(), e),
                }
            }

            // Another crate (or a test harness) may already own the global logger
            if let Err(e) = dispatch.apply() {
                eprintln!("Warning: logger already initialized: {}", e);
            }

            Logger
        })
        .clone()
}
