//! The `log` module provides initialisation and configuration of the application's logging system.
//!
//! Log messages go to stdout (warnings and errors to stderr) and, when an output directory is
//! given, to an info-level and a debug-level log file in that directory. The log level can be set
//! with the `GRIDPLAN_LOG_LEVEL` environment variable, which takes precedence over the program
//! settings.
use anyhow::{Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{Level, LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::io::IsTerminal;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// The default log level for the program.
///
/// Used as a fallback if the user hasn't specified something else with the `GRIDPLAN_LOG_LEVEL`
/// environment variable or the settings file.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The file name for the log file containing messages about the ordinary operation of the program
const LOG_INFO_FILE_NAME: &str = "gridplan_info.log";

/// The file name for the log file containing debug messages
const LOG_DEBUG_FILE_NAME: &str = "gridplan_debug.log";

/// Used to indicate whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Initialise the program logger using the `fern` logging library with colourised output.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_file_path`: The location to save log files (if any)
pub fn init(log_level_from_settings: &str, log_file_path: Option<&Path>) -> Result<()> {
    // Retrieve the log level from the environment variable or settings, or use the default
    let log_level = env::var("GRIDPLAN_LOG_LEVEL")
        .unwrap_or_else(|_| log_level_from_settings.to_string())
        .to_lowercase();

    // Convert the log level string to a log::LevelFilter
    let Ok(log_level) = LevelFilter::from_str(&log_level) else {
        bail!("Unknown log level: {log_level}");
    };

    // Set up colours for log levels
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let use_colour_stdout = std::io::stdout().is_terminal();
    let use_colour_stderr = std::io::stderr().is_terminal();

    // Informational messages to stdout, warnings and errors to stderr
    let mut dispatch = Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > Level::Warn)
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, use_colour_stdout, colours);
                })
                .level(log_level)
                .chain(std::io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, use_colour_stderr, colours);
                })
                .level(log_level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        );

    // The log files are written regardless of the console log level
    if let Some(log_file_path) = log_file_path {
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .format(write_log_plain)
                    .level(LevelFilter::Info)
                    .chain(fern::log_file(log_file_path.join(LOG_INFO_FILE_NAME))?),
            )
            .chain(
                Dispatch::new()
                    .format(write_log_plain)
                    .level(LevelFilter::Debug)
                    .chain(fern::log_file(log_file_path.join(LOG_DEBUG_FILE_NAME))?),
            );
    }

    // Apply the logger configuration
    dispatch.apply()?;

    // Mark as initialised
    LOGGER_INIT.set(()).unwrap();

    Ok(())
}

/// Write a log message, with a timestamp, the level and the module it came from
fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");

    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

/// Write a log message without colours
fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), record.target(), message);
}

/// Write a log message, optionally with colours
fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    use_colour: bool,
    colours: ColoredLevelConfig,
) {
    if use_colour {
        write_log(out, colours.color(record.level()), record.target(), message);
    } else {
        write_log_plain(out, message, record);
    }
}
