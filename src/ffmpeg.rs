//! FFmpeg initialisation and log level configuration.
//!
//! FFmpeg has its own internal logging, separate from the Rust
//! [`log`](https://crates.io/crates/log) facade. Decoders in particular
//! print warnings to stderr that drown out the per-job diagnostics of a
//! batch run. [`set_ffmpeg_log_level`] tunes that output without importing
//! `ffmpeg-next` directly.
//!
//! # Example
//!
//! ```no_run
//! use cliptrim::FfmpegLogLevel;
//!
//! // Only let FFmpeg report errors.
//! cliptrim::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! ```
//!
//! # Note
//!
//! This controls **FFmpeg's own console output**, not the messages
//! `cliptrim` emits through the `log` crate.

use std::str::FromStr;
use std::sync::OnceLock;

use ffmpeg_next::util::log::Level;

use crate::error::TrimError;

static FFMPEG_INITIALIZED: OnceLock<Result<(), ffmpeg_next::Error>> = OnceLock::new();

/// Initialise FFmpeg once per process.
pub(crate) fn initialize() -> Result<(), TrimError> {
    FFMPEG_INITIALIZED
        .get_or_init(ffmpeg_next::init)
        .clone()
        .map_err(|error| TrimError::FfmpegError(format!("initialisation failed: {error}")))
}

/// How much FFmpeg itself prints to stderr, from silent to everything.
///
/// Each variant corresponds to one of FFmpeg's `AV_LOG_*` levels; messages
/// below the chosen level are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    Quiet,
    Panic,
    Fatal,
    Error,
    /// FFmpeg's own default.
    Warning,
    Info,
    Verbose,
    Debug,
    Trace,
}

impl From<FfmpegLogLevel> for Level {
    fn from(level: FfmpegLogLevel) -> Self {
        match level {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

/// Set FFmpeg's console verbosity for the rest of the process.
///
/// Has no effect on messages emitted through the `log` facade.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.into());
}

impl FromStr for FfmpegLogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" => Ok(FfmpegLogLevel::Quiet),
            "panic" => Ok(FfmpegLogLevel::Panic),
            "fatal" => Ok(FfmpegLogLevel::Fatal),
            "error" => Ok(FfmpegLogLevel::Error),
            "warning" | "warn" => Ok(FfmpegLogLevel::Warning),
            "info" => Ok(FfmpegLogLevel::Info),
            "verbose" => Ok(FfmpegLogLevel::Verbose),
            "debug" => Ok(FfmpegLogLevel::Debug),
            "trace" => Ok(FfmpegLogLevel::Trace),
            _ => Err(format!("unknown FFmpeg log level: {value}")),
        }
    }
}
