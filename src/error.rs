//! Error types for the `cliptrim` crate.
//!
//! This module defines [`TrimError`], the unified error type returned by all
//! fallible operations in the crate. Errors carry the context needed to tell
//! which job, file, or value went wrong: paths, frame numbers, and upstream
//! FFmpeg messages.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `cliptrim` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrimError {
    /// The source video could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The encoder could not be found, configured, or fed.
    #[error("Video encoding error: {0}")]
    VideoEncodeError(String),

    /// The output container could not be written.
    #[error("Video write error: {0}")]
    VideoWriteError(String),

    /// A value passed the `mm:ss` shape check but is not a valid
    /// minutes/seconds pair.
    #[error("Invalid time {value:?}: {reason} (expected mm:ss)")]
    TimeConversion {
        /// The offending value as it appeared in the input.
        value: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// The computed frame window is empty or inverted.
    #[error("Invalid range: start frame {start_frame} must be less than end frame {end_frame}")]
    InvalidRange {
        /// First frame of the window.
        start_frame: u64,
        /// Exclusive end frame of the window.
        end_frame: u64,
    },

    /// The manifest could not be read or is missing required columns.
    #[error("Manifest error in {path}: {reason}")]
    Manifest {
        /// Path of the manifest file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The destination already exists and overwriting was not requested.
    #[error("Output already exists: {0} (use --overwrite to replace)")]
    OutputExists(PathBuf),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// The worker pool for parallel batches could not be built.
    #[cfg(feature = "rayon")]
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<FfmpegError> for TrimError {
    fn from(error: FfmpegError) -> Self {
        TrimError::FfmpegError(error.to_string())
    }
}
