//! Trim configuration.
//!
//! [`TrimOptions`] is a builder that threads the frame-rate policy, encoder
//! settings, progress callbacks, and cancellation tokens through the trim
//! functions without polluting every signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cliptrim::{CancellationToken, FrameRatePolicy, LogProgress, TrimOptions, VideoCodec};
//!
//! let token = CancellationToken::new();
//! let options = TrimOptions::new()
//!     .with_frame_rate(FrameRatePolicy::Source)
//!     .with_codec(VideoCodec::H264)
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone())
//!     .with_batch_size(30);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;

use crate::encode::{VideoCodec, VideoEncoderOptions};
use crate::metadata::VideoMetadata;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Frame rate assumed when no other rate is configured or available.
pub const DEFAULT_FRAMES_PER_SECOND: f64 = 30.0;

/// How manifest times are turned into frame indices.
///
/// The default is a fixed 30 fps regardless of the source's real rate.
/// Clips cut from sources at other rates will start and end at the wrong
/// place unless [`FrameRatePolicy::Source`] or a matching fixed rate is used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameRatePolicy {
    /// Always use this rate.
    Fixed(f64),
    /// Use the source's average frame rate, falling back to
    /// [`DEFAULT_FRAMES_PER_SECOND`] when the source does not report one.
    Source,
}

impl Default for FrameRatePolicy {
    fn default() -> Self {
        FrameRatePolicy::Fixed(DEFAULT_FRAMES_PER_SECOND)
    }
}

impl FrameRatePolicy {
    /// Resolve the rate to use for a given source.
    ///
    /// Zero, negative, and non-finite rates are never returned; they are
    /// replaced by [`DEFAULT_FRAMES_PER_SECOND`] with a warning.
    pub fn resolve(self, metadata: &VideoMetadata) -> f64 {
        match self {
            FrameRatePolicy::Fixed(rate) if is_usable_rate(rate) => rate,
            FrameRatePolicy::Fixed(rate) => {
                log::warn!(
                    "invalid frame rate {rate}, assuming {DEFAULT_FRAMES_PER_SECOND} fps"
                );
                DEFAULT_FRAMES_PER_SECOND
            }
            FrameRatePolicy::Source if is_usable_rate(metadata.frames_per_second) => {
                metadata.frames_per_second
            }
            FrameRatePolicy::Source => {
                log::warn!(
                    "source does not report a frame rate, assuming {DEFAULT_FRAMES_PER_SECOND} fps"
                );
                DEFAULT_FRAMES_PER_SECOND
            }
        }
    }
}

fn is_usable_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

impl FromStr for FrameRatePolicy {
    type Err = String;

    /// Accepts `source` or a positive number of frames per second.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("source") {
            return Ok(FrameRatePolicy::Source);
        }
        match value.parse::<f64>() {
            Ok(rate) if is_usable_rate(rate) => Ok(FrameRatePolicy::Fixed(rate)),
            _ => Err(format!("expected `source` or a positive frame rate, got {value:?}")),
        }
    }
}

/// Configuration for trim operations.
///
/// A default-constructed value reproduces the classic behaviour: 30 fps
/// frame arithmetic, MPEG-4 Part 2 output, no progress, no cancellation,
/// and no overwriting of existing files.
#[derive(Clone)]
pub struct TrimOptions {
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Cancellation token. `None` means never cancelled.
    pub(crate) cancellation: Option<CancellationToken>,
    /// How often to fire the progress callback (every N frames).
    pub(crate) batch_size: u64,
    pub(crate) frame_rate: FrameRatePolicy,
    pub(crate) encoder: VideoEncoderOptions,
    /// Replace destinations that already exist.
    pub(crate) overwrite: bool,
}

impl Debug for TrimOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TrimOptions")
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .field("frame_rate", &self.frame_rate)
            .field("encoder", &self.encoder)
            .field("overwrite", &self.overwrite)
            .finish_non_exhaustive()
    }
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl TrimOptions {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
            frame_rate: FrameRatePolicy::default(),
            encoder: VideoEncoderOptions::default(),
            overwrite: false,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled the copy loop stops before its next
    /// frame, finalizes the clip written so far, and returns
    /// [`TrimError::Cancelled`](crate::TrimError::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires.
    ///
    /// A value of 1 means every frame. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the frame-rate policy used for time → frame conversion and for
    /// the output stream.
    #[must_use]
    pub fn with_frame_rate(mut self, policy: FrameRatePolicy) -> Self {
        self.frame_rate = policy;
        self
    }

    /// Set the output codec.
    #[must_use]
    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.encoder.codec = codec;
        self
    }

    /// Set the complete encoder configuration.
    #[must_use]
    pub fn with_encoder(mut self, encoder: VideoEncoderOptions) -> Self {
        self.encoder = encoder;
        self
    }

    /// Allow replacing destinations that already exist.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// The configured frame-rate policy.
    pub fn frame_rate(&self) -> FrameRatePolicy {
        self.frame_rate
    }

    /// The configured encoder settings.
    pub fn encoder(&self) -> &VideoEncoderOptions {
        &self.encoder
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
