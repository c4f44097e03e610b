//! Source video metadata.
//!
//! [`VideoMetadata`] is read once when a [`VideoSource`](crate::VideoSource)
//! is opened and cached for the lifetime of the source.

use std::time::Duration;

use serde::Serialize;

/// Metadata for the video stream of a source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frames per second, or `0.0` when the container does not say.
    pub frames_per_second: f64,
    /// Frame count reported by the container, or estimated from the
    /// duration and frame rate. `None` when neither is available.
    pub frame_count: Option<u64>,
    /// Container duration.
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`, `"mpeg4"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"avi"`).
    pub format: String,
}

/// Pick the best available frame count.
///
/// Prefers the container's own count and falls back to
/// `duration × frames_per_second`.
pub(crate) fn resolve_frame_count(
    reported: i64,
    duration: Duration,
    frames_per_second: f64,
) -> Option<u64> {
    if reported > 0 {
        return Some(reported as u64);
    }
    if frames_per_second > 0.0 && !duration.is_zero() {
        return Some((duration.as_secs_f64() * frames_per_second) as u64);
    }
    None
}
