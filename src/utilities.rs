//! Internal utility functions.
//!
//! Timestamp ↔ frame-index conversions shared by the source and the sink.

use ffmpeg_next::Rational;

/// Rescale a PTS value from stream time base to seconds.
pub fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Rescale a PTS value to the nearest frame number.
///
/// Negative timestamps (frames before the stream's start time) map to 0.
pub fn pts_to_frame_number(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
    let seconds = pts_to_seconds(pts, time_base);
    (seconds * frames_per_second).round().max(0.0) as u64
}

/// Convert a frame number to a seek timestamp in AV_TIME_BASE (microseconds).
///
/// `input_context.seek()` (via `avformat_seek_file` with `stream_index = -1`)
/// expects timestamps in AV_TIME_BASE (1/1_000_000).
pub fn frame_number_to_seek_timestamp(frame_number: u64, frames_per_second: f64) -> i64 {
    let seconds = frame_number as f64 / frames_per_second;
    (seconds * 1_000_000.0) as i64
}

/// Build an exact rational for integral rates and approximate the rest.
pub fn frame_rate_to_rational(frames_per_second: f64) -> Rational {
    if frames_per_second.fract() == 0.0 && frames_per_second <= i32::MAX as f64 {
        Rational::new(frames_per_second as i32, 1)
    } else {
        Rational::from(frames_per_second)
    }
}
