//! Frame-window arithmetic.
//!
//! A [`FrameWindow`] is the half-open range `[start_frame, end_frame)` of
//! source frame indices a job copies. Indices are derived from manifest
//! times with a single frame rate and truncated toward zero.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::Serialize;

use crate::{error::TrimError, timespec::TimeSpec};

/// Exclusive end of a frame window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndFrame {
    /// Stop before this frame index, taken from a requested end time.
    At(u64),
    /// Stop at the frame count the source reports. Containers often
    /// overstate it, so running out early is expected.
    SourceLength(u64),
    /// Copy until the source runs out of frames.
    Unbounded,
}

impl EndFrame {
    /// The exclusive end index, if the window is bounded.
    pub fn frame(self) -> Option<u64> {
        match self {
            EndFrame::At(frame) | EndFrame::SourceLength(frame) => Some(frame),
            EndFrame::Unbounded => None,
        }
    }
}

impl Display for EndFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.frame() {
            Some(frame) => write!(f, "{frame}"),
            None => f.write_str("end"),
        }
    }
}

/// The `[start_frame, end_frame)` range of frames to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameWindow {
    /// First frame to copy.
    pub start_frame: u64,
    /// Exclusive end of the copy.
    pub end_frame: EndFrame,
}

impl FrameWindow {
    /// Compute the window for a job.
    ///
    /// `start` falls back to frame 0 and `end` falls back to
    /// `source_frame_count` ([`EndFrame::SourceLength`]), or
    /// [`EndFrame::Unbounded`] when the source does not report a count.
    pub fn compute(
        start: &TimeSpec,
        end: &TimeSpec,
        frames_per_second: f64,
        source_frame_count: Option<u64>,
    ) -> Self {
        let start_frame = start
            .seconds()
            .map_or(0, |seconds| seconds_to_frame(seconds, frames_per_second));

        let end_frame = match end.seconds() {
            Some(seconds) => EndFrame::At(seconds_to_frame(seconds, frames_per_second)),
            None => source_frame_count.map_or(EndFrame::Unbounded, EndFrame::SourceLength),
        };

        Self {
            start_frame,
            end_frame,
        }
    }

    /// Number of frames the window spans, or `None` when unbounded.
    ///
    /// An inverted window yields `Some(0)`; use [`validate`](Self::validate)
    /// to reject it.
    pub fn total_frames(&self) -> Option<u64> {
        self.end_frame
            .frame()
            .map(|end| end.saturating_sub(self.start_frame))
    }

    /// Reject empty and inverted windows.
    ///
    /// # Errors
    ///
    /// Returns [`TrimError::InvalidRange`] when `end_frame <= start_frame`.
    pub fn validate(&self) -> Result<(), TrimError> {
        match self.end_frame.frame() {
            Some(end) if end <= self.start_frame => Err(TrimError::InvalidRange {
                start_frame: self.start_frame,
                end_frame: end,
            }),
            _ => Ok(()),
        }
    }
}

impl Display for FrameWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}, {})", self.start_frame, self.end_frame)
    }
}

/// `floor(seconds × fps)`.
pub fn seconds_to_frame(seconds: u64, frames_per_second: f64) -> u64 {
    (seconds as f64 * frames_per_second) as u64
}
