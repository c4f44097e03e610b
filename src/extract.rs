//! Frame-range extraction.
//!
//! The copy itself only needs two capabilities: something that yields
//! decoded frames ([`FrameSource`]) and something that accepts them
//! ([`FrameSink`]). [`extract_range`] drives one from the other for a
//! [`FrameWindow`]; [`extract_clip`] adds the time parsing and window
//! computation on top; [`trim_video`] wires in the FFmpeg-backed
//! [`VideoSource`] and [`VideoSink`].
//!
//! Each call goes through `Opened → RangeComputed → Copying → Closed`.
//! Once a sink has been opened it is finished exactly once, whatever
//! happens during the copy.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use serde::Serialize;

use crate::{
    config::TrimOptions,
    encode::VideoSink,
    error::TrimError,
    metadata::VideoMetadata,
    progress::{OperationType, ProgressTracker},
    source::VideoSource,
    timespec::{TimeSpec, parse_mmss, to_seconds},
    window::{EndFrame, FrameWindow},
};

/// A sequential supplier of decoded frames.
pub trait FrameSource {
    /// The decoded frame type.
    type Frame;

    /// Metadata describing the source stream.
    fn metadata(&self) -> &VideoMetadata;

    /// Position the read cursor so that the next call to
    /// [`next_frame`](FrameSource::next_frame) yields `frame_number`.
    fn seek_to_frame(&mut self, frame_number: u64) -> Result<(), TrimError>;

    /// Read the next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, TrimError>;
}

/// A destination that accepts frames and is finalized once.
pub trait FrameSink {
    /// The frame type accepted by this sink.
    type Frame;

    /// Append one frame.
    fn write_frame(&mut self, frame: &Self::Frame) -> Result<(), TrimError>;

    /// Flush and close the destination.
    fn finish(self) -> Result<(), TrimError>;
}

/// One row of work: copy `[start, end)` of `source_path` into
/// `destination_path`.
///
/// `start` and `end` are kept as raw text; they are parsed when the job runs
/// so that malformed values are reported against the job that carries them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionJob {
    /// Video to read.
    pub source_path: PathBuf,
    /// Clip to create.
    pub destination_path: PathBuf,
    /// Start time as written in the manifest.
    pub start: Option<String>,
    /// End time as written in the manifest.
    pub end: Option<String>,
}

impl ExtractionJob {
    /// Create a job from paths and optional `mm:ss` times.
    pub fn new(
        source_path: impl Into<PathBuf>,
        destination_path: impl Into<PathBuf>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            destination_path: destination_path.into(),
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        }
    }
}

/// What a finished extraction did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    /// The window that was requested.
    pub window: FrameWindow,
    /// Frames actually written to the sink.
    pub frames_written: u64,
    /// `true` when the source ran out before a requested end time was
    /// reached.
    pub short_source: bool,
}

impl Display for ExtractionReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} frames from {}", self.frames_written, self.window)?;
        if self.short_source {
            f.write_str(" (source ended early)")?;
        }
        Ok(())
    }
}

/// Copy `window` from `source` into a sink created by `open_sink`.
///
/// The sink is opened before the first frame is read and finished on every
/// path after that, including decode/encode errors and cancellation. When
/// both the copy and the finish fail, the copy error is returned.
///
/// # Errors
///
/// - Any error from `open_sink` (no sink is finished in that case).
/// - [`TrimError::Cancelled`] if the configured token is cancelled.
/// - Decode, encode, or write errors from the source or sink.
pub fn extract_range<S, K, F>(
    source: &mut S,
    window: FrameWindow,
    open_sink: F,
    options: &TrimOptions,
) -> Result<ExtractionReport, TrimError>
where
    S: FrameSource,
    K: FrameSink<Frame = S::Frame>,
    F: FnOnce() -> Result<K, TrimError>,
{
    let mut sink = open_sink()?;
    let copied = copy_frames(source, &mut sink, window, options);
    let finished = sink.finish();

    match (copied, finished) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(error)) => Err(error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(finish_error)) => {
            log::warn!("failed to finalize output after error: {finish_error}");
            Err(error)
        }
    }
}

fn copy_frames<S, K>(
    source: &mut S,
    sink: &mut K,
    window: FrameWindow,
    options: &TrimOptions,
) -> Result<ExtractionReport, TrimError>
where
    S: FrameSource,
    K: FrameSink<Frame = S::Frame>,
{
    source.seek_to_frame(window.start_frame)?;

    let total = window.total_frames();
    let mut tracker = ProgressTracker::new(
        options.progress.clone(),
        OperationType::FrameCopy,
        total,
        options.batch_size,
    );
    let mut short_source = false;

    while !total.is_some_and(|total| tracker.current() >= total) {
        if options.is_cancelled() {
            tracker.finish();
            return Err(TrimError::Cancelled);
        }

        let Some(frame) = source.next_frame()? else {
            // Only a requested end time can come up short.
            short_source = matches!(window.end_frame, EndFrame::At(_));
            break;
        };
        sink.write_frame(&frame)?;
        tracker.advance(Some(window.start_frame + tracker.current()));
    }

    tracker.finish();
    let frames_written = tracker.current();

    Ok(ExtractionReport {
        window,
        frames_written,
        short_source,
    })
}

/// Parse `start`/`end`, compute the window for `source`, and copy it.
///
/// Missing or invalid times fall back to the start and end of the source.
/// Every diagnostic about the times is prefixed with `label`, usually the
/// source path, so that it can be told apart from other jobs' output.
/// `open_sink` receives the source metadata and the frame rate in effect so
/// the destination can match the source's dimensions.
///
/// # Errors
///
/// - [`TrimError::InvalidRange`] when the window is empty or inverted; no
///   sink is opened in that case.
/// - Any error from [`extract_range`].
pub fn extract_clip<S, K, F>(
    source: &mut S,
    label: &str,
    start: Option<&str>,
    end: Option<&str>,
    open_sink: F,
    options: &TrimOptions,
) -> Result<ExtractionReport, TrimError>
where
    S: FrameSource,
    K: FrameSink<Frame = S::Frame>,
    F: FnOnce(&VideoMetadata, f64) -> Result<K, TrimError>,
{
    let metadata = source.metadata().clone();
    let frames_per_second = options.frame_rate.resolve(&metadata);

    let window = FrameWindow::compute(
        &parse_time(label, "start_time", start),
        &parse_time(label, "end_time", end),
        frames_per_second,
        metadata.frame_count,
    );

    log::info!(
        "{label}: clipping section: {}-{}. Frames {window}, total frames: {}",
        start.unwrap_or("-"),
        end.unwrap_or("-"),
        window
            .total_frames()
            .map_or_else(|| "until end of source".to_string(), |total| total.to_string()),
    );

    window.validate()?;

    let report = extract_range(
        source,
        window,
        || open_sink(&metadata, frames_per_second),
        options,
    )?;

    let shortfall = window
        .total_frames()
        .filter(|&total| report.frames_written < total);
    if let Some(total) = shortfall {
        if report.short_source {
            log::warn!(
                "{label}: source ran out after {} of {total} requested frames",
                report.frames_written
            );
        } else {
            log::debug!(
                "{label}: source has {} of the {total} frames it reported",
                report.frames_written
            );
        }
    }

    Ok(report)
}

/// [`parse_mmss`] plus the diagnostics for values that cannot be used.
fn parse_time(label: &str, field: &str, value: Option<&str>) -> TimeSpec {
    let time = parse_mmss(value);
    if let TimeSpec::Malformed(text) = &time {
        if let Err(error) = to_seconds(text) {
            log::error!("{label}: `{field}` ignored: {error}");
        }
    }
    if time.seconds().is_none() {
        log::warn!("{label}: `{field}` is not set.");
    }
    time
}

/// Trim one video file according to `job`.
///
/// Opens the source with FFmpeg, creates the destination with the source's
/// dimensions, and copies the requested window.
///
/// # Errors
///
/// - [`TrimError::OutputExists`] if the destination exists and overwriting
///   is off.
/// - [`TrimError::FileOpen`] / [`TrimError::NoVideoStream`] if the source
///   cannot be used.
/// - Any error from [`extract_clip`].
///
/// # Example
///
/// ```no_run
/// use cliptrim::{ExtractionJob, TrimError, TrimOptions};
///
/// let job = ExtractionJob::new("input.mp4", "000.avi", Some("00:01"), Some("00:05"));
/// let report = cliptrim::trim_video(&job, &TrimOptions::new())?;
/// println!("{report}");
/// # Ok::<(), TrimError>(())
/// ```
pub fn trim_video(job: &ExtractionJob, options: &TrimOptions) -> Result<ExtractionReport, TrimError> {
    if job.destination_path.exists() && !options.overwrite {
        return Err(TrimError::OutputExists(job.destination_path.clone()));
    }

    let mut source = VideoSource::open(&job.source_path)?;
    let label = job.source_path.display().to_string();

    extract_clip(
        &mut source,
        &label,
        job.start.as_deref(),
        job.end.as_deref(),
        |metadata, frames_per_second| {
            VideoSink::create(
                &job.destination_path,
                metadata.width,
                metadata.height,
                frames_per_second,
                &options.encoder,
            )
        },
        options,
    )
}
