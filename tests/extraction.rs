//! Frame-copy tests against in-memory sources and sinks.
//!
//! Frames are plain `u64` indices so that every test can check exactly
//! which frames reached the sink.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cliptrim::{
    CancellationToken, EndFrame, FrameRatePolicy, FrameSink, FrameSource, FrameWindow,
    ProgressCallback, ProgressInfo, TrimError, TrimOptions, VideoMetadata, extract_clip,
    extract_range,
};

fn metadata(frame_count: Option<u64>, frames_per_second: f64) -> VideoMetadata {
    VideoMetadata {
        width: 64,
        height: 48,
        frames_per_second,
        frame_count,
        duration: Duration::from_secs(10),
        codec: "fake".to_string(),
        format: "fake".to_string(),
    }
}

/// Yields frames `0..available`, optionally failing when it reaches
/// `fail_at`.
struct CountingSource {
    metadata: VideoMetadata,
    available: u64,
    position: u64,
    fail_at: Option<u64>,
    seeks: Vec<u64>,
}

impl CountingSource {
    fn new(available: u64, reported: Option<u64>) -> Self {
        Self {
            metadata: metadata(reported, 30.0),
            available,
            position: 0,
            fail_at: None,
            seeks: Vec::new(),
        }
    }
}

impl FrameSource for CountingSource {
    type Frame = u64;

    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn seek_to_frame(&mut self, frame_number: u64) -> Result<(), TrimError> {
        self.seeks.push(frame_number);
        self.position = frame_number;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<u64>, TrimError> {
        if self.fail_at == Some(self.position) {
            return Err(TrimError::VideoDecodeError(format!(
                "corrupt packet at frame {}",
                self.position
            )));
        }
        if self.position >= self.available {
            return Ok(None);
        }
        let frame = self.position;
        self.position += 1;
        Ok(Some(frame))
    }
}

#[derive(Debug, Default)]
struct SinkLog {
    opened: u32,
    frames: Vec<u64>,
    finished: u32,
}

struct RecordingSink {
    log: Rc<RefCell<SinkLog>>,
    fail_finish: bool,
}

impl FrameSink for RecordingSink {
    type Frame = u64;

    fn write_frame(&mut self, frame: &u64) -> Result<(), TrimError> {
        self.log.borrow_mut().frames.push(*frame);
        Ok(())
    }

    fn finish(self) -> Result<(), TrimError> {
        self.log.borrow_mut().finished += 1;
        if self.fail_finish {
            return Err(TrimError::VideoWriteError("trailer rejected".to_string()));
        }
        Ok(())
    }
}

fn opener(
    log: &Rc<RefCell<SinkLog>>,
) -> impl FnOnce(&VideoMetadata, f64) -> Result<RecordingSink, TrimError> + '_ {
    move |_: &VideoMetadata, _: f64| {
        log.borrow_mut().opened += 1;
        Ok(RecordingSink {
            log: Rc::clone(log),
            fail_finish: false,
        })
    }
}

#[test]
fn copies_exactly_the_requested_window() {
    let mut source = CountingSource::new(300, Some(300));
    let log = Rc::new(RefCell::new(SinkLog::default()));

    let report = extract_clip(
        &mut source,
        "clip.mp4",
        Some("00:01"),
        Some("00:05"),
        opener(&log),
        &TrimOptions::new(),
    )
    .unwrap();

    let log = log.borrow();
    assert_eq!(report.frames_written, 120);
    assert!(!report.short_source);
    assert_eq!(log.frames, (30..150).collect::<Vec<_>>());
    assert_eq!(log.opened, 1);
    assert_eq!(log.finished, 1);
    assert_eq!(source.seeks, vec![30]);
}

#[test]
fn missing_times_copy_the_whole_source() {
    let mut source = CountingSource::new(300, Some(300));
    let log = Rc::new(RefCell::new(SinkLog::default()));

    let report = extract_clip(
        &mut source,
        "clip.mp4",
        None,
        None,
        opener(&log),
        &TrimOptions::new(),
    )
    .unwrap();

    assert_eq!(report.window.start_frame, 0);
    assert_eq!(report.window.end_frame, EndFrame::SourceLength(300));
    assert_eq!(report.frames_written, 300);
    assert_eq!(log.borrow().frames, (0..300).collect::<Vec<_>>());
    assert_eq!(log.borrow().finished, 1);
}

#[test]
fn malformed_times_fall_back_to_source_bounds() {
    let mut source = CountingSource::new(300, Some(300));
    let log = Rc::new(RefCell::new(SinkLog::default()));

    let report = extract_clip(
        &mut source,
        "clip.mp4",
        Some("abc"),
        Some("02:75"),
        opener(&log),
        &TrimOptions::new(),
    )
    .unwrap();

    assert_eq!(report.frames_written, 300);
    assert_eq!(log.borrow().frames.first(), Some(&0));
    assert_eq!(log.borrow().frames.last(), Some(&299));
}

#[test]
fn short_source_stops_cleanly() {
    let mut source = CountingSource::new(300, Some(300));
    let log = Rc::new(RefCell::new(SinkLog::default()));

    let report = extract_clip(
        &mut source,
        "clip.mp4",
        Some("00:05"),
        Some("00:15"),
        opener(&log),
        &TrimOptions::new(),
    )
    .unwrap();

    assert_eq!(report.window.end_frame, EndFrame::At(450));
    assert_eq!(report.frames_written, 150);
    assert!(report.short_source);
    assert!(report.to_string().contains("source ended early"));
    assert_eq!(log.borrow().frames, (150..300).collect::<Vec<_>>());
    assert_eq!(log.borrow().finished, 1);
}

#[test]
fn overstated_frame_count_is_not_a_short_source() {
    let mut source = CountingSource::new(280, Some(300));
    let log = Rc::new(RefCell::new(SinkLog::default()));

    let report = extract_clip(
        &mut source,
        "clip.mp4",
        None,
        None,
        opener(&log),
        &TrimOptions::new(),
    )
    .unwrap();

    assert_eq!(report.window.end_frame, EndFrame::SourceLength(300));
    assert_eq!(report.frames_written, 280);
    assert!(!report.short_source);
    assert!(!report.to_string().contains("source ended early"));
    assert_eq!(log.borrow().finished, 1);
}

#[test]
fn unbounded_window_runs_until_source_ends() {
    let mut source = CountingSource::new(90, None);
    let log = Rc::new(RefCell::new(SinkLog::default()));

    let report = extract_clip(
        &mut source,
        "clip.mp4",
        Some("00:01"),
        None,
        opener(&log),
        &TrimOptions::new(),
    )
    .unwrap();

    assert_eq!(report.window.end_frame, EndFrame::Unbounded);
    assert_eq!(report.frames_written, 60);
    assert!(!report.short_source);
    assert_eq!(log.borrow().finished, 1);
}

#[test]
fn inverted_range_never_opens_a_sink() {
    let mut source = CountingSource::new(300, Some(300));
    let log = Rc::new(RefCell::new(SinkLog::default()));

    let result = extract_clip(
        &mut source,
        "clip.mp4",
        Some("00:05"),
        Some("00:02"),
        opener(&log),
        &TrimOptions::new(),
    );

    assert!(matches!(
        result,
        Err(TrimError::InvalidRange {
            start_frame: 150,
            end_frame: 60
        })
    ));
    assert_eq!(log.borrow().opened, 0);
    assert_eq!(log.borrow().finished, 0);
    assert!(source.seeks.is_empty());
}

#[test]
fn start_beyond_source_writes_an_empty_clip() {
    let mut source = CountingSource::new(300, Some(300));
    let log = Rc::new(RefCell::new(SinkLog::default()));

    let report = extract_clip(
        &mut source,
        "clip.mp4",
        Some("00:20"),
        Some("00:30"),
        opener(&log),
        &TrimOptions::new(),
    )
    .unwrap();

    assert_eq!(report.frames_written, 0);
    assert!(report.short_source);
    assert_eq!(log.borrow().opened, 1);
    assert_eq!(log.borrow().finished, 1);
}

#[test]
fn decode_error_still_finishes_the_sink() {
    let mut source = CountingSource::new(300, Some(300));
    source.fail_at = Some(40);
    let log = Rc::new(RefCell::new(SinkLog::default()));

    let result = extract_clip(
        &mut source,
        "clip.mp4",
        Some("00:01"),
        Some("00:05"),
        opener(&log),
        &TrimOptions::new(),
    );

    assert!(matches!(result, Err(TrimError::VideoDecodeError(_))));
    assert_eq!(log.borrow().frames, (30..40).collect::<Vec<_>>());
    assert_eq!(log.borrow().finished, 1);
}

#[test]
fn copy_error_wins_over_finish_error() {
    let mut source = CountingSource::new(300, Some(300));
    source.fail_at = Some(5);
    let log = Rc::new(RefCell::new(SinkLog::default()));
    let window = FrameWindow {
        start_frame: 0,
        end_frame: EndFrame::At(10),
    };

    let result = extract_range(
        &mut source,
        window,
        || {
            Ok(RecordingSink {
                log: Rc::clone(&log),
                fail_finish: true,
            })
        },
        &TrimOptions::new(),
    );

    assert!(matches!(result, Err(TrimError::VideoDecodeError(_))));
    assert_eq!(log.borrow().finished, 1);
}

#[test]
fn finish_error_is_reported_after_clean_copy() {
    let mut source = CountingSource::new(300, Some(300));
    let log = Rc::new(RefCell::new(SinkLog::default()));
    let window = FrameWindow {
        start_frame: 0,
        end_frame: EndFrame::At(10),
    };

    let result = extract_range(
        &mut source,
        window,
        || {
            Ok(RecordingSink {
                log: Rc::clone(&log),
                fail_finish: true,
            })
        },
        &TrimOptions::new(),
    );

    assert!(matches!(result, Err(TrimError::VideoWriteError(_))));
    assert_eq!(log.borrow().frames.len(), 10);
    assert_eq!(log.borrow().finished, 1);
}

#[test]
fn sink_open_failure_reads_nothing() {
    let mut source = CountingSource::new(300, Some(300));
    let window = FrameWindow {
        start_frame: 0,
        end_frame: EndFrame::At(10),
    };

    let result = extract_range(
        &mut source,
        window,
        || -> Result<RecordingSink, TrimError> {
            Err(TrimError::VideoEncodeError("no encoder".to_string()))
        },
        &TrimOptions::new(),
    );

    assert!(matches!(result, Err(TrimError::VideoEncodeError(_))));
    assert!(source.seeks.is_empty());
    assert_eq!(source.position, 0);
}

/// Cancels the shared token once `after` frames have been reported.
struct CancelAfter {
    token: CancellationToken,
    after: u64,
}

impl ProgressCallback for CancelAfter {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.current >= self.after {
            self.token.cancel();
        }
    }
}

#[test]
fn cancellation_stops_the_copy_and_finishes_the_sink() {
    let mut source = CountingSource::new(300, Some(300));
    let log = Rc::new(RefCell::new(SinkLog::default()));
    let token = CancellationToken::new();
    let options = TrimOptions::new()
        .with_cancellation(token.clone())
        .with_progress(Arc::new(CancelAfter {
            token: token.clone(),
            after: 25,
        }));

    let result = extract_clip(&mut source, "clip.mp4", None, None, opener(&log), &options);

    assert!(matches!(result, Err(TrimError::Cancelled)));
    assert!(token.is_cancelled());
    assert_eq!(log.borrow().frames.len(), 25);
    assert_eq!(log.borrow().finished, 1);
}

#[derive(Default)]
struct Recording(Mutex<Vec<ProgressInfo>>);

impl ProgressCallback for Recording {
    fn on_progress(&self, info: &ProgressInfo) {
        self.0.lock().unwrap().push(info.clone());
    }
}

#[test]
fn progress_reports_follow_batch_size() {
    let mut source = CountingSource::new(300, Some(300));
    let log = Rc::new(RefCell::new(SinkLog::default()));
    let recording = Arc::new(Recording::default());
    let options = TrimOptions::new()
        .with_progress(recording.clone())
        .with_batch_size(30);

    extract_clip(
        &mut source,
        "clip.mp4",
        Some("00:01"),
        Some("00:05"),
        opener(&log),
        &options,
    )
    .unwrap();

    let reports = recording.0.lock().unwrap();
    let counts: Vec<u64> = reports.iter().map(|info| info.current).collect();
    assert_eq!(counts, vec![30, 60, 90, 120]);
    assert!(reports.iter().all(|info| info.total == Some(120)));
    assert_eq!(reports[0].current_frame, Some(59));
    assert_eq!(reports.last().and_then(|info| info.percentage), Some(100.0));
}

#[test]
fn source_policy_uses_the_source_rate() {
    let mut source = CountingSource::new(600, Some(600));
    source.metadata.frames_per_second = 60.0;
    let log = Rc::new(RefCell::new(SinkLog::default()));
    let options = TrimOptions::new().with_frame_rate(FrameRatePolicy::Source);

    let mut sink_rate = None;
    let report = extract_clip(
        &mut source,
        "clip.mp4",
        Some("00:01"),
        Some("00:02"),
        |_: &VideoMetadata, frames_per_second: f64| {
            sink_rate = Some(frames_per_second);
            Ok(RecordingSink {
                log: Rc::clone(&log),
                fail_finish: false,
            })
        },
        &options,
    )
    .unwrap();

    assert_eq!(sink_rate, Some(60.0));
    assert_eq!(report.window.start_frame, 60);
    assert_eq!(report.frames_written, 60);
}

#[test]
fn fixed_policy_ignores_the_source_rate() {
    let mut source = CountingSource::new(600, Some(600));
    source.metadata.frames_per_second = 60.0;
    let log = Rc::new(RefCell::new(SinkLog::default()));

    let report = extract_clip(
        &mut source,
        "clip.mp4",
        Some("00:01"),
        Some("00:02"),
        opener(&log),
        &TrimOptions::new(),
    )
    .unwrap();

    assert_eq!(report.window.start_frame, 30);
    assert_eq!(report.frames_written, 30);
}

#[test]
fn unusable_fixed_rate_falls_back_to_thirty() {
    let mut source = CountingSource::new(300, Some(300));
    let log = Rc::new(RefCell::new(SinkLog::default()));
    let options = TrimOptions::new().with_frame_rate(FrameRatePolicy::Fixed(0.0));

    let mut sink_rate = None;
    let report = extract_clip(
        &mut source,
        "clip.mp4",
        Some("00:01"),
        Some("00:02"),
        |_: &VideoMetadata, frames_per_second: f64| {
            sink_rate = Some(frames_per_second);
            Ok(RecordingSink {
                log: Rc::clone(&log),
                fail_finish: false,
            })
        },
        &options,
    )
    .unwrap();

    assert_eq!(sink_rate, Some(30.0));
    assert_eq!(report.window.start_frame, 30);
    assert_eq!(report.window.end_frame, EndFrame::At(60));
    assert_eq!(report.frames_written, 30);
}
