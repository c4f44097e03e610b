//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring a trim,
//! [`CancellationToken`] for cooperative cancellation, and [`ProgressInfo`]
//! for progress snapshots. Progress is a presentation concern: the copy loop
//! only ever talks to a callback, so nothing is printed unless the caller
//! asks for it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cliptrim::{ExtractionJob, ProgressCallback, ProgressInfo, TrimError, TrimOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% ({}/{:?})", info.operation, info.current, info.total);
//!         }
//!     }
//! }
//!
//! let options = TrimOptions::new().with_progress(Arc::new(PrintProgress));
//! let job = ExtractionJob::new("input.mp4", "clip.avi", Some("00:10"), Some("00:20"));
//! cliptrim::trim_video(&job, &options)?;
//! # Ok::<(), TrimError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The kind of operation currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Copying the frames of one clip.
    FrameCopy,
    /// Working through the jobs of a manifest.
    Batch,
}

/// A snapshot of progress.
///
/// Delivered to [`ProgressCallback::on_progress`] at a cadence controlled
/// by [`TrimOptions::with_batch_size`](crate::TrimOptions::with_batch_size).
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many items (frames / jobs) have been processed so far.
    pub current: u64,
    /// Total items expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Source frame index most recently copied (frame copy only).
    pub current_frame: Option<u64>,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] because the same callback
/// may be shared by jobs running on worker threads.
///
/// Progress callbacks are **infallible**; they observe but cannot halt
/// the operation. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals during an operation.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Reports frame-copy progress through the `log` facade at info level.
///
/// Prints lines such as `copied 60/120 frames (50.0%)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        match (info.total, info.percentage) {
            (Some(total), Some(percentage)) => {
                log::info!("copied {}/{total} frames ({percentage:.1}%)", info.current)
            }
            _ => log::info!("copied {} frames", info.current),
        }
    }
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from anywhere to stop the copy loop
/// before its next frame and keep the batch from starting new jobs.
///
/// # Example
///
/// ```
/// use cliptrim::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// The shared flag behind this token, for registering with a signal
    /// handler.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts processed items and forwards a [`ProgressInfo`] to the callback
/// every `report_every` items.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    done: u64,
    report_every: u64,
    last_reported: Option<u64>,
    started: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        report_every: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            done: 0,
            report_every: report_every.max(1),
            last_reported: None,
            started: Instant::now(),
        }
    }

    /// Count one item. `frame_number` is the source index it came from,
    /// when there is one.
    pub(crate) fn advance(&mut self, frame_number: Option<u64>) {
        self.done += 1;
        if self.done % self.report_every == 0 {
            self.emit(frame_number);
        }
    }

    /// Report the final count unless the last report already carried it.
    pub(crate) fn finish(&mut self) {
        if self.last_reported != Some(self.done) {
            self.emit(None);
        }
    }

    pub(crate) fn current(&self) -> u64 {
        self.done
    }

    fn emit(&mut self, current_frame: Option<u64>) {
        let elapsed = self.started.elapsed();
        let done = self.done;
        self.last_reported = Some(done);

        let percentage = match self.total {
            Some(total) if total > 0 => Some(done as f32 * 100.0 / total as f32),
            _ => None,
        };
        let estimated_remaining = match self.total {
            Some(total) if done > 0 => {
                Some(elapsed.mul_f64(total.saturating_sub(done) as f64 / done as f64))
            }
            _ => None,
        };

        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current: done,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame,
        });
    }
}
