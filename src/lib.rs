//! # cliptrim
//!
//! Batch-trim video files to the time ranges listed in a CSV manifest.
//!
//! Each manifest row names a source video and an optional `mm:ss` start and
//! end time. `cliptrim` turns the times into a frame window, decodes the
//! source with FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate, and
//! re-encodes exactly that window into a new file.
//!
//! ## Quick Start
//!
//! ### Trim One File
//!
//! ```no_run
//! use cliptrim::{ExtractionJob, TrimOptions};
//!
//! let job = ExtractionJob::new("input.mp4", "clip.avi", Some("01:30"), Some("02:00"));
//! let report = cliptrim::trim_video(&job, &TrimOptions::new()).unwrap();
//! println!("{report}");
//! ```
//!
//! ### Run a Manifest
//!
//! ```no_run
//! use cliptrim::{BatchRunner, Manifest, TrimOptions};
//!
//! let manifest = Manifest::from_path("clips.csv").unwrap();
//! let report = BatchRunner::new("out", TrimOptions::new()).run(&manifest).unwrap();
//! assert!(report.is_success());
//! ```
//!
//! ## Time Handling
//!
//! Times are `mm:ss` with both fields in `0..=59`. Values that are missing
//! or not shaped like `mm:ss` mean "from the beginning" / "to the end";
//! values shaped like `mm:ss` but out of range (`02:75`) are reported as
//! errors and then treated the same way. See [`timespec`].
//!
//! Times become frame indices at a fixed **30 fps** unless
//! [`TrimOptions::with_frame_rate`] says otherwise. This matches the
//! historical behaviour of the tool and is wrong for sources at other
//! rates; use [`FrameRatePolicy::Source`] to follow the source instead.
//!
//! ## Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | [`BatchRunner::run_parallel`] trims several jobs at once |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod batch;
pub mod config;
pub mod encode;
pub mod error;
pub mod extract;
pub mod ffmpeg;
pub mod manifest;
pub mod metadata;
pub mod progress;
pub mod source;
pub mod timespec;
mod utilities;
pub mod window;

pub use batch::{BatchReport, BatchRunner, JobOutcome, JobStatus};
pub use config::{DEFAULT_FRAMES_PER_SECOND, FrameRatePolicy, TrimOptions};
pub use encode::{VideoCodec, VideoEncoderOptions, VideoSink};
pub use error::TrimError;
pub use extract::{
    ExtractionJob, ExtractionReport, FrameSink, FrameSource, extract_clip, extract_range,
    trim_video,
};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use manifest::{Manifest, ManifestRow, output_file_name};
pub use metadata::VideoMetadata;
pub use progress::{CancellationToken, LogProgress, OperationType, ProgressCallback, ProgressInfo};
pub use source::VideoSource;
pub use timespec::{TimeSpec, looks_like_time_spec, parse_mmss, to_seconds};
pub use window::{EndFrame, FrameWindow};
