//! Manifest-driven batch trimming.
//!
//! [`BatchRunner`] turns a [`Manifest`] into jobs, makes sure the output
//! directory exists, and trims each job in turn. A job that fails is
//! recorded in the [`BatchReport`] and the batch moves on; only a failure to
//! prepare the output directory aborts the whole run.
//!
//! With the `rayon` feature, [`BatchRunner::run_parallel`] processes jobs
//! on a thread pool. Every job still owns its own source and sink, and
//! frames within a job are copied strictly in order.
//!
//! # Example
//!
//! ```no_run
//! use cliptrim::{BatchRunner, Manifest, TrimError, TrimOptions};
//!
//! let manifest = Manifest::from_path("data/clips.csv")?;
//! let report = BatchRunner::new("clips", TrimOptions::new()).run(&manifest)?;
//! println!("{} succeeded, {} failed", report.succeeded(), report.failed());
//! # Ok::<(), TrimError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
#[cfg(feature = "rayon")]
use std::sync::Mutex;

use serde::Serialize;

use crate::{
    config::TrimOptions,
    error::TrimError,
    extract::{ExtractionJob, ExtractionReport, trim_video},
    manifest::Manifest,
    progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
};

/// How a single job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    /// The clip was written.
    Completed {
        /// What was copied.
        report: ExtractionReport,
    },
    /// The job failed; the batch carried on.
    Failed {
        /// Rendered error message.
        error: String,
    },
    /// The batch was cancelled before this job started.
    Skipped,
}

/// The result of one manifest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    /// Zero-based row index.
    pub index: usize,
    /// The job that was run.
    pub job: ExtractionJob,
    /// How it ended.
    #[serde(flatten)]
    pub status: JobStatus,
}

/// Per-job outcomes of a batch, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// One entry per job.
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    /// Jobs that produced a clip.
    pub fn succeeded(&self) -> usize {
        self.count(|status| matches!(status, JobStatus::Completed { .. }))
    }

    /// Jobs that failed.
    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, JobStatus::Failed { .. }))
    }

    /// Jobs never started because of cancellation.
    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, JobStatus::Skipped))
    }

    /// Returns `true` when every job completed.
    pub fn is_success(&self) -> bool {
        self.succeeded() == self.outcomes.len()
    }

    fn count(&self, predicate: impl Fn(&JobStatus) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| predicate(&outcome.status))
            .count()
    }
}

/// Runs the jobs of a manifest.
#[derive(Clone)]
pub struct BatchRunner {
    output_directory: PathBuf,
    extension: String,
    options: TrimOptions,
    job_progress: Arc<dyn ProgressCallback>,
    #[cfg(feature = "rayon")]
    threads: Option<usize>,
}

impl BatchRunner {
    /// Create a runner writing clips into `output_directory`.
    ///
    /// The output extension defaults to the configured codec's natural
    /// container (`avi` for the default MPEG-4 Part 2 codec).
    pub fn new(output_directory: impl Into<PathBuf>, options: TrimOptions) -> Self {
        Self {
            output_directory: output_directory.into(),
            extension: options.encoder.codec.default_extension().to_string(),
            options,
            job_progress: Arc::new(NoOpProgress),
            #[cfg(feature = "rayon")]
            threads: None,
        }
    }

    /// Set the extension (and thereby the container) of the output files.
    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Receive a progress report after every finished job.
    #[must_use]
    pub fn with_job_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.job_progress = callback;
        self
    }

    /// Limit the number of worker threads used by
    /// [`run_parallel`](BatchRunner::run_parallel).
    #[cfg(feature = "rayon")]
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    /// The directory clips are written to.
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Jobs this runner would execute for `manifest`.
    pub fn jobs(&self, manifest: &Manifest) -> Vec<ExtractionJob> {
        manifest.jobs(&self.output_directory, &self.extension)
    }

    /// Trim every row of `manifest`, one after another.
    ///
    /// # Errors
    ///
    /// Returns [`TrimError::IoError`] only if the output directory cannot be
    /// created. Per-job failures are reported in the [`BatchReport`].
    pub fn run(&self, manifest: &Manifest) -> Result<BatchReport, TrimError> {
        self.prepare_output_directory()?;
        Ok(self.run_with(&self.jobs(manifest), trim_video))
    }

    /// Run `jobs` sequentially through `trim`.
    ///
    /// This is what [`run`](BatchRunner::run) does with
    /// [`trim_video`]; it is public so other trimming back ends can reuse the
    /// batch bookkeeping.
    pub fn run_with<F>(&self, jobs: &[ExtractionJob], trim: F) -> BatchReport
    where
        F: Fn(&ExtractionJob, &TrimOptions) -> Result<ExtractionReport, TrimError>,
    {
        let mut tracker = self.job_tracker(jobs.len());
        let outcomes: Vec<JobOutcome> = jobs
            .iter()
            .enumerate()
            .map(|(index, job)| {
                let outcome = self.run_one(index, job, &trim);
                tracker.advance(None);
                outcome
            })
            .collect();
        tracker.finish();

        let report = BatchReport { outcomes };
        log_summary(&report);
        report
    }

    /// Trim every row of `manifest` on a rayon thread pool.
    ///
    /// # Errors
    ///
    /// Same as [`run`](BatchRunner::run), plus [`TrimError::ThreadPool`] if
    /// the pool cannot be built.
    #[cfg(feature = "rayon")]
    pub fn run_parallel(&self, manifest: &Manifest) -> Result<BatchReport, TrimError> {
        self.prepare_output_directory()?;
        self.run_parallel_with(&self.jobs(manifest), trim_video)
    }

    /// Run `jobs` on a rayon thread pool through `trim`.
    ///
    /// Outcomes are returned in job order regardless of completion order.
    ///
    /// # Errors
    ///
    /// Returns [`TrimError::ThreadPool`] if the pool cannot be built.
    #[cfg(feature = "rayon")]
    pub fn run_parallel_with<F>(
        &self,
        jobs: &[ExtractionJob],
        trim: F,
    ) -> Result<BatchReport, TrimError>
    where
        F: Fn(&ExtractionJob, &TrimOptions) -> Result<ExtractionReport, TrimError> + Sync,
    {
        use ::rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

        let mut builder = ::rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|error| TrimError::ThreadPool(error.to_string()))?;

        let tracker = Mutex::new(self.job_tracker(jobs.len()));
        let outcomes: Vec<JobOutcome> = pool.install(|| {
            jobs.par_iter()
                .enumerate()
                .map(|(index, job)| {
                    let outcome = self.run_one(index, job, &trim);
                    if let Ok(mut tracker) = tracker.lock() {
                        tracker.advance(None);
                    }
                    outcome
                })
                .collect()
        });
        if let Ok(mut tracker) = tracker.lock() {
            tracker.finish();
        }

        let report = BatchReport { outcomes };
        log_summary(&report);
        Ok(report)
    }

    fn prepare_output_directory(&self) -> Result<(), TrimError> {
        fs::create_dir_all(&self.output_directory)?;
        log::debug!("Writing clips to {}", self.output_directory.display());
        Ok(())
    }

    fn job_tracker(&self, total: usize) -> ProgressTracker {
        ProgressTracker::new(
            self.job_progress.clone(),
            OperationType::Batch,
            Some(total as u64),
            1,
        )
    }

    fn run_one<F>(&self, index: usize, job: &ExtractionJob, trim: &F) -> JobOutcome
    where
        F: Fn(&ExtractionJob, &TrimOptions) -> Result<ExtractionReport, TrimError>,
    {
        let status = if self.options.is_cancelled() {
            JobStatus::Skipped
        } else {
            log::info!("input path: {}", job.source_path.display());
            log::info!("output path: {}", job.destination_path.display());

            match trim(job, &self.options) {
                Ok(report) => {
                    log::info!("job {index:03}: wrote {report}");
                    JobStatus::Completed { report }
                }
                Err(error) => {
                    log::error!(
                        "job {index:03} ({}) failed: {error}",
                        job.source_path.display()
                    );
                    JobStatus::Failed {
                        error: error.to_string(),
                    }
                }
            }
        };

        JobOutcome {
            index,
            job: job.clone(),
            status,
        }
    }
}

fn log_summary(report: &BatchReport) {
    log::info!(
        "batch finished: {} succeeded, {} failed, {} skipped",
        report.succeeded(),
        report.failed(),
        report.skipped()
    );
}
