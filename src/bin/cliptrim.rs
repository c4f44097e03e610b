use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use cliptrim::{
    BatchRunner, CancellationToken, ExtractionJob, FfmpegLogLevel, FrameRatePolicy, FrameSource,
    LogProgress, Manifest, OperationType, ProgressCallback, ProgressInfo, TrimOptions,
    VideoCodec, VideoEncoderOptions, VideoSource,
};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use signal_hook::consts::{SIGINT, SIGTERM};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

const CLI_AFTER_HELP: &str = "Examples:\n  cliptrim run data/clips.csv --out clips\n  cliptrim run data/clips.csv --out clips --codec h264 --fps source --progress\n  cliptrim trim input.mp4 clip.avi --start 01:30 --end 02:00\n  cliptrim probe input.mp4 --json\n  cliptrim completions zsh > _cliptrim";

#[derive(Debug, Parser)]
#[command(
    name = "cliptrim",
    version,
    about = "Trim video files to the time ranges listed in a CSV manifest",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Only show warnings and errors.
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    ffmpeg_log_level: Option<FfmpegLogLevel>,
}

#[derive(Debug, Args, Clone)]
struct EncodeOptions {
    /// Output codec (mpeg4, h264, h265).
    #[arg(long, default_value = "mpeg4")]
    codec: VideoCodec,

    /// Frame rate for time-to-frame conversion: a number, or `source`.
    #[arg(long, default_value = "30")]
    fps: FrameRatePolicy,

    /// Target bitrate in bits per second.
    #[arg(long)]
    bitrate: Option<usize>,

    /// Constant rate factor for h264/h265.
    #[arg(long, default_value_t = 23)]
    crf: u32,
}

impl EncodeOptions {
    fn encoder(&self) -> VideoEncoderOptions {
        let options = VideoEncoderOptions::default().codec(self.codec).crf(self.crf);
        match self.bitrate {
            Some(bitrate) => options.bitrate(bitrate),
            None => options,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Trim every row of a manifest.
    #[command(
        about = "Trim every row of a CSV manifest",
        after_help = "The manifest needs the columns path, start_time and end_time.\nClips are written as 000.avi, 001.avi, ... in row order.\n\nExamples:\n  cliptrim run data/clips.csv --out clips\n  cliptrim run data/clips.csv --out clips --ext mkv --json"
    )]
    Run {
        /// CSV manifest path.
        manifest: PathBuf,
        /// Output directory for the clips.
        #[arg(long)]
        out: PathBuf,
        /// Output file extension. Defaults to the codec's usual container.
        #[arg(long)]
        ext: Option<String>,
        /// Print the batch report as JSON.
        #[arg(long)]
        json: bool,
        /// Number of clips to trim at once.
        #[cfg(feature = "rayon")]
        #[arg(long)]
        jobs: Option<usize>,
        #[command(flatten)]
        encode: EncodeOptions,
    },

    /// Trim a single file.
    #[command(
        about = "Trim a single video",
        after_help = "Examples:\n  cliptrim trim input.mp4 clip.avi --start 00:10 --end 00:20\n  cliptrim trim input.mp4 tail.mp4 --start 05:00 --codec h264"
    )]
    Trim {
        /// Input video.
        input: PathBuf,
        /// Output clip.
        output: PathBuf,
        /// Start time (mm:ss). Defaults to the beginning.
        #[arg(long)]
        start: Option<String>,
        /// End time (mm:ss). Defaults to the end of the source.
        #[arg(long)]
        end: Option<String>,
        #[command(flatten)]
        encode: EncodeOptions,
    },

    /// Print video metadata.
    #[command(about = "Print video metadata", visible_alias = "info")]
    Probe {
        /// Input video.
        input: PathBuf,
        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logger(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let level = if global.verbose {
        LevelFilter::Debug
    } else if global.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let mut builder = ConfigBuilder::new();
    builder.set_target_level(LevelFilter::Off);
    builder.set_thread_level(LevelFilter::Off);
    builder.set_location_level(LevelFilter::Trace);
    builder.add_filter_allow_str("cliptrim");

    TermLogger::init(level, builder.build(), TerminalMode::Stderr, ColorChoice::Auto)?;
    Ok(())
}

/// The first Ctrl-C stops the current clip cleanly; a second one exits
/// immediately, even if FFmpeg is stuck.
fn install_interrupt_handler(token: &CancellationToken) -> Result<(), Box<dyn std::error::Error>> {
    for signal in [SIGINT, SIGTERM] {
        // Registered first so it sees the flag before this signal sets it.
        signal_hook::flag::register_conditional_shutdown(signal, 1, token.flag())?;
        signal_hook::flag::register(signal, token.flag())?;
    }
    Ok(())
}

fn trim_options(
    global: &GlobalOptions,
    encode: &EncodeOptions,
    token: &CancellationToken,
) -> TrimOptions {
    let options = TrimOptions::new()
        .with_frame_rate(encode.fps)
        .with_encoder(encode.encoder())
        .with_overwrite(global.overwrite)
        .with_cancellation(token.clone());
    log::debug!(
        "frame rate: {:?}, encoder: {:?}",
        options.frame_rate(),
        options.encoder()
    );
    options
}

fn ensure_parent_directory(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(unit: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::no_length();
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.green}} {{bar:40.cyan/blue}} {{pos}}/{{len}} {unit} {{msg}}"
        ))?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        if let (OperationType::FrameCopy, Some(remaining)) =
            (info.operation, info.estimated_remaining)
        {
            self.bar
                .set_message(format!("~{}s left", remaining.as_secs()));
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logger(&cli.global)?;

    if let Some(level) = cli.global.ffmpeg_log_level {
        cliptrim::set_ffmpeg_log_level(level);
    }

    let token = CancellationToken::new();
    install_interrupt_handler(&token)?;

    match cli.command {
        Commands::Run {
            manifest,
            out,
            ext,
            json,
            #[cfg(feature = "rayon")]
            jobs,
            encode,
        } => {
            let manifest = Manifest::from_path(&manifest)?;
            let mut options = trim_options(&cli.global, &encode, &token);
            if cli.global.verbose {
                options = options.with_progress(Arc::new(LogProgress)).with_batch_size(150);
            }

            let mut runner = BatchRunner::new(&out, options);
            if let Some(ext) = &ext {
                runner = runner.with_extension(ext);
            }
            log::info!(
                "writing {} clip(s) to {}",
                manifest.len(),
                runner.output_directory().display()
            );

            let progress = if cli.global.progress {
                let progress = Arc::new(TerminalProgress::new("clips")?);
                runner = runner.with_job_progress(progress.clone());
                Some(progress)
            } else {
                None
            };

            #[cfg(feature = "rayon")]
            let report = match jobs {
                Some(threads) if threads > 1 => runner.with_threads(threads).run_parallel(&manifest)?,
                _ => runner.run(&manifest)?,
            };
            #[cfg(not(feature = "rayon"))]
            let report = runner.run(&manifest)?;

            if let Some(progress) = progress {
                progress.finish();
            }

            if json {
                let payload = json!({
                    "manifest": manifest.origin(),
                    "output_directory": out,
                    "succeeded": report.succeeded(),
                    "failed": report.failed(),
                    "skipped": report.skipped(),
                    "jobs": report.outcomes,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            }

            if token.is_cancelled() {
                return Err("interrupted".into());
            }

            if !report.is_success() {
                return Err(format!(
                    "{} of {} clip(s) failed",
                    report.outcomes.len() - report.succeeded(),
                    report.outcomes.len()
                )
                .into());
            }

            if !json {
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!("Wrote {} clip(s) to {}", report.succeeded(), out.display()).green()
                );
            }
        }
        Commands::Trim {
            input,
            output,
            start,
            end,
            encode,
        } => {
            ensure_parent_directory(&output)?;

            let mut options = trim_options(&cli.global, &encode, &token);
            let progress = if cli.global.progress {
                let progress = Arc::new(TerminalProgress::new("frames")?);
                options = options.with_progress(progress.clone()).with_batch_size(10);
                Some(progress)
            } else {
                None
            };

            let job = ExtractionJob::new(&input, &output, start.as_deref(), end.as_deref());
            let report = cliptrim::trim_video(&job, &options)?;

            if let Some(progress) = progress {
                progress.finish();
            }

            if report.short_source {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    "source ended before the requested end time".yellow()
                );
            }
            println!("{} {} ({report})", "saved".green().bold(), output.display());
        }
        Commands::Probe { input, json } => {
            let source = VideoSource::open(&input)?;
            let metadata = source.metadata();
            if json {
                println!("{}", serde_json::to_string_pretty(metadata)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:?}", metadata.duration);
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    metadata.width, metadata.height, metadata.frames_per_second, metadata.codec,
                );
                match metadata.frame_count {
                    Some(count) => println!("Frames: {count}"),
                    None => println!("Frames: unknown"),
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "cliptrim", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
