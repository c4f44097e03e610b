//! Video sink: encode decoded frames into a new container.
//!
//! [`VideoSink`] is the [`FrameSink`] used by
//! [`trim_video`](crate::trim_video). It is created with a fixed frame size
//! and frame rate, converts every incoming frame to the encoder's pixel
//! format, and writes the trailer when [`finish`](FrameSink::finish) is
//! called.
//!
//! # Example
//!
//! ```no_run
//! use cliptrim::{FrameSink, FrameSource, TrimError, VideoEncoderOptions, VideoSink, VideoSource};
//!
//! let mut source = VideoSource::open("input.mp4")?;
//! let (width, height) = (source.metadata().width, source.metadata().height);
//! let mut sink = VideoSink::create("first_second.avi", width, height, 30.0, &VideoEncoderOptions::default())?;
//! for _ in 0..30 {
//!     match source.next_frame()? {
//!         Some(frame) => sink.write_frame(&frame)?,
//!         None => break,
//!     }
//! }
//! sink.finish()?;
//! # Ok::<(), TrimError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ffmpeg_next::codec::Id;
use ffmpeg_next::codec::context::Context as CodecContext;
use ffmpeg_next::codec::encoder::video::Encoder as OpenedVideoEncoder;
use ffmpeg_next::format::context::Output;
use ffmpeg_next::format::{Flags as FormatFlags, Pixel};
use ffmpeg_next::frame::Video as VideoFrame;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use ffmpeg_next::{Dictionary, Packet, Rational};

use crate::error::TrimError;
use crate::extract::FrameSink;

/// Bit rate used for MPEG-4 Part 2 when none is configured. FFmpeg's own
/// default (200 kb/s) is far too low for anything above thumbnail size.
const DEFAULT_MPEG4_BIT_RATE: usize = 4_000_000;

/// Options for the output encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoEncoderOptions {
    /// Codec to use. Default is MPEG-4 Part 2, which fits AVI output.
    pub codec: VideoCodec,
    /// Constant Rate Factor for H.264/H.265 (0-51, lower is better).
    /// Ignored by MPEG-4 Part 2. Default: 23.
    pub crf: Option<u32>,
    /// Bitrate in bits per second. If set, overrides CRF.
    pub bitrate: Option<usize>,
}

impl Default for VideoEncoderOptions {
    fn default() -> Self {
        Self {
            codec: VideoCodec::Mpeg4,
            crf: Some(23),
            bitrate: None,
        }
    }
}

impl VideoEncoderOptions {
    /// Set the codec.
    pub fn codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the CRF quality value.
    pub fn crf(mut self, crf: u32) -> Self {
        self.crf = Some(crf);
        self
    }

    /// Set the target bitrate in bits per second.
    pub fn bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = Some(bitrate);
        self
    }
}

/// Supported output video codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// H.264 / AVC.
    H264,
    /// H.265 / HEVC.
    H265,
    /// MPEG-4 Part 2 (for AVI compatibility).
    #[default]
    Mpeg4,
}

impl VideoCodec {
    fn to_codec_id(self) -> Id {
        match self {
            VideoCodec::H264 => Id::H264,
            VideoCodec::H265 => Id::HEVC,
            VideoCodec::Mpeg4 => Id::MPEG4,
        }
    }

    fn input_pixel_format(self) -> Pixel {
        Pixel::YUV420P
    }

    /// Whether the encoder understands the `crf` private option.
    fn supports_crf(self) -> bool {
        matches!(self, VideoCodec::H264 | VideoCodec::H265)
    }

    /// File extension that suits this codec when none is given.
    pub fn default_extension(self) -> &'static str {
        match self {
            VideoCodec::H264 | VideoCodec::H265 => "mp4",
            VideoCodec::Mpeg4 => "avi",
        }
    }
}

impl FromStr for VideoCodec {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "h264" | "avc" => Ok(VideoCodec::H264),
            "h265" | "hevc" => Ok(VideoCodec::H265),
            "mpeg4" | "xvid" => Ok(VideoCodec::Mpeg4),
            _ => Err(format!("unsupported codec: {value} (expected mpeg4, h264, or h265)")),
        }
    }
}

/// An open output file accepting frames of a fixed size.
pub struct VideoSink {
    output: Output,
    encoder: OpenedVideoEncoder,
    /// Built from the first frame; rebuilt if the input format changes.
    scaler: Option<ScalingContext>,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    width: u32,
    height: u32,
    pixel_format: Pixel,
    next_pts: i64,
    path: PathBuf,
}

impl Debug for VideoSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSink")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frames_written", &self.next_pts)
            .finish_non_exhaustive()
    }
}

impl VideoSink {
    /// Create the output file and write its header.
    ///
    /// The container format is inferred from the file extension.
    ///
    /// # Errors
    ///
    /// - [`TrimError::VideoWriteError`] if the container cannot be created.
    /// - [`TrimError::VideoEncodeError`] if the codec is unavailable or
    ///   rejects the configuration.
    pub fn create<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        frames_per_second: f64,
        options: &VideoEncoderOptions,
    ) -> Result<Self, TrimError> {
        let path = path.as_ref();

        log::debug!(
            "Creating {} ({width}x{height}, codec={:?}, fps={frames_per_second})",
            path.display(),
            options.codec,
        );

        crate::ffmpeg::initialize()?;

        let output = ffmpeg_next::format::output(&path)
            .map_err(|e| TrimError::VideoWriteError(format!("cannot open output: {e}")))?;

        // The file exists from here on; remove it again if the encoder
        // cannot be set up.
        Self::with_output(output, path, width, height, frames_per_second, options).inspect_err(
            |error| match fs::remove_file(path) {
                Ok(()) => log::debug!("Removed {} after failed setup", path.display()),
                Err(remove_error) if remove_error.kind() == ErrorKind::NotFound => {}
                Err(remove_error) => {
                    log::warn!(
                        "could not remove {} after failed setup ({error}): {remove_error}",
                        path.display()
                    )
                }
            },
        )
    }

    fn with_output(
        mut output: Output,
        path: &Path,
        width: u32,
        height: u32,
        frames_per_second: f64,
        options: &VideoEncoderOptions,
    ) -> Result<Self, TrimError> {
        let codec_id = options.codec.to_codec_id();
        let pixel_format = options.codec.input_pixel_format();
        let frame_rate = crate::utilities::frame_rate_to_rational(frames_per_second);
        let encoder_time_base = frame_rate.invert();

        // Read before adding the stream; `add_stream` holds a mutable borrow.
        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let encoder_codec = ffmpeg_next::encoder::find(codec_id).ok_or_else(|| {
            TrimError::VideoEncodeError(format!("codec {codec_id:?} not available"))
        })?;

        let mut stream = output
            .add_stream(encoder_codec)
            .map_err(|e| TrimError::VideoWriteError(format!("cannot add stream: {e}")))?;
        let stream_index = stream.index();

        let mut encoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.encoder().video())
            .map_err(|e| TrimError::VideoEncodeError(format!("cannot create video encoder: {e}")))?;

        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(pixel_format);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(frame_rate));

        match options.bitrate {
            Some(bitrate) => encoder.set_bit_rate(bitrate),
            None if options.codec == VideoCodec::Mpeg4 => {
                encoder.set_bit_rate(DEFAULT_MPEG4_BIT_RATE)
            }
            None => {}
        }

        if needs_global_header {
            unsafe {
                (*encoder.as_mut_ptr()).flags |=
                    ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        let mut codec_options = Dictionary::new();
        if let (Some(crf), None, true) = (options.crf, options.bitrate, options.codec.supports_crf())
        {
            codec_options.set("crf", &crf.to_string());
        }

        let opened_encoder = encoder
            .open_as_with(encoder_codec, codec_options)
            .map_err(|e| TrimError::VideoEncodeError(format!("cannot open encoder: {e}")))?;

        stream.set_parameters(&opened_encoder);

        output
            .write_header()
            .map_err(|e| TrimError::VideoWriteError(format!("cannot write header: {e}")))?;

        // The muxer may pick its own time base while writing the header.
        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .unwrap_or(encoder_time_base);

        Ok(Self {
            output,
            encoder: opened_encoder,
            scaler: None,
            stream_index,
            encoder_time_base,
            stream_time_base,
            width,
            height,
            pixel_format,
            next_pts: 0,
            path: path.to_path_buf(),
        })
    }

    /// Number of frames accepted so far.
    pub fn frames_written(&self) -> u64 {
        self.next_pts as u64
    }

    fn scaler_for(&mut self, frame: &VideoFrame) -> Result<&mut ScalingContext, TrimError> {
        let reusable = self.scaler.take().filter(|scaler| {
            let input = scaler.input();
            input.format == frame.format()
                && input.width == frame.width()
                && input.height == frame.height()
        });

        let scaler = match reusable {
            Some(scaler) => scaler,
            None => ScalingContext::get(
                frame.format(),
                frame.width(),
                frame.height(),
                self.pixel_format,
                self.width,
                self.height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|e| TrimError::VideoWriteError(format!("cannot create scaler: {e}")))?,
        };

        Ok(self.scaler.insert(scaler))
    }

    /// Move every packet the encoder has ready into the container.
    fn write_pending_packets(&mut self) -> Result<(), TrimError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| TrimError::VideoWriteError(format!("write packet failed: {e}")))?;
        }
        Ok(())
    }
}

impl FrameSink for VideoSink {
    type Frame = VideoFrame;

    fn write_frame(&mut self, frame: &VideoFrame) -> Result<(), TrimError> {
        let mut converted = VideoFrame::empty();
        self.scaler_for(frame)?
            .run(frame, &mut converted)
            .map_err(|e| TrimError::VideoWriteError(format!("scaling failed: {e}")))?;

        converted.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .send_frame(&converted)
            .map_err(|e| TrimError::VideoEncodeError(format!("send_frame failed: {e}")))?;

        self.write_pending_packets()
    }

    fn finish(mut self) -> Result<(), TrimError> {
        self.encoder
            .send_eof()
            .map_err(|e| TrimError::VideoEncodeError(format!("send_eof failed: {e}")))?;

        self.write_pending_packets()?;

        self.output
            .write_trailer()
            .map_err(|e| TrimError::VideoWriteError(format!("cannot write trailer: {e}")))?;

        log::debug!(
            "Finalized {} with {} frames",
            self.path.display(),
            self.next_pts
        );
        Ok(())
    }
}
