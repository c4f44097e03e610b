//! FFmpeg-backed frame source.
//!
//! [`VideoSource`] opens a media file, picks its best video stream, and
//! decodes frames one at a time in presentation order. It is the
//! [`FrameSource`] used by [`trim_video`](crate::trim_video).

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::context::Input,
    frame::Video as VideoFrame,
    media::Type,
};

use crate::{
    error::TrimError,
    extract::FrameSource,
    metadata::{VideoMetadata, resolve_frame_count},
};

/// A decoding cursor over the video stream of one file.
///
/// Frame indices are derived from presentation timestamps and the stream's
/// average frame rate. When either is missing the source falls back to
/// counting decoded frames.
///
/// # Example
///
/// ```no_run
/// use cliptrim::{FrameSource, TrimError, VideoSource};
///
/// let mut source = VideoSource::open("input.mp4")?;
/// println!("{:?}", source.metadata());
/// source.seek_to_frame(300)?;
/// let frame = source.next_frame()?;
/// # Ok::<(), TrimError>(())
/// ```
pub struct VideoSource {
    input_context: Input,
    decoder: VideoDecoder,
    video_stream_index: usize,
    time_base: Rational,
    /// Stream start time in `time_base` units; subtracted from every PTS.
    start_pts: i64,
    metadata: VideoMetadata,
    file_path: PathBuf,
    /// Decoded frames below this index are discarded.
    skip_until: u64,
    /// Index assigned to the next frame that has no usable timestamp.
    next_index: u64,
    packets_read: bool,
    draining: bool,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("file_path", &self.file_path)
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("skip_until", &self.skip_until)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a media file for decoding.
    ///
    /// # Errors
    ///
    /// - [`TrimError::FileOpen`] if FFmpeg cannot open the file or build a
    ///   decoder for its video stream.
    /// - [`TrimError::NoVideoStream`] if the file has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TrimError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening media file: {}", file_path.display());

        crate::ffmpeg::initialize()?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| TrimError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(TrimError::NoVideoStream)?;
        let video_stream_index = stream.index();
        let time_base = stream.time_base();
        let start_pts = match stream.start_time() {
            ffmpeg_sys_next::AV_NOPTS_VALUE => 0,
            start => start,
        };

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| TrimError::FileOpen {
                path: file_path.clone(),
                reason: format!("Failed to create video decoder: {error}"),
            })?;

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            0.0
        };

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count: resolve_frame_count(stream.frames(), duration, frames_per_second),
            duration,
            codec,
            format: input_context.format().name().to_string(),
        };

        log::debug!("Source metadata: {metadata:?}");

        Ok(Self {
            input_context,
            decoder,
            video_stream_index,
            time_base,
            start_pts,
            metadata,
            file_path,
            skip_until: 0,
            next_index: 0,
            packets_read: false,
            draining: false,
        })
    }

    /// Path this source was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn frame_index(&self, frame: &VideoFrame) -> u64 {
        let frames_per_second = self.metadata.frames_per_second;
        match frame.timestamp().or_else(|| frame.pts()) {
            Some(pts) if frames_per_second > 0.0 => crate::utilities::pts_to_frame_number(
                pts - self.start_pts,
                self.time_base,
                frames_per_second,
            ),
            _ => self.next_index,
        }
    }

    /// Feed the decoder one video packet, or signal end of stream.
    fn feed_decoder(&mut self) -> Result<(), TrimError> {
        loop {
            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => {
                    self.decoder.send_eof()?;
                    self.draining = true;
                    return Ok(());
                }
                Err(error) => return Err(TrimError::VideoDecodeError(error.to_string())),
            }
            self.packets_read = true;

            if packet.stream() != self.video_stream_index {
                continue;
            }

            return self
                .decoder
                .send_packet(&packet)
                .map_err(|error| TrimError::VideoDecodeError(error.to_string()));
        }
    }
}

impl FrameSource for VideoSource {
    type Frame = VideoFrame;

    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Seek to the keyframe at or before `frame_number`, then let
    /// [`next_frame`](FrameSource::next_frame) discard frames until the
    /// target is reached.
    ///
    /// Sources without a frame rate cannot map indices to timestamps; they
    /// are only positioned by counting from the beginning, which works as
    /// long as nothing has been read yet.
    fn seek_to_frame(&mut self, frame_number: u64) -> Result<(), TrimError> {
        self.skip_until = frame_number;

        if !self.packets_read && frame_number == 0 {
            return Ok(());
        }

        let frames_per_second = self.metadata.frames_per_second;
        if frames_per_second <= 0.0 {
            if self.packets_read {
                return Err(TrimError::VideoDecodeError(
                    "cannot seek in a stream without a frame rate".to_string(),
                ));
            }
            return Ok(());
        }

        let start_offset = crate::utilities::pts_to_seconds(self.start_pts, self.time_base);
        let target = crate::utilities::frame_number_to_seek_timestamp(frame_number, frames_per_second)
            + (start_offset * 1_000_000.0) as i64;

        log::debug!(
            "Seeking {} to frame {frame_number} (timestamp {target} us)",
            self.file_path.display()
        );

        self.input_context.seek(target, ..target)?;
        self.decoder.flush();
        self.draining = false;
        self.packets_read = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, TrimError> {
        loop {
            let mut frame = VideoFrame::empty();
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => {
                    let index = self.frame_index(&frame);
                    self.next_index = index + 1;
                    if index < self.skip_until {
                        continue;
                    }
                    return Ok(Some(frame));
                }
                Err(ffmpeg_next::Error::Eof) => return Ok(None),
                Err(ffmpeg_next::Error::Other {
                    errno: ffmpeg_next::util::error::EAGAIN,
                }) => {}
                Err(error) => return Err(TrimError::VideoDecodeError(error.to_string())),
            }

            if self.draining {
                return Ok(None);
            }
            self.feed_decoder()?;
        }
    }
}
