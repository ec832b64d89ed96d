use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Converts each decoded frame to RGB24 and wraps it in a [`Frame`].
pub struct FfmpegReader {
    input: Option<OpenInput>,
}

/// Everything `open` sets up, so `frames` cannot fail half-way through setup.
struct OpenInput {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    video_stream_index: usize,
    width: u32,
    height: u32,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self { input: None }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        self.input = None;

        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(format!("Video stream reports empty frame size {width}x{height}").into());
        }

        let rate = stream.avg_frame_rate();
        let rate = if rate.denominator() != 0 && rate.numerator() > 0 {
            rate
        } else {
            stream.rate()
        };
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            total_frames: stream.frames().max(0) as usize,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Opened {} ({}x{} @ {:.3} fps, {} frames, {})",
            path.display(),
            width,
            height,
            fps,
            metadata.total_frames,
            metadata.codec
        );

        self.input = Some(OpenInput {
            ictx,
            decoder,
            scaler,
            video_stream_index,
            width,
            height,
        });

        Ok(metadata)
    }

    fn is_open(&self) -> bool {
        self.input.is_some()
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(input) = self.input.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };
        Box::new(DecodedFrames {
            input,
            next_index: 0,
            stage: DecodeStage::Reading,
        })
    }

    fn close(&mut self) {
        self.input = None;
    }
}

#[derive(Clone, Copy, PartialEq)]
enum DecodeStage {
    /// Feeding demuxed packets to the decoder.
    Reading,
    /// End of input reached; the decoder is emptying its queue.
    Draining,
    Finished,
}

/// Pulls one frame at a time so a long source is never held in memory.
struct DecodedFrames<'a> {
    input: &'a mut OpenInput,
    next_index: usize,
    stage: DecodeStage,
}

impl DecodedFrames<'_> {
    /// The next frame the decoder has ready, converted to packed RGB.
    fn receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        self.input.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.input.scaler.run(&decoded, &mut rgb) {
            self.stage = DecodeStage::Finished;
            return Some(Err(e.into()));
        }

        let (width, height) = (self.input.width, self.input.height);
        let frame = Frame::new(packed_rgb(&rgb, width, height), width, height, 3, self.next_index);
        self.next_index += 1;
        Some(Ok(frame))
    }

    /// Sends the next video packet to the decoder. Returns `false` once the
    /// container is exhausted.
    fn feed(&mut self) -> bool {
        let stream_index = self.input.video_stream_index;
        for (stream, packet) in self.input.ictx.packets() {
            if stream.index() != stream_index {
                continue;
            }
            match self.input.decoder.send_packet(&packet) {
                Ok(()) => return true,
                Err(e) => log::debug!("Dropping undecodable packet: {e}"),
            }
        }
        false
    }
}

impl Iterator for DecodedFrames<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.stage == DecodeStage::Finished {
                return None;
            }
            if let Some(frame) = self.receive() {
                return Some(frame);
            }
            match self.stage {
                DecodeStage::Reading => {
                    if !self.feed() {
                        if let Err(e) = self.input.decoder.send_eof() {
                            log::debug!("Decoder rejected end of stream: {e}");
                        }
                        self.stage = DecodeStage::Draining;
                    }
                }
                DecodeStage::Draining | DecodeStage::Finished => {
                    self.stage = DecodeStage::Finished;
                }
            }
        }
    }
}

/// Copies plane 0 of an RGB24 frame into a tightly packed buffer, dropping
/// the per-row padding ffmpeg may add.
fn packed_rgb(rgb: &ffmpeg_next::util::frame::video::Video, width: u32, height: u32) -> Vec<u8> {
    let row_len = width as usize * 3;
    rgb.data(0)
        .chunks(rgb.stride(0))
        .take(height as usize)
        .flat_map(|row| &row[..row_len])
        .copied()
        .collect()
}
