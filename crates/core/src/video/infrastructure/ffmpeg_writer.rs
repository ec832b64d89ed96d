use std::path::Path;

use crate::shared::constants::FALLBACK_FPS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Default target bit rate for encoded output, in bits per second.
pub const DEFAULT_BIT_RATE: usize = 8_000_000;

/// MPEG-4 Part 2 caps the time base denominator at 16 bits.
const MAX_TIME_BASE_DEN: i32 = 65_535;

/// Encodes frames into a silent MPEG-4 stream via ffmpeg-next.
pub struct FfmpegWriter {
    bit_rate: usize,
    output: Option<OpenOutput>,
}

struct OpenOutput {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: ffmpeg_next::software::scaling::Context,
    encoder_time_base: ffmpeg_next::Rational,
    width: u32,
    height: u32,
    frame_count: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            bit_rate: DEFAULT_BIT_RATE,
            output: None,
        }
    }

    pub fn with_bit_rate(mut self, bit_rate: usize) -> Self {
        self.bit_rate = bit_rate;
        self
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a floating point frame rate into the rational ffmpeg expects,
/// falling back to 25 fps when the source does not report one.
pub fn frame_rate(fps: f64) -> ffmpeg_next::Rational {
    let fps = if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        FALLBACK_FPS
    };
    let rate = ffmpeg_next::Rational::from(fps);
    if rate.numerator() > 0 && rate.denominator() > 0 && rate.denominator() <= MAX_TIME_BASE_DEN {
        rate
    } else {
        ffmpeg_next::Rational::new((fps * 1000.0).round() as i32, 1000)
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        self.output = None;

        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        // Use MPEG4 as a widely compatible encoder
        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let rate = frame_rate(metadata.fps);
        let time_base = rate.invert();

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(rate));
        encoder_ctx.set_bit_rate(self.bit_rate);

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        ost.set_time_base(time_base);

        octx.write_header()?;

        // RGB -> YUV
        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Encoding {} at {}x{}, {}/{} fps, {} b/s",
            path.display(),
            metadata.width,
            metadata.height,
            rate.numerator(),
            rate.denominator(),
            self.bit_rate
        );

        self.output = Some(OpenOutput {
            octx,
            encoder,
            scaler,
            encoder_time_base: time_base,
            width: metadata.width,
            height: metadata.height,
            frame_count: 0,
        });

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let out = self.output.as_mut().ok_or("FfmpegWriter: not opened")?;

        if frame.width() != out.width || frame.height() != out.height || frame.channels() != 3 {
            return Err(format!(
                "FfmpegWriter: expected {}x{} RGB frame, got {}x{} with {} channels",
                out.width,
                out.height,
                frame.width(),
                frame.height(),
                frame.channels()
            )
            .into());
        }

        let mut rgb = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            out.width,
            out.height,
        );
        let row_len = out.width as usize * 3;
        let stride = rgb.stride(0);
        for (dst, src) in rgb
            .data_mut(0)
            .chunks_mut(stride)
            .zip(frame.data().chunks_exact(row_len))
        {
            dst[..row_len].copy_from_slice(src);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        out.scaler.run(&rgb, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(out.frame_count as i64));

        out.encoder.send_frame(&yuv_frame)?;
        out.drain_packets()?;

        out.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(mut out) = self.output.take() else {
            return Ok(());
        };

        out.encoder.send_eof()?;
        out.drain_packets()?;
        out.octx.write_trailer()?;

        log::debug!("Encoded {} frames", out.frame_count);
        Ok(())
    }
}

impl OpenOutput {
    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let ost_time_base = self
            .octx
            .stream(0)
            .ok_or("FfmpegWriter: output stream missing")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(self.encoder_time_base, ost_time_base);
            encoded.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }
}
