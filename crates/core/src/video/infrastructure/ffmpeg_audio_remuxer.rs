use std::path::Path;

use crate::video::domain::audio_remuxer::AudioRemuxer;

/// Stream-copies a source's audio next to a silent video, without
/// re-encoding either stream.
///
/// Packets from both inputs are merged in timestamp order. Audio that runs
/// past the end of the video is dropped so the output is as long as the
/// reframed picture.
pub struct FfmpegAudioRemuxer;

impl AudioRemuxer for FfmpegAudioRemuxer {
    fn has_audio(&self, source: &Path) -> bool {
        if let Err(e) = ffmpeg_next::init() {
            log::warn!("ffmpeg init failed while probing audio: {e}");
            return false;
        }
        match ffmpeg_next::format::input(source) {
            Ok(ictx) => ictx
                .streams()
                .best(ffmpeg_next::media::Type::Audio)
                .is_some(),
            Err(e) => {
                log::debug!("Cannot probe {} for audio: {e}", source.display());
                false
            }
        }
    }

    fn remux(
        &self,
        source: &Path,
        silent_video: &Path,
        destination: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let mut ictx_video = ffmpeg_next::format::input(silent_video)?;
        let mut ictx_audio = ffmpeg_next::format::input(source)?;
        let mut octx = ffmpeg_next::format::output(destination)?;

        let video_stream = ictx_video
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream in silent video")?;
        let video_in = video_stream.index();
        let video_in_tb = video_stream.time_base();

        let audio_stream = ictx_audio
            .streams()
            .best(ffmpeg_next::media::Type::Audio)
            .ok_or("No audio stream in source")?;
        let audio_in = audio_stream.index();
        let audio_in_tb = audio_stream.time_base();

        let video_out = copy_stream(&mut octx, &video_stream)?;
        let audio_out = copy_stream(&mut octx, &audio_stream)?;

        // Seconds; zero or negative means the container did not say.
        let video_end = ictx_video.duration() as f64 / ffmpeg_next::ffi::AV_TIME_BASE as f64;

        octx.write_header()?;

        let video_out_tb = octx
            .stream(video_out)
            .ok_or("output video stream missing")?
            .time_base();
        let audio_out_tb = octx
            .stream(audio_out)
            .ok_or("output audio stream missing")?
            .time_base();

        let mut video_packets = ictx_video
            .packets()
            .filter(|(s, _)| s.index() == video_in)
            .map(|(_, p)| p)
            .peekable();
        let mut audio_packets = ictx_audio
            .packets()
            .filter(|(s, _)| s.index() == audio_in)
            .map(|(_, p)| p)
            .take_while(|p| video_end <= 0.0 || seconds(p, audio_in_tb) < video_end)
            .peekable();

        let mut written = (0usize, 0usize);
        loop {
            let take_video = match (video_packets.peek(), audio_packets.peek()) {
                (None, None) => break,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some(v), Some(a)) => seconds(v, video_in_tb) <= seconds(a, audio_in_tb),
            };

            let (mut packet, in_tb, out_tb, index) = if take_video {
                written.0 += 1;
                let p = video_packets.next().ok_or("video packet vanished")?;
                (p, video_in_tb, video_out_tb, video_out)
            } else {
                written.1 += 1;
                let p = audio_packets.next().ok_or("audio packet vanished")?;
                (p, audio_in_tb, audio_out_tb, audio_out)
            };

            packet.rescale_ts(in_tb, out_tb);
            packet.set_position(-1);
            packet.set_stream(index);
            packet.write_interleaved(&mut octx)?;
        }

        octx.write_trailer()?;
        log::debug!(
            "Remuxed {} video + {} audio packets into {}",
            written.0,
            written.1,
            destination.display()
        );
        Ok(())
    }
}

/// Adds an output stream with the same codec parameters as `input`.
fn copy_stream(
    octx: &mut ffmpeg_next::format::context::Output,
    input: &ffmpeg_next::format::stream::Stream,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut ost = octx.add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))?;
    ost.set_parameters(input.parameters());
    // Let the output muxer pick its own codec tag.
    unsafe {
        (*ost.parameters().as_mut_ptr()).codec_tag = 0;
    }
    Ok(ost.index())
}

/// Presentation time of `packet` in seconds, falling back to its decode time.
fn seconds(packet: &ffmpeg_next::Packet, time_base: ffmpeg_next::Rational) -> f64 {
    let ts = packet.pts().or(packet.dts()).unwrap_or(0);
    ts as f64 * f64::from(time_base)
}
