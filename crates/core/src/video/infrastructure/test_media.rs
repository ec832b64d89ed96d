//! Synthetic media for ffmpeg-backed tests.

use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// One synthetic frame: a bright square "subject" on a dark background,
/// sliding from the left edge to the right edge over `num_frames` frames.
pub fn subject_frame(index: usize, num_frames: usize, width: u32, height: u32) -> Frame {
    let side = (width.min(height) / 4).max(1);
    let travel = width.saturating_sub(side) as usize;
    let left = if num_frames > 1 {
        (travel * index / (num_frames - 1)) as u32
    } else {
        0
    };
    let top = (height - side) / 2;

    let mut data = vec![24u8; (width * height * 3) as usize];
    for y in top..top + side {
        let row = (y * width) as usize * 3;
        let span = row + left as usize * 3..row + (left + side) as usize * 3;
        data[span].fill(230);
    }
    Frame::new(data, width, height, 3, index)
}

/// Encodes `num_frames` frames of [`subject_frame`] as a video-only file.
pub fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32, fps: f64) {
    let metadata = VideoMetadata {
        width,
        height,
        fps,
        total_frames: num_frames,
        codec: String::new(),
        source_path: None,
    };
    let mut writer = FfmpegWriter::new().with_bit_rate(1_000_000);
    writer.open(path, &metadata).unwrap();
    for i in 0..num_frames {
        writer
            .write(&subject_frame(i, num_frames, width, height))
            .unwrap();
    }
    writer.close().unwrap();
}

/// Copies the video of `video` into `dest` and adds `seconds` of a 440 Hz
/// AAC tone at 16 kHz mono.
pub fn add_tone_track(video: &Path, dest: &Path, seconds: f64) {
    const RATE: i32 = 16_000;

    ffmpeg_next::init().unwrap();
    let mut ictx = ffmpeg_next::format::input(video).unwrap();
    let mut octx = ffmpeg_next::format::output(dest).unwrap();
    let global_header = octx
        .format()
        .flags()
        .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

    let video_stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .unwrap();
    let video_src_idx = video_stream.index();
    let video_in_tb = video_stream.time_base();

    let mut ost_video = octx
        .add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))
        .unwrap();
    ost_video.set_parameters(video_stream.parameters());
    unsafe {
        (*ost_video.parameters().as_mut_ptr()).codec_tag = 0;
    }
    let video_ost_idx = ost_video.index();

    let aac = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::AAC).unwrap();
    let mut ost_audio = octx.add_stream(Some(aac)).unwrap();
    let audio_ost_idx = ost_audio.index();

    let mut encoder = ffmpeg_next::codec::context::Context::new_with_codec(aac)
        .encoder()
        .audio()
        .unwrap();
    encoder.set_rate(RATE);
    encoder.set_channel_layout(ffmpeg_next::ChannelLayout::MONO);
    encoder.set_format(ffmpeg_next::format::Sample::F32(
        ffmpeg_next::format::sample::Type::Planar,
    ));
    encoder.set_time_base(ffmpeg_next::Rational(1, RATE));
    if global_header {
        encoder.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
    }
    let mut encoder = encoder.open_as(aac).unwrap();
    ost_audio.set_parameters(&encoder);
    let enc_tb = encoder.time_base();
    let frame_size = match encoder.frame_size() as usize {
        0 => 1024,
        n => n,
    };

    octx.write_header().unwrap();
    let ost_video_tb = octx.stream(video_ost_idx).unwrap().time_base();
    let ost_audio_tb = octx.stream(audio_ost_idx).unwrap().time_base();

    for (stream, mut packet) in ictx.packets() {
        if stream.index() != video_src_idx {
            continue;
        }
        packet.rescale_ts(video_in_tb, ost_video_tb);
        packet.set_position(-1);
        packet.set_stream(video_ost_idx);
        packet.write_interleaved(&mut octx).unwrap();
    }

    let total = (seconds * RATE as f64) as usize;
    let samples: Vec<f32> = (0..total)
        .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / RATE as f32).sin() * 0.2)
        .collect();

    let drain = |encoder: &mut ffmpeg_next::codec::encoder::audio::Encoder,
                     octx: &mut ffmpeg_next::format::context::Output| {
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(audio_ost_idx);
            encoded.rescale_ts(enc_tb, ost_audio_tb);
            encoded.write_interleaved(octx).unwrap();
        }
    };

    let mut pts = 0i64;
    for chunk in samples.chunks(frame_size) {
        let mut frame = ffmpeg_next::util::frame::audio::Audio::new(
            ffmpeg_next::format::Sample::F32(ffmpeg_next::format::sample::Type::Planar),
            chunk.len(),
            ffmpeg_next::ChannelLayout::MONO,
        );
        frame.set_rate(RATE as u32);
        frame.set_pts(Some(pts));
        let dst = frame.data_mut(0);
        for (i, s) in chunk.iter().enumerate() {
            dst[i * 4..i * 4 + 4].copy_from_slice(&s.to_ne_bytes());
        }
        encoder.send_frame(&frame).unwrap();
        drain(&mut encoder, &mut octx);
        pts += chunk.len() as i64;
    }
    encoder.send_eof().unwrap();
    drain(&mut encoder, &mut octx);

    octx.write_trailer().unwrap();
}

/// Number of packets per media type in `path`: `(video, audio)`.
pub fn count_packets(path: &Path) -> (usize, usize) {
    ffmpeg_next::init().unwrap();
    let mut ictx = ffmpeg_next::format::input(path).unwrap();
    let mut video = 0;
    let mut audio = 0;
    for (stream, _) in ictx.packets() {
        match stream.parameters().medium() {
            ffmpeg_next::media::Type::Video => video += 1,
            ffmpeg_next::media::Type::Audio => audio += 1,
            _ => {}
        }
    }
    (video, audio)
}
