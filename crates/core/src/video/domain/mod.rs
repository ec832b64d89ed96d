pub mod audio_remuxer;
pub mod video_reader;
pub mod video_writer;
