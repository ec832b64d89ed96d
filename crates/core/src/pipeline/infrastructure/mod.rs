pub mod ffmpeg_run_factory;
