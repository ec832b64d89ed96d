pub mod batch_reframe_use_case;
pub mod infrastructure;
pub mod output_finalizer;
pub mod pipeline_logger;
pub mod reframe_options;
pub mod reframe_video_use_case;
