pub mod bounding_box;
pub mod constants;
pub mod frame;
pub mod model_resolver;
pub mod point;
pub mod reframe_error;
pub mod video_metadata;
