pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Frames between forced re-detections.
pub const DEFAULT_DETECT_EVERY: usize = 12;
pub const DEFAULT_EMA_ALPHA: f64 = 0.08;
/// Max per-frame movement of the crop center, in source pixels.
pub const DEFAULT_PAN_CAP_PX: f64 = 16.0;

/// Used when a source does not report its frame rate.
pub const FALLBACK_FPS: f64 = 25.0;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mxf", "m4v", "avi", "mkv"];
