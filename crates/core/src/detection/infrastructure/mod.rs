pub mod detector_factory;
pub mod onnx_yolo_detector;
pub mod template_tracker;
