//! YOLO subject detector using ONNX Runtime via `ort`.
//!
//! Handles letterbox preprocessing, inference, class scoring and NMS. Boxes
//! come back in source-frame pixels, clamped to the frame.

use std::path::Path;

use crate::detection::domain::subject_detector::SubjectDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for subject detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.35;

/// Default class to keep (0 is the face/person class in the bundled models).
pub const DEFAULT_CLASS_ID: usize = 0;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of box values preceding the class scores in each output row.
const BOX_FEATURES: usize = 4;

/// YOLO detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    class_id: usize,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(
        model_path: &Path,
        confidence: f64,
        class_id: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(platform_execution_providers())?
            .commit_from_file(model_path)?;

        // NCHW: [1, 3, H, W]
        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!(
            "Loaded YOLO model {} (input {input_size}px, class {class_id}, conf {confidence})",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            class_id,
            input_size,
        })
    }
}

impl SubjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        let (input_tensor, letterbox) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let layout = OutputLayout::from_shape(&shape)?;
        let mut raw_dets = decode_rows(
            data,
            layout,
            BOX_FEATURES + self.class_id,
            self.confidence,
            &letterbox,
        );

        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);
        Ok(kept
            .into_iter()
            .map(|d| d.bbox.clamp_to(frame.width(), frame.height()))
            .filter(|b| b.area() > 0.0)
            .collect())
    }
}

/// Hardware accelerator for the current platform, if `ort` was built with
/// one. ONNX Runtime falls back to CPU when registration fails.
fn platform_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    return vec![ort::execution_providers::CoreMLExecutionProvider::default().build()];
    #[cfg(target_os = "windows")]
    return vec![ort::execution_providers::DirectMLExecutionProvider::default().build()];
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    Vec::new()
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Mapping from letterboxed model coordinates back to the source frame.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_frame(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns the NCHW float32 tensor and the mapping back to frame coordinates.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention.
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize + copy into padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Output decoding
// ---------------------------------------------------------------------------

/// YOLO exports emit either `[1, features, detections]` (transposed) or
/// `[1, detections, features]`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct OutputLayout {
    num_dets: usize,
    num_feats: usize,
    transposed: bool,
}

impl OutputLayout {
    fn from_shape(shape: &[usize]) -> Result<Self, Box<dyn std::error::Error>> {
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        Ok(Self {
            num_dets,
            num_feats,
            transposed,
        })
    }

    fn feature(&self, data: &[f32], det: usize, feat: usize) -> f32 {
        if self.transposed {
            data[feat * self.num_dets + det]
        } else {
            data[det * self.num_feats + feat]
        }
    }
}

/// Reads `[cx, cy, w, h, scores…]` rows, keeping those whose score at
/// `score_index` reaches `confidence`.
fn decode_rows(
    data: &[f32],
    layout: OutputLayout,
    score_index: usize,
    confidence: f64,
    letterbox: &Letterbox,
) -> Vec<RawDetection> {
    if score_index >= layout.num_feats {
        log::warn!(
            "YOLO output has {} features, no score at index {score_index}",
            layout.num_feats
        );
        return Vec::new();
    }

    let mut dets = Vec::new();
    for i in 0..layout.num_dets {
        let conf = layout.feature(data, i, score_index) as f64;
        if conf < confidence {
            continue;
        }

        let cx = layout.feature(data, i, 0) as f64;
        let cy = layout.feature(data, i, 1) as f64;
        let w = layout.feature(data, i, 2) as f64;
        let h = layout.feature(data, i, 3) as f64;

        let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);

        dets.push(RawDetection {
            bbox: BoundingBox::from_corners(x1, y1, x2, y2),
            confidence: conf,
        });
    }
    dets
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    bbox: BoundingBox,
    confidence: f64,
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && dets[i].bbox.iou(&dets[j].bbox) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
