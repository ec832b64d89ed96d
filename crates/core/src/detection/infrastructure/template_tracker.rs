//! Single-subject tracker based on normalized cross-correlation.
//!
//! `init` captures a grayscale template of the subject box. Each `update`
//! searches a window around the last position, first on a coarse grid and
//! then pixel by pixel around the best coarse hit. The box keeps its size;
//! only its position follows the best match.

use crate::detection::domain::subject_tracker::{SubjectTracker, TrackerFactory};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Minimum NCC score for a match to count as the same subject.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;

/// Search radius as a fraction of the box's longer side.
pub const DEFAULT_SEARCH_FACTOR: f64 = 0.5;

const MIN_SEARCH_RADIUS: i64 = 8;

/// Templates are subsampled so their longer side has at most this many samples.
const MAX_TEMPLATE_SIDE: u32 = 32;

pub struct TemplateTracker {
    threshold: f64,
    search_factor: f64,
    state: Option<TrackState>,
}

struct TrackState {
    bbox: BoundingBox,
    template: Template,
}

impl TemplateTracker {
    pub fn new(threshold: f64, search_factor: f64) -> Self {
        Self {
            threshold,
            search_factor,
            state: None,
        }
    }

    /// Factory producing fresh trackers with the given settings.
    pub fn factory(threshold: f64, search_factor: f64) -> TrackerFactory {
        Box::new(move || {
            Box::new(TemplateTracker::new(threshold, search_factor)) as Box<dyn SubjectTracker>
        })
    }
}

impl Default for TemplateTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD, DEFAULT_SEARCH_FACTOR)
    }
}

impl SubjectTracker for TemplateTracker {
    fn init(&mut self, frame: &Frame, bbox: BoundingBox) -> Result<(), Box<dyn std::error::Error>> {
        let bbox = bbox.clamp_to(frame.width(), frame.height());
        let rect = PixelRect::from_bbox(&bbox);
        if rect.w == 0 || rect.h == 0 {
            return Err(format!("cannot track an empty box: {bbox:?}").into());
        }

        let luma = LumaPlane::from_frame(frame);
        let template = Template::capture(&luma, &rect);
        self.state = Some(TrackState {
            bbox: rect.to_bbox(),
            template,
        });
        Ok(())
    }

    fn update(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<BoundingBox>, Box<dyn std::error::Error>> {
        let state = self
            .state
            .as_mut()
            .ok_or("tracker updated before init")?;

        // A textureless template matches anywhere; treat it as lost.
        if state.template.is_flat() {
            log::trace!("Flat template, cannot follow {:?}", state.bbox);
            return Ok(None);
        }

        let luma = LumaPlane::from_frame(frame);
        let last = PixelRect::from_bbox(&state.bbox);
        if last.w > luma.width || last.h > luma.height {
            return Ok(None);
        }

        let radius =
            ((last.w.max(last.h) as f64 * self.search_factor).round() as i64).max(MIN_SEARCH_RADIUS);
        let (best, score) = search(&luma, &state.template, &last, radius);

        if score < self.threshold {
            log::trace!("Template match {score:.3} below threshold {}", self.threshold);
            return Ok(None);
        }

        state.bbox = best.to_bbox();
        Ok(Some(state.bbox))
    }
}

/// Exhaustive search on a coarse grid followed by a dense refinement.
fn search(luma: &LumaPlane, template: &Template, last: &PixelRect, radius: i64) -> (PixelRect, f64) {
    let max_x = (luma.width - last.w) as i64;
    let max_y = (luma.height - last.h) as i64;
    let x_range = ((last.x as i64 - radius).max(0), (last.x as i64 + radius).min(max_x));
    let y_range = ((last.y as i64 - radius).max(0), (last.y as i64 + radius).min(max_y));

    let stride = template.step as i64;
    let mut best = (last.x as i64, last.y as i64);
    let mut best_score = f64::NEG_INFINITY;

    let visit = |x: i64, y: i64, best: &mut (i64, i64), best_score: &mut f64| {
        let score = template.score_at(luma, x as u32, y as u32);
        if score > *best_score {
            *best_score = score;
            *best = (x, y);
        }
    };

    let mut y = y_range.0;
    while y <= y_range.1 {
        let mut x = x_range.0;
        while x <= x_range.1 {
            visit(x, y, &mut best, &mut best_score);
            x += stride;
        }
        y += stride;
    }

    if stride > 1 {
        let (cx, cy) = best;
        for y in (cy - stride + 1).max(y_range.0)..=(cy + stride - 1).min(y_range.1) {
            for x in (cx - stride + 1).max(x_range.0)..=(cx + stride - 1).min(x_range.1) {
                visit(x, y, &mut best, &mut best_score);
            }
        }
    }

    let rect = PixelRect {
        x: best.0 as u32,
        y: best.1 as u32,
        w: last.w,
        h: last.h,
    };
    (rect, best_score)
}

/// Integer pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
struct PixelRect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

impl PixelRect {
    fn from_bbox(bbox: &BoundingBox) -> Self {
        Self {
            x: bbox.x.round().max(0.0) as u32,
            y: bbox.y.round().max(0.0) as u32,
            w: bbox.width.round().max(0.0) as u32,
            h: bbox.height.round().max(0.0) as u32,
        }
    }

    fn to_bbox(self) -> BoundingBox {
        BoundingBox::new(self.x as f64, self.y as f64, self.w as f64, self.h as f64)
    }
}

/// Grayscale copy of a frame (BT.601 luma).
struct LumaPlane {
    values: Vec<f32>,
    width: u32,
    height: u32,
}

impl LumaPlane {
    fn from_frame(frame: &Frame) -> Self {
        let ch = frame.channels() as usize;
        let values = frame
            .data()
            .chunks_exact(ch)
            .map(|px| {
                if ch >= 3 {
                    0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32
                } else {
                    px[0] as f32
                }
            })
            .collect();
        Self {
            values,
            width: frame.width(),
            height: frame.height(),
        }
    }

    fn at(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.width + x) as usize]
    }
}

/// Mean-centered samples of the subject, on a regular grid.
struct Template {
    values: Vec<f32>,
    cols: u32,
    rows: u32,
    step: u32,
    norm: f64,
}

impl Template {
    fn capture(luma: &LumaPlane, rect: &PixelRect) -> Self {
        let step = rect.w.max(rect.h).div_ceil(MAX_TEMPLATE_SIDE).max(1);
        let cols = rect.w.div_ceil(step);
        let rows = rect.h.div_ceil(step);

        let mut values = sample(luma, rect.x, rect.y, cols, rows, step);
        let norm = center(&mut values);
        Self {
            values,
            cols,
            rows,
            step,
            norm,
        }
    }

    fn is_flat(&self) -> bool {
        self.norm < 1e-6
    }

    /// NCC between the template and the window with top-left `(x, y)`, in `[-1, 1]`.
    fn score_at(&self, luma: &LumaPlane, x: u32, y: u32) -> f64 {
        let mut window = sample(luma, x, y, self.cols, self.rows, self.step);
        let norm = center(&mut window);
        if norm < 1e-6 || self.is_flat() {
            return 0.0;
        }
        let dot: f64 = self
            .values
            .iter()
            .zip(&window)
            .map(|(&a, &b)| a as f64 * b as f64)
            .sum();
        dot / (self.norm * norm)
    }
}

fn sample(luma: &LumaPlane, x: u32, y: u32, cols: u32, rows: u32, step: u32) -> Vec<f32> {
    let mut out = Vec::with_capacity((cols * rows) as usize);
    for r in 0..rows {
        let sy = (y + r * step).min(luma.height - 1);
        for c in 0..cols {
            let sx = (x + c * step).min(luma.width - 1);
            out.push(luma.at(sx, sy));
        }
    }
    out
}

/// Subtracts the mean in place and returns the L2 norm of the result.
fn center(values: &mut [f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;
    let mut sq = 0.0;
    for v in values.iter_mut() {
        *v -= mean as f32;
        sq += (*v as f64) * (*v as f64);
    }
    sq.sqrt()
}
