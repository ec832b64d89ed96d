use super::point::Point;

/// An axis-aligned subject box in pixel coordinates, top-left origin.
///
/// Produced by detectors and trackers. Coordinates are floating point because
/// backends report sub-pixel positions; [`BoundingBox::clamp_to`] keeps a box
/// inside the frame it was found in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from `[x1, y1, x2, y2]` corners.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1, y1, (x2 - x1).max(0.0), (y2 - y1).max(0.0))
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Intersects the box with `[0, frame_w] × [0, frame_h]`.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> BoundingBox {
        let fw = frame_w as f64;
        let fh = frame_h as f64;
        let x1 = self.x.clamp(0.0, fw);
        let y1 = self.y.clamp(0.0, fh);
        let x2 = self.right().clamp(0.0, fw);
        let y2 = self.bottom().clamp(0.0, fh);
        BoundingBox::from_corners(x1, y1, x2, y2)
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    /// Picks the candidate with the largest area. Ties keep the first one seen.
    pub fn largest(candidates: &[BoundingBox]) -> Option<BoundingBox> {
        let mut best: Option<BoundingBox> = None;
        for candidate in candidates {
            match best {
                Some(b) if candidate.area() <= b.area() => {}
                _ => best = Some(*candidate),
            }
        }
        best
    }
}
