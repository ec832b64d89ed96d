/// A 2D position in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Geometric center of a `width` × `height` frame.
    pub fn frame_center(width: u32, height: u32) -> Self {
        Self::new(width as f64 / 2.0, height as f64 / 2.0)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}
