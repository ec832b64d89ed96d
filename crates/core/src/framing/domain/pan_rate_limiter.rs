use crate::shared::point::Point;

/// Moves `target` back toward `prev` so the step is at most `max_px` long.
///
/// The direction of travel is preserved; only its length is shortened.
/// Without a previous point, or with `max_px <= 0`, the target is returned
/// unchanged.
pub fn cap(prev: Option<Point>, target: Point, max_px: f64) -> Point {
    let Some(prev) = prev else {
        return target;
    };
    if max_px <= 0.0 {
        return target;
    }

    let dist = prev.distance_to(&target);
    if dist <= max_px {
        return target;
    }

    let scale = max_px / dist;
    Point::new(
        prev.x + (target.x - prev.x) * scale,
        prev.y + (target.y - prev.y) * scale,
    )
}

/// Per-run state for [`cap`]: remembers the last emitted (capped) center.
pub struct PanRateLimiter {
    max_px: f64,
    last: Option<Point>,
}

impl PanRateLimiter {
    pub fn new(max_px: f64) -> Self {
        Self { max_px, last: None }
    }

    pub fn apply(&mut self, target: Point) -> Point {
        let capped = cap(self.last, target, self.max_px);
        self.last = Some(capped);
        capped
    }

    pub fn last(&self) -> Option<Point> {
        self.last
    }
}
