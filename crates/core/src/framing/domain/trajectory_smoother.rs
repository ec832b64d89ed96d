use crate::shared::point::Point;

/// Exponential moving average over the crop-center trajectory.
///
/// Formula: `ema[t] = alpha * current + (1 - alpha) * ema[t-1]`.
/// The first point is passed through unchanged. Lower alpha means a steadier
/// camera that lags further behind the subject.
pub struct TrajectorySmoother {
    alpha: f64,
    value: Option<Point>,
}

impl TrajectorySmoother {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    pub fn update(&mut self, point: Point) -> Point {
        let smoothed = match self.value {
            None => point,
            Some(prev) => Point::new(
                self.alpha * point.x + (1.0 - self.alpha) * prev.x,
                self.alpha * point.y + (1.0 - self.alpha) * prev.y,
            ),
        };
        self.value = Some(smoothed);
        smoothed
    }

    pub fn current(&self) -> Option<Point> {
        self.value
    }
}
