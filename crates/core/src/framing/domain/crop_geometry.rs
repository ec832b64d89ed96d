use crate::shared::point::Point;

/// The source rectangle that becomes one output frame.
///
/// Always lies inside the frame it was computed for and has the target
/// aspect ratio up to integer rounding of one side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    pub fn center(&self) -> Point {
        Point::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

/// Computes the "cover" crop of a `frame_w` × `frame_h` frame for
/// `target_ratio` (width / height), centered as close to `center` as the frame
/// edges allow.
///
/// The side that is relatively too long is cut; the other side is kept whole,
/// so the result never needs padding.
pub fn compute_crop(frame_w: u32, frame_h: u32, target_ratio: f64, center: Point) -> CropWindow {
    let fw = frame_w as f64;
    let fh = frame_h as f64;

    let (width, height) = if fw / fh > target_ratio {
        let w = (fh * target_ratio).round().clamp(1.0, fw) as u32;
        (w, frame_h)
    } else {
        let h = (fw / target_ratio).round().clamp(1.0, fh) as u32;
        (frame_w, h)
    };

    let x = place(center.x, width, frame_w);
    let y = place(center.y, height, frame_h);

    CropWindow {
        x,
        y,
        width,
        height,
    }
}

/// Origin of a `len`-long span centered on `c`, clamped into `[0, total - len]`.
fn place(c: f64, len: u32, total: u32) -> u32 {
    let max_origin = (total - len) as f64;
    let origin = (c - len as f64 / 2.0).round();
    if origin.is_nan() {
        return 0;
    }
    origin.clamp(0.0, max_origin) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn assert_inside(win: &CropWindow, fw: u32, fh: u32) {
        assert!(win.x + win.width <= fw, "{win:?} exceeds width {fw}");
        assert!(win.y + win.height <= fh, "{win:?} exceeds height {fh}");
        assert!(win.width >= 1 && win.height >= 1);
    }

    #[test]
    fn test_landscape_to_portrait_keeps_full_height() {
        let win = compute_crop(1920, 1080, 9.0 / 16.0, Point::new(960.0, 540.0));
        assert_eq!(win.height, 1080);
        assert_eq!(win.width, 608); // round(1080 * 0.5625) = 607.5 -> 608
        assert_eq!(win.y, 0);
        assert_eq!(win.x, 656);
    }

    #[test]
    fn test_portrait_to_landscape_keeps_full_width() {
        let win = compute_crop(1000, 2000, 2.0, Point::new(500.0, 1000.0));
        assert_eq!(win.width, 1000);
        assert_eq!(win.height, 500);
        assert_eq!(win.x, 0);
        assert_eq!(win.y, 750);
    }

    #[test]
    fn test_same_ratio_is_full_frame() {
        let win = compute_crop(1920, 1080, 16.0 / 9.0, Point::new(0.0, 0.0));
        assert_eq!(
            win,
            CropWindow {
                x: 0,
                y: 0,
                width: 1920,
                height: 1080
            }
        );
    }

    #[test]
    fn test_center_near_left_edge_is_clamped() {
        let win = compute_crop(1920, 1080, 1.0, Point::new(10.0, 540.0));
        assert_eq!(win.x, 0);
        assert_eq!(win.width, 1080);
    }

    #[test]
    fn test_center_near_right_edge_is_clamped() {
        let win = compute_crop(1920, 1080, 1.0, Point::new(1915.0, 540.0));
        assert_eq!(win.x, 1920 - 1080);
    }

    #[test]
    fn test_center_outside_frame_is_clamped() {
        let win = compute_crop(1920, 1080, 9.0 / 16.0, Point::new(-500.0, 5000.0));
        assert_eq!(win.x, 0);
        assert_eq!(win.y, 0);
        assert_inside(&win, 1920, 1080);
    }

    #[test]
    fn test_window_center_follows_requested_center() {
        let win = compute_crop(1920, 1080, 1.0, Point::new(800.0, 540.0));
        assert_eq!(win.center(), Point::new(800.0, 540.0));
    }

    #[test]
    fn test_extreme_ratio_never_collapses_below_one_pixel() {
        let win = compute_crop(100, 100, 1000.0, Point::new(50.0, 50.0));
        assert_eq!(win.width, 100);
        assert_eq!(win.height, 1);
        assert_inside(&win, 100, 100);
    }

    #[rstest]
    #[case(1920, 1080, 9.0 / 16.0)]
    #[case(1920, 1080, 1.0)]
    #[case(1080, 1920, 16.0 / 9.0)]
    #[case(1280, 720, 4.0 / 5.0)]
    #[case(641, 479, 9.0 / 16.0)]
    #[case(333, 777, 1.0)]
    fn test_ratio_and_bounds_hold_across_centers(
        #[case] fw: u32,
        #[case] fh: u32,
        #[case] ratio: f64,
    ) {
        let centers = [
            Point::new(0.0, 0.0),
            Point::new(fw as f64 / 3.0, fh as f64 * 0.8),
            Point::new(fw as f64, fh as f64),
            Point::new(fw as f64 * 2.0, -10.0),
        ];
        for c in centers {
            let win = compute_crop(fw, fh, ratio, c);
            assert_inside(&win, fw, fh);
            // Rounding one side may move the ratio by at most one pixel.
            let ideal_w = win.height as f64 * ratio;
            let ideal_h = win.width as f64 / ratio;
            assert!(
                (win.width as f64 - ideal_w).abs() <= 1.0
                    || (win.height as f64 - ideal_h).abs() <= 1.0,
                "{win:?} does not match ratio {ratio}"
            );
        }
    }
}
