use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::shared::frame::Frame;

/// Resizes an RGB `src` to exactly `out_w` × `out_h`.
///
/// Shrinking on both axes averages whole blocks of source pixels, which keeps
/// downscaled crops free of aliasing. Anything that enlarges an axis falls
/// back to a triangle filter. The output keeps the source frame index.
pub fn resize_area(
    src: &Frame,
    out_w: u32,
    out_h: u32,
) -> Result<Frame, Box<dyn std::error::Error>> {
    if src.width() == out_w && src.height() == out_h {
        return Ok(src.clone());
    }

    let img = RgbImage::from_raw(src.width(), src.height(), src.data().to_vec())
        .ok_or("Failed to create image from frame data")?;

    let resized = if out_w <= src.width() && out_h <= src.height() {
        imageops::thumbnail(&img, out_w, out_h)
    } else {
        imageops::resize(&img, out_w, out_h, FilterType::Triangle)
    };

    Ok(Frame::new(resized.into_raw(), out_w, out_h, 3, src.index()))
}
