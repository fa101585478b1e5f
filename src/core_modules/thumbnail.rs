// THEORY:
// The thumbnail is the unit of comparison for the whole engine. Comparing
// full frames would be slow and hypersensitive: compression artifacts and
// sensor noise would read as movement. Shrinking each frame to a few percent
// of its original size with an averaging filter cancels that noise out while
// keeping the coarse structure that genuine movement changes.
//
// The thumbnail dimensions are derived once, from the first frame the engine
// sees, and then frozen. This keeps the comparison unit stable for the whole
// stream; a stream that changes resolution mid-flight is the caller's
// problem, not ours.

use image::DynamicImage;
use image::imageops::FilterType;

use crate::error::DetectError;

/// Clamps the caller-supplied reduction ratio to a sane range. A ratio of
/// 1.0 means "compare full frames"; anything below 1% is indistinguishable
/// from a handful of pixels.
pub fn clamp_ratio(ratio: f64) -> f64 {
    ratio.clamp(0.01, 1.0)
}

/// Derives the thumbnail dimensions for a frame of the given size. Both axes
/// are scaled by the clamped ratio, truncating, with a floor of one pixel.
pub fn derive_size(width: u32, height: u32, ratio: f64) -> (u32, u32) {
    let ratio = clamp_ratio(ratio);
    let w = ((f64::from(width) * ratio) as u32).max(1);
    let h = ((f64::from(height) * ratio) as u32).max(1);
    (w, h)
}

/// Shrinks a frame down to the given thumbnail size using an averaging
/// (triangle) filter, which behaves like area interpolation when
/// downscaling and so resists aliasing.
pub fn reduce(
    frame: &DynamicImage,
    (width, height): (u32, u32),
) -> Result<DynamicImage, DetectError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(DetectError::EmptyImage);
    }

    Ok(frame.resize_exact(width, height, FilterType::Triangle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn ratio_is_clamped_to_range() {
        assert_eq!(clamp_ratio(0.0), 0.01);
        assert_eq!(clamp_ratio(-3.0), 0.01);
        assert_eq!(clamp_ratio(5.0), 1.0);
        assert_eq!(clamp_ratio(0.05), 0.05);
    }

    #[test]
    fn size_scales_both_axes() {
        assert_eq!(derive_size(1920, 1080, 0.05), (96, 54));
        assert_eq!(derive_size(100, 100, 0.05), (5, 5));
    }

    #[test]
    fn size_never_collapses_to_zero() {
        assert_eq!(derive_size(10, 10, 0.01), (1, 1));
    }

    #[test]
    fn reduce_produces_requested_dimensions() {
        let frame = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            100,
            80,
            image::Rgb([42, 42, 42]),
        ));
        let thumb = reduce(&frame, (5, 4)).unwrap();
        assert_eq!(thumb.width(), 5);
        assert_eq!(thumb.height(), 4);
    }

    #[test]
    fn reduce_rejects_empty_frames() {
        let empty = DynamicImage::new_rgb8(0, 0);
        assert!(matches!(
            reduce(&empty, (5, 5)),
            Err(DetectError::EmptyImage)
        ));
    }
}
