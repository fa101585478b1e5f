// THEORY:
// The PSNR (peak signal-to-noise ratio) metric is the single number that
// drives every decision in this library. It collapses two equally-sized
// images into one logarithmic score: the larger the score, the more alike
// the images are. Values above ~30 mean the images are nearly identical;
// the closer to zero, the more they differ.
//
// One deliberate quirk is preserved from the original algorithm: when the
// sum of squared errors is numerically negligible (i.e. the images are
// byte-for-byte identical), the function returns exactly 0.0 instead of the
// mathematically correct +infinity. Callers treat that exact zero as an
// "identical images" sentinel rather than as a very low similarity score.

use image::DynamicImage;

use crate::error::DetectError;

/// Sum-of-squared-errors below this is treated as "no difference at all".
const SSE_EPSILON: f64 = 1e-10;

/// Computes the PSNR score between two images of identical color type and
/// dimensions. Intended for 8-bit sample images.
///
/// Returns exactly `0.0` when the images are identical (see module notes),
/// otherwise `10 * log10(255^2 / mse)`.
///
/// # Errors
///
/// [`DetectError::EmptyImage`] if either image has zero area, and
/// [`DetectError::IncomparableImages`] if the two differ in color type,
/// width, or height.
pub fn psnr(src: &DynamicImage, dst: &DynamicImage) -> Result<f64, DetectError> {
    if src.width() == 0 || src.height() == 0 || dst.width() == 0 || dst.height() == 0 {
        return Err(DetectError::EmptyImage);
    }

    if src.color() != dst.color() || src.width() != dst.width() || src.height() != dst.height() {
        return Err(DetectError::IncomparableImages {
            src_width: src.width(),
            src_height: src.height(),
            src_color: src.color(),
            dst_width: dst.width(),
            dst_height: dst.height(),
            dst_color: dst.color(),
        });
    }

    let sse: f64 = src
        .as_bytes()
        .iter()
        .zip(dst.as_bytes())
        .map(|(&a, &b)| {
            let diff = f64::from(a) - f64::from(b);
            diff * diff
        })
        .sum();

    if sse <= SSE_EPSILON {
        return Ok(0.0);
    }

    let channels = f64::from(src.color().channel_count());
    let pixels = f64::from(src.width()) * f64::from(src.height());
    let mse = sse / (channels * pixels);

    Ok(10.0 * (255.0 * 255.0 / mse).log10())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn solid(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([value; 3])))
    }

    #[test]
    fn identical_images_return_exactly_zero() {
        let a = solid(10, 10, 128);
        let b = solid(10, 10, 128);
        let score = psnr(&a, &b).unwrap();
        assert_eq!(score, 0.0);
        assert!(!score.is_nan());
        assert!(score.is_finite());
    }

    #[test]
    fn known_uniform_difference() {
        // A uniform per-sample difference of d gives mse = d^2,
        // so psnr = 10 * log10(255^2 / d^2). With d = 51 that is
        // 10 * log10(25) ~= 13.979.
        let a = solid(8, 8, 0);
        let b = solid(8, 8, 51);
        let score = psnr(&a, &b).unwrap();
        assert!((score - 13.979).abs() < 0.01, "score was {score}");
    }

    #[test]
    fn score_decreases_as_difference_grows() {
        let base = solid(10, 10, 0);
        let near = psnr(&base, &solid(10, 10, 8)).unwrap();
        let mid = psnr(&base, &solid(10, 10, 64)).unwrap();
        let far = psnr(&base, &solid(10, 10, 200)).unwrap();
        assert!(near > mid);
        assert!(mid > far);
        assert!(far > 0.0);
    }

    #[test]
    fn empty_src_is_rejected() {
        let empty = DynamicImage::new_rgb8(0, 0);
        let ok = solid(4, 4, 1);
        assert_eq!(psnr(&empty, &ok), Err(DetectError::EmptyImage));
    }

    #[test]
    fn empty_dst_is_rejected() {
        let empty = DynamicImage::new_rgb8(0, 0);
        let ok = solid(4, 4, 1);
        assert_eq!(psnr(&ok, &empty), Err(DetectError::EmptyImage));
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let a = solid(4, 4, 1);
        let b = solid(4, 5, 1);
        assert!(matches!(
            psnr(&a, &b),
            Err(DetectError::IncomparableImages { .. })
        ));
    }

    #[test]
    fn mismatched_color_types_are_rejected() {
        let a = solid(4, 4, 1);
        let b = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            4,
            4,
            image::Luma([1]),
        ));
        assert!(matches!(
            psnr(&a, &b),
            Err(DetectError::IncomparableImages { .. })
        ));
    }
}
