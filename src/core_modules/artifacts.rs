// THEORY:
// Once movement has been detected, callers often want to know *where* in the
// frame it happened, not just that it happened. This module turns the pair
// of thumbnails that triggered the detection into spatial artifacts:
//
// 1.  The absolute difference of the two tiny thumbnails is upscaled back to
//     the full frame size. Working at thumbnail scale first is what makes
//     the mask cheap and noise-tolerant.
// 2.  The upscaled difference is converted to intensity and binarized at an
//     automatically chosen (Otsu) level, separating "changed" pixels from
//     background without a hand-tuned threshold.
// 3.  A dilation followed by an erosion merges nearby motion fragments into
//     contiguous regions and removes speckle, giving the final binary mask.
//
// Contour outlines and a bounding rectangle are then derived from the mask
// and drawn onto a copy of the original frame.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::drawing::{draw_antialiased_line_segment_mut, draw_line_segment_mut};
use imageproc::morphology::{dilate, erode};
use imageproc::pixelops::interpolate;
use imageproc::rect::Rect;

/// Dilation/erosion reach, equivalent to ten passes of a 3x3 structuring
/// element.
const MORPH_STEPS: u8 = 10;

/// Pixel value for masked (movement) regions.
const FOREGROUND: u8 = 255;

const CONTOUR_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BBOX_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Line rendering style for contour and bounding-box overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineType {
    /// Plain aliased lines.
    #[default]
    Plain,
    /// Anti-aliased lines, prettier but slightly slower.
    Antialiased,
}

/// Builds the movement mask for a positive detection: the absolute
/// difference between the matching control thumbnail and the current
/// thumbnail, upscaled to the frame size with a cubic filter, binarized at
/// the Otsu level, then closed morphologically.
///
/// Both thumbnails are read through their RGB8 views, so any 8-bit input
/// type is accepted.
pub fn movement_mask(
    baseline: &DynamicImage,
    thumbnail: &DynamicImage,
    frame_width: u32,
    frame_height: u32,
) -> GrayImage {
    let difference = absdiff_rgb(&baseline.to_rgb8(), &thumbnail.to_rgb8());

    // The difference is a very tiny image at this point. Blow it back up to
    // the original frame size before thresholding.
    let upscaled = DynamicImage::ImageRgb8(difference)
        .resize_exact(frame_width, frame_height, FilterType::CatmullRom)
        .to_luma8();

    let level = otsu_level(&upscaled);
    let binary = binarize(&upscaled, level);

    erode(&dilate(&binary, Norm::LInf, MORPH_STEPS), Norm::LInf, MORPH_STEPS)
}

/// An all-background mask matching the frame dimensions.
pub fn blank_mask(frame_width: u32, frame_height: u32) -> GrayImage {
    GrayImage::new(frame_width, frame_height)
}

/// The tight bounding rectangle around all foreground pixels of the mask,
/// or `None` when the mask is entirely background.
pub fn bounding_rect(mask: &GrayImage) -> Option<Rect> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel.0[0] > 0 {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !found {
        return None;
    }

    Some(
        Rect::at(min_x as i32, min_y as i32)
            .of_size(max_x - min_x + 1, max_y - min_y + 1),
    )
}

/// Traces the external contours of the mask and draws each one as a closed
/// polyline onto the canvas.
pub fn draw_contours(canvas: &mut RgbImage, mask: &GrayImage, size: u32, line_type: LineType) {
    for contour in find_contours::<i32>(mask) {
        if contour.border_type != BorderType::Outer {
            continue;
        }

        let points = &contour.points;
        if points.len() < 2 {
            continue;
        }

        for pair in points.windows(2) {
            draw_segment(
                canvas,
                (pair[0].x, pair[0].y),
                (pair[1].x, pair[1].y),
                CONTOUR_COLOR,
                size,
                line_type,
            );
        }

        // Close the loop.
        let first = points[0];
        let last = points[points.len() - 1];
        draw_segment(
            canvas,
            (last.x, last.y),
            (first.x, first.y),
            CONTOUR_COLOR,
            size,
            line_type,
        );
    }
}

/// Draws a single rectangle around the mask's overall bounding region.
/// Nothing is drawn when the mask is entirely background.
pub fn draw_bounding_box(canvas: &mut RgbImage, mask: &GrayImage, size: u32, line_type: LineType) {
    let Some(rect) = bounding_rect(mask) else {
        return;
    };

    let left = rect.left();
    let top = rect.top();
    let right = rect.right();
    let bottom = rect.bottom();

    draw_segment(canvas, (left, top), (right, top), BBOX_COLOR, size, line_type);
    draw_segment(canvas, (right, top), (right, bottom), BBOX_COLOR, size, line_type);
    draw_segment(canvas, (right, bottom), (left, bottom), BBOX_COLOR, size, line_type);
    draw_segment(canvas, (left, bottom), (left, top), BBOX_COLOR, size, line_type);
}

fn absdiff_rgb(a: &RgbImage, b: &RgbImage) -> RgbImage {
    let bytes: Vec<u8> = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| x.abs_diff(y))
        .collect();

    // Dimensions match by construction; both are resized to the same
    // thumbnail size before reaching this point.
    RgbImage::from_raw(a.width(), a.height(), bytes)
        .unwrap_or_else(|| RgbImage::new(a.width(), a.height()))
}

fn binarize(image: &GrayImage, level: u8) -> GrayImage {
    let mut binary = image.clone();
    for pixel in binary.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > level { FOREGROUND } else { 0 };
    }
    binary
}

/// Draws one line segment, honoring the configured thickness and line type.
/// Thickness is applied by repeating the segment with offsets along its
/// minor axis.
fn draw_segment(
    canvas: &mut RgbImage,
    start: (i32, i32),
    end: (i32, i32),
    color: Rgb<u8>,
    size: u32,
    line_type: LineType,
) {
    let size = size.max(1) as i32;
    let reach = size / 2;
    let horizontal_ish = (end.0 - start.0).abs() >= (end.1 - start.1).abs();

    for offset in -reach..(size - reach) {
        let (dx, dy) = if horizontal_ish { (0, offset) } else { (offset, 0) };
        let from = (start.0 + dx, start.1 + dy);
        let to = (end.0 + dx, end.1 + dy);
        match line_type {
            LineType::Plain => draw_line_segment_mut(
                canvas,
                (from.0 as f32, from.1 as f32),
                (to.0 as f32, to.1 as f32),
                color,
            ),
            LineType::Antialiased => {
                draw_antialiased_line_segment_mut(canvas, from, to, color, interpolate)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn rgb_frame(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value; 3]))
    }

    /// A baseline/current thumbnail pair where the current one has a bright
    /// block in the middle.
    fn thumbnail_pair() -> (DynamicImage, DynamicImage) {
        let baseline = rgb_frame(5, 5, 60);
        let mut current = baseline.clone();
        for y in 1..4 {
            for x in 1..4 {
                current.put_pixel(x, y, Rgb([230, 230, 230]));
            }
        }
        (
            DynamicImage::ImageRgb8(baseline),
            DynamicImage::ImageRgb8(current),
        )
    }

    #[test]
    fn mask_marks_the_changed_region_and_leaves_corners_blank() {
        let (baseline, current) = thumbnail_pair();
        let mask = movement_mask(&baseline, &current, 100, 100);

        assert_eq!(mask.dimensions(), (100, 100));
        assert_eq!(mask.get_pixel(50, 50).0[0], FOREGROUND);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(99, 99).0[0], 0);
    }

    #[test]
    fn blank_mask_is_all_background() {
        let mask = blank_mask(20, 10);
        assert_eq!(mask.dimensions(), (20, 10));
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn bounding_rect_is_tight_around_foreground() {
        let mut mask = blank_mask(50, 50);
        for y in 10..20 {
            for x in 30..40 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let rect = bounding_rect(&mask).unwrap();
        assert_eq!((rect.left(), rect.top()), (30, 10));
        assert_eq!((rect.width(), rect.height()), (10, 10));
    }

    #[test]
    fn bounding_rect_of_blank_mask_is_none() {
        assert!(bounding_rect(&blank_mask(10, 10)).is_none());
    }

    #[test]
    fn bounding_box_overlay_touches_the_rect_border() {
        let mut mask = blank_mask(50, 50);
        for y in 10..20 {
            for x in 10..20 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let mut canvas = rgb_frame(50, 50, 0);
        draw_bounding_box(&mut canvas, &mask, 1, LineType::Plain);
        assert_eq!(canvas.get_pixel(10, 10).0, BBOX_COLOR.0);
        assert_eq!(canvas.get_pixel(19, 10).0, BBOX_COLOR.0);
        // Far away from the box nothing is drawn.
        assert_eq!(canvas.get_pixel(40, 40).0, [0, 0, 0]);
    }

    #[test]
    fn contour_overlay_draws_on_the_region_outline() {
        let mut mask = blank_mask(50, 50);
        for y in 10..20 {
            for x in 10..20 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let mut canvas = rgb_frame(50, 50, 0);
        draw_contours(&mut canvas, &mask, 1, LineType::Plain);
        let drawn = canvas.pixels().filter(|p| p.0 == CONTOUR_COLOR.0).count();
        assert!(drawn > 0);
        // Interior of the blob stays untouched.
        assert_eq!(canvas.get_pixel(15, 15).0, [0, 0, 0]);
    }
}
