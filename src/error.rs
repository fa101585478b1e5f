use image::ColorType;
use thiserror::Error;

/// Errors raised by the detection engine and the PSNR metric.
///
/// There are deliberately only two kinds: structurally invalid images fail
/// fast, everything else (threshold tuning, out-of-order frame indices) is
/// accepted as-is and produces deterministic behavior instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectError {
    /// The supplied image has zero width or zero height.
    #[error("cannot operate on an empty image")]
    EmptyImage,

    /// Two images were compared that differ in color type or dimensions.
    #[error(
        "images cannot be compared: {src_width}x{src_height} {src_color:?} \
         vs {dst_width}x{dst_height} {dst_color:?}"
    )]
    IncomparableImages {
        src_width: u32,
        src_height: u32,
        src_color: ColorType,
        dst_width: u32,
        dst_height: u32,
        dst_color: ColorType,
    },
}
