// THEORY:
// This file is the main entry point for the `motion_watch` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the
// public API exposed to external consumers (typically an application that
// decodes video and feeds the frames in here).
//
// The primary export is the `Handler`: a per-stream movement detection
// engine that classifies each frame as showing movement or not by comparing
// a small thumbnail of it against a rolling cache of control thumbnails
// using the PSNR similarity metric. The internal building blocks live in
// `core_modules` and are exported for callers that want the metric or the
// drawing options directly, but the `Handler` is the intended interface.

pub mod core_modules;
pub mod error;
pub mod handler;

pub use core_modules::artifacts::LineType;
pub use core_modules::control::ControlCache;
pub use core_modules::psnr::psnr;
pub use error::DetectError;
pub use handler::Handler;
