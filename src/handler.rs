// THEORY:
// The `Handler` is the engine of this library. It answers one question per
// frame — "does this frame show movement?" — without doing dense
// frame-to-frame differencing. Instead it keeps a small rolling cache of
// thumbnail-sized control frames and compares each incoming frame's
// thumbnail against them with the PSNR metric.
//
// Key architectural principles:
// 1.  **Coarse baselines**: control frames are admitted on a fixed cadence,
//     not every frame, so the comparison baseline drifts slowly. A change
//     that creeps in gradually still diverges from an older baseline.
// 2.  **Recent-first comparison**: baselines are checked newest first, and
//     the first score under the threshold wins. Genuine movement diverges
//     from the newest baseline first, so this exits early in the common
//     case.
// 3.  **One instance per stream**: the handler mutates its cache in place
//     during every `detect` call and holds the derived mask/overlay until
//     the next call. Concurrent use of one instance is not supported;
//     callers with multiple streams create one handler each.
//
// Configuration is a set of plain public fields tweaked directly between
// calls; out-of-range values are clamped, never rejected. `clear()` returns
// the handler to its default configuration and drops all cached state.

use std::time::SystemTime;

use image::{DynamicImage, GrayImage, RgbImage};
use tracing::{debug, trace};

use crate::core_modules::artifacts::{self, LineType};
use crate::core_modules::control::ControlCache;
use crate::core_modules::psnr::psnr;
use crate::core_modules::thumbnail;
use crate::error::DetectError;

/// Frame-by-frame movement detection engine.
///
/// Feed it successive decoded frames with [`Handler::detect`] (or arbitrary
/// frames keyed by index with [`Handler::detect_at`]) and read back the
/// movement decision plus the optional derived artifacts ([`Handler::mask`],
/// [`Handler::output`]).
pub struct Handler {
    /// Result of the most recent `detect` call.
    pub movement_detected: bool,
    /// Whether the most recent call's result differed from the one before it.
    /// Callers can use this to spot significant state changes in a video.
    pub transition_detected: bool,
    /// The index of the next frame expected by [`Handler::detect`].
    pub next_frame_index: usize,
    /// The index at which the next control thumbnail will be admitted.
    /// Managed internally; see [`Handler::key_frame_frequency`].
    pub next_key_frame: usize,
    /// How often new control thumbnails are admitted, in frame-index units.
    /// The default of 10 means 3 key frames per second for 30 FPS video.
    /// Keep this small when masking is enabled so the mask tracks the scene.
    pub key_frame_frequency: usize,
    /// Maximum number of control thumbnails retained. Every frame is
    /// compared against all of them, so keep it short. Default 4.
    pub number_of_control_frames: usize,
    /// Scores below this threshold mean movement. Default 32.0.
    pub psnr_threshold: f64,
    /// The PSNR score from the most recent `detect` call.
    pub most_recent_psnr_score: f64,
    /// Fraction of the original width/height used for comparison
    /// thumbnails, clamped to `[0.01, 1.0]` on first use. Larger thumbnails
    /// are more precise but cost more per frame and start picking up
    /// compression artifacts as movement. Default 0.05.
    pub thumbnail_ratio: f64,
    /// Thumbnail pixel dimensions, derived once from the first frame seen
    /// and then frozen. Adjust [`Handler::thumbnail_ratio`] instead of this.
    pub thumbnail_size: Option<(u32, u32)>,
    /// The most recent frame index where movement was detected.
    pub frame_index_with_movement: usize,
    /// When `detect` last returned `true`.
    pub movement_last_detected: Option<SystemTime>,
    /// The control thumbnails the current frame is compared against.
    pub control: ControlCache,
    /// Set to `true` to get a mask showing where movement was detected.
    pub mask_enabled: bool,
    /// Binary single-channel mask, frame-sized, populated once a frame has
    /// been processed with masking enabled. Background is 0, movement 255.
    pub mask: Option<GrayImage>,
    /// Line style used for contour and bounding-box overlays.
    pub line_type: LineType,
    /// Set to `true` to draw the mask's contours onto [`Handler::output`].
    /// Implies [`Handler::mask_enabled`].
    pub contours_enabled: bool,
    /// Line width for contour drawing. Default 1.
    pub contours_size: u32,
    /// Set to `true` to draw a bounding box around detected movement onto
    /// [`Handler::output`]. Implies [`Handler::mask_enabled`].
    pub bbox_enabled: bool,
    /// Line width for the bounding box. Default 1.
    pub bbox_size: u32,
    /// Copy of the input frame with the enabled overlays drawn on it.
    pub output: Option<RgbImage>,
}

impl Default for Handler {
    fn default() -> Self {
        Self {
            movement_detected: false,
            transition_detected: false,
            next_frame_index: 0,
            next_key_frame: 0,
            key_frame_frequency: 10,
            number_of_control_frames: 4,
            psnr_threshold: 32.0,
            most_recent_psnr_score: 0.0,
            thumbnail_ratio: 0.05,
            thumbnail_size: None,
            frame_index_with_movement: 0,
            movement_last_detected: None,
            control: ControlCache::new(),
            mask_enabled: false,
            mask: None,
            line_type: LineType::Plain,
            contours_enabled: false,
            contours_size: 1,
            bbox_enabled: false,
            bbox_size: 1,
            output: None,
        }
    }
}

impl Handler {
    /// A handler with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the handler has any control thumbnails to compare against.
    pub fn is_empty(&self) -> bool {
        self.control.is_empty()
    }

    /// Resets the handler to its default configuration, dropping all control
    /// thumbnails and derived state. Returns the handler for chaining.
    pub fn clear(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    /// Detects whether there is any movement in the next sequential frame.
    ///
    /// Equivalent to [`Handler::detect_at`] with the internal
    /// [`Handler::next_frame_index`]. Use `detect_at` when frames are not
    /// strictly sequential.
    ///
    /// # Errors
    ///
    /// [`DetectError::EmptyImage`] if the frame has zero area.
    pub fn detect(&mut self, frame: &DynamicImage) -> Result<bool, DetectError> {
        self.detect_at(self.next_frame_index, frame)
    }

    /// Detects whether there is any movement in an arbitrary frame keyed by
    /// index.
    ///
    /// The caller is expected to supply `frame_index >= next_frame_index`;
    /// this is not validated, and a smaller or repeated index will silently
    /// interact with the key-frame cadence (it overwrites cache entries at
    /// the same index and recomputes [`Handler::next_key_frame`] from the
    /// supplied index).
    ///
    /// On any error the handler's state is left exactly as it was before
    /// the call.
    ///
    /// # Errors
    ///
    /// [`DetectError::EmptyImage`] if the frame has zero area, and
    /// [`DetectError::IncomparableImages`] if the frame's color type differs
    /// from the cached control thumbnails.
    pub fn detect_at(
        &mut self,
        frame_index: usize,
        frame: &DynamicImage,
    ) -> Result<bool, DetectError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(DetectError::EmptyImage);
        }

        let thumbnail_size = match self.thumbnail_size {
            Some(size) => size,
            None => thumbnail::derive_size(frame.width(), frame.height(), self.thumbnail_ratio),
        };

        let thumbnail = thumbnail::reduce(frame, thumbnail_size)?;

        // Compare against the control thumbnails, most recent first. The
        // results stay in locals until the whole loop has succeeded so that
        // a metric error leaves the handler untouched.
        let mask_wanted = self.mask_enabled || self.contours_enabled || self.bbox_enabled;
        let mut movement = false;
        let mut score = self.most_recent_psnr_score;
        let mut new_mask = None;

        for (control_index, baseline) in self.control.iter_recent_first() {
            score = psnr(baseline, &thumbnail)?;
            trace!(frame_index, control_index, score, "compared control thumbnail");

            // An exact zero is the identical-images sentinel, not a low
            // similarity score.
            if score > 0.0 && score < self.psnr_threshold {
                movement = true;
                if mask_wanted {
                    new_mask = Some(artifacts::movement_mask(
                        baseline,
                        &thumbnail,
                        frame.width(),
                        frame.height(),
                    ));
                }
                break;
            }
        }

        // Nothing below can fail; commit the call's effects.
        self.thumbnail_ratio = thumbnail::clamp_ratio(self.thumbnail_ratio);
        self.thumbnail_size = Some(thumbnail_size);
        if self.contours_enabled || self.bbox_enabled {
            // Both overlays are derived from the mask.
            self.mask_enabled = true;
        }
        self.most_recent_psnr_score = score;

        let previous_movement_detected = self.movement_detected;
        self.movement_detected = movement;
        self.transition_detected = previous_movement_detected != movement;

        if movement {
            self.frame_index_with_movement = frame_index;
            self.movement_last_detected = Some(SystemTime::now());
            debug!(frame_index, score, "movement detected");
        }

        if let Some(mask) = new_mask {
            self.mask = Some(mask);
        }

        if self.mask_enabled {
            // The caller expects a mask even without movement; reset it to a
            // blank background when there is nothing to show.
            if self.mask.is_none() || (self.transition_detected && !movement) {
                self.mask = Some(artifacts::blank_mask(frame.width(), frame.height()));
            }

            if self.contours_enabled || self.bbox_enabled {
                if let Some(mask) = &self.mask {
                    let mut canvas = frame.to_rgb8();
                    if self.contours_enabled {
                        artifacts::draw_contours(
                            &mut canvas,
                            mask,
                            self.contours_size,
                            self.line_type,
                        );
                    }
                    if self.bbox_enabled {
                        artifacts::draw_bounding_box(
                            &mut canvas,
                            mask,
                            self.bbox_size,
                            self.line_type,
                        );
                    }
                    self.output = Some(canvas);
                }
            }
        }

        // Decide whether to keep this thumbnail as a new control frame. The
        // length check fills the cache promptly at startup, before the
        // first cadence boundary is ever reached.
        if frame_index >= self.next_key_frame
            || self.control.len() < self.number_of_control_frames
        {
            self.control.insert(frame_index, thumbnail);
            self.control.evict_to(self.number_of_control_frames);
            self.next_key_frame = frame_index + self.key_frame_frequency;
            trace!(frame_index, cached = self.control.len(), "admitted control thumbnail");
        }

        self.next_frame_index = frame_index + 1;

        Ok(movement)
    }
}
