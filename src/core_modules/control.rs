// THEORY:
// The control cache is the engine's memory: a small, bounded set of past
// thumbnails that every new frame is compared against. Keeping several
// baselines of different ages (instead of only the previous frame) means a
// slow, creeping change still diverges from an *older* baseline even when
// each frame-to-frame step is below the threshold.
//
// Entries are kept in insertion order in a deque. For a conforming caller
// (monotonically increasing frame indices) insertion order and index order
// coincide, so no sorted map is needed; eviction still removes the
// smallest-index entry explicitly so the oldest-first invariant holds even
// when a caller replays indices out of order.

use std::collections::VecDeque;

use image::DynamicImage;

/// A bounded, index-keyed collection of control thumbnails. Stored
/// thumbnails are read-only snapshots; the cache never mutates them.
#[derive(Clone, Default)]
pub struct ControlCache {
    frames: VecDeque<(usize, DynamicImage)>,
}

impl ControlCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Inserts a thumbnail keyed by frame index. An entry with the identical
    /// index is overwritten in place; otherwise the entry is appended as the
    /// most recent.
    pub fn insert(&mut self, frame_index: usize, thumbnail: DynamicImage) {
        if let Some(slot) = self
            .frames
            .iter_mut()
            .find(|(index, _)| *index == frame_index)
        {
            slot.1 = thumbnail;
        } else {
            self.frames.push_back((frame_index, thumbnail));
        }
    }

    /// Removes smallest-index entries until the cache holds at most
    /// `capacity` thumbnails.
    pub fn evict_to(&mut self, capacity: usize) {
        while self.frames.len() > capacity {
            let oldest = self
                .frames
                .iter()
                .enumerate()
                .min_by_key(|(_, (index, _))| *index)
                .map(|(position, _)| position);
            match oldest {
                Some(position) => {
                    self.frames.remove(position);
                }
                None => break,
            }
        }
    }

    /// Iterates entries from most-recently-inserted to least-recently
    /// inserted — the comparison order used by the detection loop.
    pub fn iter_recent_first<'a>(&'a self) -> impl Iterator<Item = (usize, &'a DynamicImage)> + 'a {
        self.frames.iter().rev().map(|(index, thumb)| (*index, thumb))
    }

    /// Frame indices currently held, oldest insertion first.
    pub fn indices(&self) -> Vec<usize> {
        self.frames.iter().map(|(index, _)| *index).collect()
    }
}
