//! Motion signal frames.

use image::{GrayImage, RgbImage};

/// Guidance signal handed to the generation pipeline.
///
/// `cue[i]` shows where motion happens at frame `i`; `mask[i]` marks the
/// region that motion affects (255) versus untouched pixels (0).
#[derive(Debug, Clone)]
pub struct MotionSignal {
    pub cue: Vec<RgbImage>,
    pub mask: Vec<GrayImage>,
}

impl MotionSignal {
    pub fn len(&self) -> usize {
        self.cue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cue.is_empty()
    }

    /// Frame width and height, if any frame exists.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.cue.first().map(|f| f.dimensions())
    }

    pub fn into_parts(self) -> (Vec<RgbImage>, Vec<GrayImage>) {
        (self.cue, self.mask)
    }
}
