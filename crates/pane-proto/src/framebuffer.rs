//! The client-side display buffer.
//!
//! The screen is a row-major `width × height` array of `0xAARRGGBB`
//! pixels, cut into a grid of `segment_width × segment_height`
//! segments, also numbered row-major:
//!
//! ```text
//!   width = 10, segment 4x4
//!   +----+----+--+
//!   | 0  | 1  |2 |   <- edge column clipped to 2 wide
//!   +----+----+--+
//!   | 3  | 4  |5 |
//!   +----+----+--+
//!   | 6  | 7  |8 |   <- edge row clipped when height % 4 != 0
//!   +----+----+--+
//! ```
//!
//! Segment updates carry exactly the segment's clipped pixel count, in
//! row-major order within the segment.

use pane_core::SegmentId;

use crate::config::SessionConfig;

/// A pixel rectangle on the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Screen contents plus the segment grid geometry.
#[derive(Clone, Debug)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    segment_width: u32,
    segment_height: u32,
    columns: u32,
    rows: u32,
    pixels: Vec<u32>,
}

impl Framebuffer {
    /// A black screen with the geometry from `config`.
    ///
    /// `config` is assumed validated.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            segment_width: config.segment_width,
            segment_height: config.segment_height,
            columns: config.segment_columns(),
            rows: config.segment_rows(),
            pixels: vec![0; config.width as usize * config.height as usize],
        }
    }

    /// Screen width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Screen height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The whole screen, row-major.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Number of segments in the grid.
    pub fn segment_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// The area covered by `id`, or `None` if no such segment exists.
    ///
    /// [`SegmentId::WHOLE_SCREEN`] covers the entire screen.
    pub fn segment_rect(&self, id: SegmentId) -> Option<Rect> {
        if id.is_whole_screen() {
            return Some(Rect {
                x: 0,
                y: 0,
                width: self.width,
                height: self.height,
            });
        }
        let index = id.index().filter(|&i| i < self.segment_count())?;
        let column = (index % self.columns as usize) as u32;
        let row = (index / self.columns as usize) as u32;
        let x = column * self.segment_width;
        let y = row * self.segment_height;
        Some(Rect {
            x,
            y,
            width: self.segment_width.min(self.width - x),
            height: self.segment_height.min(self.height - y),
        })
    }

    /// Pixel count of `id`, or `None` if no such segment exists.
    pub fn segment_len(&self, id: SegmentId) -> Option<usize> {
        self.segment_rect(id).map(|r| r.area())
    }

    /// Copy a segment's pixels onto the screen.
    ///
    /// Returns `false` and leaves the screen untouched if the segment
    /// does not exist or `pixels` has the wrong length.
    pub fn load_segment(&mut self, id: SegmentId, pixels: &[u32]) -> bool {
        let Some(rect) = self.segment_rect(id) else {
            return false;
        };
        if pixels.len() != rect.area() {
            return false;
        }
        let stride = self.width as usize;
        let run = rect.width as usize;
        for (row, src) in pixels.chunks_exact(run).enumerate() {
            let start = (rect.y as usize + row) * stride + rect.x as usize;
            self.pixels[start..start + run].copy_from_slice(src);
        }
        true
    }

    /// Replace the whole screen. Same contract as [`load_segment`](Self::load_segment).
    pub fn load_entire_screen(&mut self, pixels: &[u32]) -> bool {
        self.load_segment(SegmentId::WHOLE_SCREEN, pixels)
    }

    /// Copy a segment's current pixels out of the screen.
    pub fn read_segment(&self, id: SegmentId) -> Option<Vec<u32>> {
        let rect = self.segment_rect(id)?;
        let stride = self.width as usize;
        let mut out = Vec::with_capacity(rect.area());
        for row in 0..rect.height as usize {
            let start = (rect.y as usize + row) * stride + rect.x as usize;
            out.extend_from_slice(&self.pixels[start..start + rect.width as usize]);
        }
        Some(out)
    }
}
