//! Session configuration and validation.

use std::error::Error;
use std::fmt;

use pane_pool::{PoolConfig, PoolConfigError};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SessionConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Screen width or height is zero.
    EmptyScreen,
    /// Segment width or height is zero.
    EmptySegment,
    /// A segment dimension exceeds the matching screen dimension.
    SegmentLargerThanScreen {
        /// Configured segment size, `(width, height)`.
        segment: (u32, u32),
        /// Configured screen size, `(width, height)`.
        screen: (u32, u32),
    },
    /// The segment grid has more cells than a segment id can address.
    TooManySegments {
        /// Number of segments the grid would have.
        count: usize,
    },
    /// The pixel-buffer pool config is invalid.
    Pool(PoolConfigError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyScreen => write!(f, "screen width and height must be non-zero"),
            Self::EmptySegment => write!(f, "segment width and height must be non-zero"),
            Self::SegmentLargerThanScreen { segment, screen } => write!(
                f,
                "segment {}x{} does not fit on a {}x{} screen",
                segment.0, segment.1, screen.0, screen.1
            ),
            Self::TooManySegments { count } => {
                write!(f, "{count} segments exceed the segment id range")
            }
            Self::Pool(e) => write!(f, "pixel pool: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PoolConfigError> for ConfigError {
    fn from(e: PoolConfigError) -> Self {
        Self::Pool(e)
    }
}

// ── SessionConfig ──────────────────────────────────────────────────

/// Configuration for one client session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Screen width in pixels.
    pub width: u32,
    /// Screen height in pixels.
    pub height: u32,
    /// Width of one screen segment. Edge segments may be narrower.
    pub segment_width: u32,
    /// Height of one screen segment. Edge segments may be shorter.
    pub segment_height: u32,
    /// Whether clipboard contents are exchanged with the peer. Default: `false`.
    pub synchronize_clipboard: bool,
    /// Config for the pool of segment pixel buffers.
    pub pool: PoolConfig,
}

impl SessionConfig {
    /// A config for a `width × height` screen cut into
    /// `segment_width × segment_height` segments.
    pub fn new(width: u32, height: u32, segment_width: u32, segment_height: u32) -> Self {
        Self {
            width,
            height,
            segment_width,
            segment_height,
            synchronize_clipboard: false,
            pool: PoolConfig::named("pixels"),
        }
    }

    /// Check all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyScreen);
        }
        if self.segment_width == 0 || self.segment_height == 0 {
            return Err(ConfigError::EmptySegment);
        }
        if self.segment_width > self.width || self.segment_height > self.height {
            return Err(ConfigError::SegmentLargerThanScreen {
                segment: (self.segment_width, self.segment_height),
                screen: (self.width, self.height),
            });
        }
        let count = self.segment_columns() as usize * self.segment_rows() as usize;
        if count > i32::MAX as usize {
            return Err(ConfigError::TooManySegments { count });
        }
        self.pool.validate()?;
        Ok(())
    }

    /// Number of segment columns, counting a clipped edge column.
    pub fn segment_columns(&self) -> u32 {
        self.width.div_ceil(self.segment_width)
    }

    /// Number of segment rows, counting a clipped edge row.
    pub fn segment_rows(&self) -> u32 {
        self.height.div_ceil(self.segment_height)
    }
}
