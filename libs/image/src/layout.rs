//! Image layout configuration.
//!
//! The image format dictates, for each hierarchy level, a region size class
//! and a region count. The protocol treats these as read-only input: they
//! are supplied by the environment the orchestrator runs in, not computed.

use kimg_caps::SizeBits;
use thiserror::Error;

/// Environment variable holding the level descriptors.
const LEVELS_ENV: &str = "KIMG_IMAGE_LEVELS";

/// Errors that can occur when parsing an image layout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// A level descriptor was not of the form `<bits>x<count>`.
    #[error("invalid level descriptor '{0}': expected <bits>x<count>")]
    InvalidDescriptor(String),
}

/// Requirements for one hierarchy level: `count` regions of size class
/// `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDescriptor {
    /// Size class of every region at this level.
    pub size: SizeBits,

    /// Number of regions this level requires.
    pub count: u32,
}

/// The full per-level region requirements of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLayout {
    levels: Vec<LevelDescriptor>,
}

impl ImageLayout {
    /// Creates a layout from explicit level descriptors.
    pub fn new(levels: Vec<LevelDescriptor>) -> Self {
        Self { levels }
    }

    /// A layout with no levels. Degenerate but legal: it yields an image
    /// with no backing regions.
    pub fn empty() -> Self {
        Self { levels: Vec::new() }
    }

    /// Loads the layout from `KIMG_IMAGE_LEVELS`, falling back to the
    /// default layout when the variable is unset.
    pub fn from_env() -> Result<Self, LayoutError> {
        match std::env::var(LEVELS_ENV) {
            Ok(spec) => Self::parse(&spec),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Parses a comma-separated descriptor list such as `"14x1,12x4"`.
    ///
    /// An empty string parses to the empty layout.
    pub fn parse(spec: &str) -> Result<Self, LayoutError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Ok(Self::empty());
        }

        let mut levels = Vec::new();
        for part in spec.split(',') {
            let part = part.trim();
            let Some((bits, count)) = part.split_once('x') else {
                return Err(LayoutError::InvalidDescriptor(part.to_string()));
            };
            let bits: u8 = bits
                .parse()
                .map_err(|_| LayoutError::InvalidDescriptor(part.to_string()))?;
            let count: u32 = count
                .parse()
                .map_err(|_| LayoutError::InvalidDescriptor(part.to_string()))?;
            levels.push(LevelDescriptor {
                size: SizeBits::new(bits),
                count,
            });
        }

        Ok(Self { levels })
    }

    /// The level descriptors, in increasing level order.
    pub fn levels(&self) -> &[LevelDescriptor] {
        &self.levels
    }

    /// Number of hierarchy levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Total number of regions a fully populated image holds.
    pub fn total_regions(&self) -> u64 {
        self.levels.iter().map(|level| u64::from(level.count)).sum()
    }
}

impl Default for ImageLayout {
    fn default() -> Self {
        // One root-level region plus four leaf-level regions.
        Self::new(vec![
            LevelDescriptor {
                size: SizeBits::new(14),
                count: 1,
            },
            LevelDescriptor {
                size: SizeBits::new(12),
                count: 4,
            },
        ])
    }
}
