//! External viewer level numbering.
//!
//! Deep Zoom style viewers number levels from a 1x1 pixel root: external level
//! `N` is the image scaled so that its longest side is `2^N`. The canonical
//! pyramid only has `levels` entries, so external levels are shifted by a fixed
//! offset and clamped into the canonical range.

use super::geometry::ImageGeometry;

/// Maximum external level for given image dimensions.
///
/// max_level = ceil(log2(max(width, height))), or 0 for a 1x1 image.
pub fn max_external_level(width: u32, height: u32) -> u32 {
    let max_dim = width.max(height);
    if max_dim <= 1 {
        return 0;
    }
    u32::BITS - (max_dim - 1).leading_zeros()
}

/// Converts between external and canonical level numbers for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelMapper {
    levels: u32,
    external_max_level: u32,
    level_offset: i64,
}

impl LevelMapper {
    pub fn new(geometry: &ImageGeometry) -> Self {
        let external_max_level = max_external_level(geometry.size_x, geometry.size_y);
        Self {
            levels: geometry.levels,
            external_max_level,
            level_offset: external_max_level as i64 - geometry.max_level() as i64,
        }
    }

    pub fn external_max_level(&self) -> u32 {
        self.external_max_level
    }

    /// Difference between external and canonical numbering.
    pub fn level_offset(&self) -> i64 {
        self.level_offset
    }

    /// Canonical level serving an external level.
    ///
    /// Levels coarser than the canonical root are served from level 0, and
    /// levels past full resolution from the finest level.
    pub fn to_canonical(&self, external_level: i64) -> u32 {
        let max_level = self.levels as i64 - 1;
        (external_level - self.level_offset).clamp(0, max_level) as u32
    }

    pub fn to_external(&self, canonical_level: u32) -> i64 {
        canonical_level as i64 + self.level_offset
    }
}
