//! Flat frame index <-> (channel, z-slice, time-point) mapping.
//!
//! Channels vary fastest, then z, then t.

use serde::Serialize;

/// Plane counts of a multi-dimensional resource.
///
/// A backend reporting 0 for a dimension is treated as having one plane there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionExtents {
    pub size_c: u32,
    pub size_z: u32,
    pub size_t: u32,
}

/// One plane of a multi-dimensional resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FrameAddress {
    pub c: u32,
    pub z: u32,
    pub t: u32,
}

impl FrameAddress {
    pub fn new(c: u32, z: u32, t: u32) -> Self {
        Self { c, z, t }
    }
}

impl DimensionExtents {
    pub fn new(size_c: u32, size_z: u32, size_t: u32) -> Self {
        Self {
            size_c: size_c.max(1),
            size_z: size_z.max(1),
            size_t: size_t.max(1),
        }
    }

    /// A plain 2D image.
    pub fn single() -> Self {
        Self::new(1, 1, 1)
    }

    /// Total number of addressable planes.
    pub fn frame_count(&self) -> u64 {
        self.size_c as u64 * self.size_z as u64 * self.size_t as u64
    }

    /// Resolve a flat frame index.
    ///
    /// Indices past the last frame wrap around rather than failing.
    pub fn unflatten(&self, frame: u64) -> FrameAddress {
        let size_c = self.size_c as u64;
        let size_z = self.size_z as u64;
        let size_t = self.size_t as u64;
        FrameAddress {
            c: (frame % size_c) as u32,
            z: ((frame / size_c) % size_z) as u32,
            t: ((frame / size_c / size_z) % size_t) as u32,
        }
    }

    pub fn flatten(&self, address: FrameAddress) -> u64 {
        let plane = address.z as u64 + self.size_z as u64 * address.t as u64;
        address.c as u64 + self.size_c as u64 * plane
    }

    /// All planes in flat index order.
    pub fn frames(&self) -> impl Iterator<Item = FrameAddress> + '_ {
        (0..self.frame_count()).map(move |frame| self.unflatten(frame))
    }
}

impl Default for DimensionExtents {
    fn default() -> Self {
        Self::single()
    }
}
