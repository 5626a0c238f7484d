//! Canonical tile geometry.
//!
//! Every resource is presented as a power-of-two pyramid of fixed-size tiles.
//! Level 0 is the coarsest (the whole image fits in one tile) and level
//! `levels - 1` is full resolution. Each level towards 0 halves the resolution.

use serde::Serialize;

use crate::error::TileError;

/// Side length at or below which a single-resolution image is served as one tile.
pub const SINGLE_TILE_THRESHOLD: u32 = 2048;

/// Tile side used when the backend gives no acceptable hint.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Smallest native tile size accepted as a hint.
pub const MIN_HINTED_TILE_SIZE: u32 = 128;

/// Largest native tile size accepted as a hint.
pub const MAX_HINTED_TILE_SIZE: u32 = 2048;

/// Tile geometry derived once per opened resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGeometry {
    pub size_x: u32,
    pub size_y: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub levels: u32,
    pub native_resolution_count: u32,
}

impl ImageGeometry {
    /// Derive the canonical geometry from what the backend reports.
    ///
    /// Fails with [`TileError::InvalidGeometry`] for empty images, a backend
    /// claiming zero resolutions, or a level count below 1.
    pub fn derive(
        size_x: u32,
        size_y: u32,
        native_resolution_count: u32,
        tile_hint: Option<(u32, u32)>,
    ) -> Result<Self, TileError> {
        if size_x == 0 || size_y == 0 {
            return Err(TileError::InvalidGeometry {
                reason: format!("image has zero extent ({size_x}x{size_y})"),
            });
        }
        if native_resolution_count == 0 {
            return Err(TileError::InvalidGeometry {
                reason: "backend reports no resolutions".to_string(),
            });
        }

        let (tile_width, tile_height) =
            choose_tile_size(size_x, size_y, native_resolution_count, tile_hint);

        let ratio = (size_x as f64 / tile_width as f64).max(size_y as f64 / tile_height as f64);
        let levels = ratio.log2().ceil() as i64 + 1;
        if levels < 1 {
            return Err(TileError::InvalidGeometry {
                reason: format!("derived level count {levels} is below 1"),
            });
        }

        Ok(Self {
            size_x,
            size_y,
            tile_width,
            tile_height,
            levels: levels as u32,
            native_resolution_count,
        })
    }

    /// Index of the full-resolution level.
    pub fn max_level(&self) -> u32 {
        self.levels - 1
    }

    /// Downsample factor of a level relative to full resolution.
    pub fn level_scale(&self, level: u32) -> u64 {
        1u64 << (self.max_level() - level.min(self.max_level()))
    }

    /// Pixel dimensions of a level, rounded up.
    pub fn level_dimensions(&self, level: u32) -> Option<(u32, u32)> {
        if level >= self.levels {
            return None;
        }
        let scale = self.level_scale(level);
        Some((
            (self.size_x as u64).div_ceil(scale) as u32,
            (self.size_y as u64).div_ceil(scale) as u32,
        ))
    }

    /// Number of tiles along each axis of a level.
    pub fn tile_count(&self, level: u32) -> Option<(u32, u32)> {
        if level >= self.levels {
            return None;
        }
        let scale = self.level_scale(level);
        let span_x = self.tile_width as u64 * scale;
        let span_y = self.tile_height as u64 * scale;
        Some((
            (self.size_x as u64).div_ceil(span_x) as u32,
            (self.size_y as u64).div_ceil(span_y) as u32,
        ))
    }

    /// Check that `(x, y, level)` names a tile inside the grid.
    pub fn check_address(&self, x: u32, y: u32, level: u32) -> Result<(), TileError> {
        let out_of_range = |reason: &str| TileError::AddressOutOfRange {
            level,
            x,
            y,
            reason: reason.to_string(),
        };

        if level >= self.levels {
            return Err(out_of_range("level is outside the pyramid"));
        }

        let scale = self.level_scale(level);
        if x as u64 * self.tile_width as u64 * scale >= self.size_x as u64 {
            return Err(out_of_range("x is outside layer"));
        }
        if y as u64 * self.tile_height as u64 * scale >= self.size_y as u64 {
            return Err(out_of_range("y is outside layer"));
        }
        Ok(())
    }
}

/// Pick the canonical tile size.
///
/// Small single-resolution images become one tile. Otherwise the native hint
/// is used when both axes fall in the accepted range, else [`DEFAULT_TILE_SIZE`].
pub fn choose_tile_size(
    size_x: u32,
    size_y: u32,
    native_resolution_count: u32,
    tile_hint: Option<(u32, u32)>,
) -> (u32, u32) {
    if native_resolution_count <= 1
        && size_x <= SINGLE_TILE_THRESHOLD
        && size_y <= SINGLE_TILE_THRESHOLD
    {
        return (size_x, size_y);
    }

    let acceptable = MIN_HINTED_TILE_SIZE..=MAX_HINTED_TILE_SIZE;
    match tile_hint {
        Some((w, h)) if acceptable.contains(&w) && acceptable.contains(&h) => (w, h),
        _ => (DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE),
    }
}
