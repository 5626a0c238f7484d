//! Canonical tile assembly.
//!
//! Maps a canonical `(x, y, level)` onto a window of one native resolution
//! level, decodes it, decimates it to the canonical scale and pads it to the
//! full tile size.
//!
//! # Deep levels
//!
//! When the native pyramid is shallower than the canonical one, coarse canonical
//! levels are served from the coarsest native level with a decimation factor
//! (`scale`). Reading a `tile * scale` window grows quadratically, so once
//! `scale` reaches `2^max_skipped_levels` the tile is instead composited from
//! its four children at the next finer canonical level and decimated by 2.
//! Children are assembled the same way, so recursion bottoms out at the first
//! level that can be read directly.
//!
//! Compositing uses nearest-neighbor decimation, the same filter as the direct
//! path, so both produce identical pixels.

use tracing::trace;

use super::pixels::PixelBuffer;
use super::region::PixelRect;
use crate::decoder::Region;
use crate::error::TileError;
use crate::pyramid::FrameAddress;
use crate::source::ImageSource;

/// Default bound on skipped native levels before compositing (`scale >= 8`).
pub const DEFAULT_MAX_SKIPPED_LEVELS: u32 = 3;

/// Native read needed for one canonical tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPlan {
    /// Native level to decode
    pub series_level: u32,
    /// Decimation factor applied after decoding
    pub scale: u64,
    /// Window in native pixels, empty if the tile lies beyond the image
    pub region: Region,
}

/// Builds fixed-size tiles from an [`ImageSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileAssembler {
    max_skipped_levels: u32,
}

impl Default for TileAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SKIPPED_LEVELS)
    }
}

impl TileAssembler {
    pub fn new(max_skipped_levels: u32) -> Self {
        Self { max_skipped_levels }
    }

    pub fn max_skipped_levels(&self) -> u32 {
        self.max_skipped_levels
    }

    /// Resolve the native level and window for a canonical tile.
    ///
    /// Does not validate the address.
    pub fn plan(&self, source: &ImageSource, x: u32, y: u32, level: u32) -> ReadPlan {
        let geometry = source.geometry();
        let coarsest_native = geometry.native_resolution_count - 1;

        let mut series_level = geometry.max_level() - level.min(geometry.max_level());
        let mut scale = 1u64;
        while series_level > coarsest_native {
            series_level -= 1;
            scale *= 2;
        }

        let (level_width, level_height) = source.native_level_size(series_level);
        let span_x = geometry.tile_width as u64 * scale;
        let span_y = geometry.tile_height as u64 * scale;
        let offset_x = x as u64 * span_x;
        let offset_y = y as u64 * span_y;
        let width = span_x.min((level_width as u64).saturating_sub(offset_x));
        let height = span_y.min((level_height as u64).saturating_sub(offset_y));

        ReadPlan {
            series_level,
            scale,
            region: Region::new(
                offset_x.min(level_width as u64) as u32,
                offset_y.min(level_height as u64) as u32,
                width as u32,
                height as u32,
            ),
        }
    }

    /// Whether a plan is served by compositing finer tiles.
    pub fn composites(&self, plan: &ReadPlan) -> bool {
        let bound = 1u64
            .checked_shl(self.max_skipped_levels)
            .unwrap_or(u64::MAX);
        plan.scale > 1 && plan.scale >= bound
    }

    /// Assemble the tile at `(x, y, level)` for a flat frame index.
    ///
    /// The result is always exactly `tile_width x tile_height`.
    pub fn get_tile(
        &self,
        source: &ImageSource,
        x: u32,
        y: u32,
        level: u32,
        frame: u64,
    ) -> Result<PixelBuffer, TileError> {
        source.geometry().check_address(x, y, level)?;
        let plane = source.extents().unflatten(frame);
        self.render(source, x, y, level, plane)
    }

    /// Stitch the `width x height` window at `(left, top)` of canonical `level`.
    ///
    /// The window must start inside the level; whatever extends past the image
    /// is padding.
    #[allow(clippy::too_many_arguments)]
    pub fn get_window(
        &self,
        source: &ImageSource,
        level: u32,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
        frame: u64,
    ) -> Result<PixelBuffer, TileError> {
        let geometry = source.geometry();
        let (tile_width, tile_height) = (geometry.tile_width, geometry.tile_height);
        let (first_x, first_y) = (left / tile_width, top / tile_height);
        geometry.check_address(first_x, first_y, level)?;
        let (tiles_x, tiles_y) = geometry.tile_count(level).unwrap_or((1, 1));

        let mut canvas =
            PixelBuffer::filled(width, height, source.band_count(), source.sample_type());
        if width == 0 || height == 0 {
            return Ok(canvas);
        }
        let right = left as u64 + width as u64;
        let bottom = top as u64 + height as u64;
        let last_x = ((right - 1) / tile_width as u64).min(tiles_x as u64 - 1) as u32;
        let last_y = ((bottom - 1) / tile_height as u64).min(tiles_y as u64 - 1) as u32;

        for tile_y in first_y..=last_y {
            for tile_x in first_x..=last_x {
                let tile = self.get_tile(source, tile_x, tile_y, level, frame)?;
                let origin_x = tile_x as u64 * tile_width as u64;
                let origin_y = tile_y as u64 * tile_height as u64;
                let start_x = origin_x.max(left as u64);
                let start_y = origin_y.max(top as u64);
                let part = tile.crop(
                    (start_x - origin_x) as u32,
                    (start_y - origin_y) as u32,
                    width,
                    height,
                );
                canvas.blit(
                    &part,
                    (start_x - left as u64) as u32,
                    (start_y - top as u64) as u32,
                );
            }
        }

        Ok(canvas)
    }

    /// Render a full-resolution rectangle at exactly `out_width x out_height`.
    ///
    /// Tiles come from the coarsest canonical level that still has at least
    /// the output resolution; the stitched window is then resampled.
    pub fn get_region(
        &self,
        source: &ImageSource,
        rect: PixelRect,
        out_width: u32,
        out_height: u32,
        frame: u64,
    ) -> Result<PixelBuffer, TileError> {
        let geometry = source.geometry();
        let max_level = geometry.max_level();

        let mut skipped = 0;
        let mut scale = 1u64;
        while skipped < max_level
            && scale * 2 * out_width as u64 <= rect.width as u64
            && scale * 2 * out_height as u64 <= rect.height as u64
        {
            scale *= 2;
            skipped += 1;
        }
        let level = max_level - skipped;

        let left = rect.left as u64 / scale;
        let top = rect.top as u64 / scale;
        let right = (rect.left as u64 + rect.width as u64).div_ceil(scale);
        let bottom = (rect.top as u64 + rect.height as u64).div_ceil(scale);
        trace!(?rect, level, scale, out_width, out_height, "Rendering region");

        let window = self.get_window(
            source,
            level,
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
            frame,
        )?;
        Ok(window.resize(out_width, out_height))
    }

    /// Read the coarsest tile that needs no compositing.
    ///
    /// A source failing this can never produce a tile and should not be cached.
    pub fn check_readable(&self, source: &ImageSource) -> Result<(), TileError> {
        let geometry = source.geometry();
        let level = (0..geometry.levels)
            .find(|&level| !self.composites(&self.plan(source, 0, 0, level)))
            .unwrap_or(geometry.max_level());
        self.render(source, 0, 0, level, FrameAddress::default())
            .map(|_| ())
    }

    fn render(
        &self,
        source: &ImageSource,
        x: u32,
        y: u32,
        level: u32,
        plane: FrameAddress,
    ) -> Result<PixelBuffer, TileError> {
        let geometry = source.geometry();
        let plan = self.plan(source, x, y, level);

        let tile = if self.composites(&plan) {
            self.composite(source, x, y, level, plane)?
        } else if plan.region.is_empty() {
            PixelBuffer::empty(source.band_count(), source.sample_type())
        } else {
            trace!(
                x,
                y,
                level,
                series_level = plan.series_level,
                scale = plan.scale,
                "Reading native region"
            );
            let raw = source.read_region(plan.series_level, plan.region, plane)?;
            raw.decimate(plan.scale as u32)
        };

        Ok(tile.pad_to(geometry.tile_width, geometry.tile_height))
    }

    fn composite(
        &self,
        source: &ImageSource,
        x: u32,
        y: u32,
        level: u32,
        plane: FrameAddress,
    ) -> Result<PixelBuffer, TileError> {
        let geometry = source.geometry();
        let (tile_width, tile_height) = (geometry.tile_width, geometry.tile_height);
        let finer = level + 1;
        let (tiles_x, tiles_y) = geometry.tile_count(finer).unwrap_or((0, 0));

        let mut mosaic = PixelBuffer::filled(
            tile_width * 2,
            tile_height * 2,
            source.band_count(),
            source.sample_type(),
        );
        for dy in 0..2 {
            for dx in 0..2 {
                let (child_x, child_y) = (x * 2 + dx, y * 2 + dy);
                if child_x >= tiles_x || child_y >= tiles_y {
                    continue;
                }
                let child = self.render(source, child_x, child_y, finer, plane)?;
                mosaic.blit(&child, dx * tile_width, dy * tile_height);
            }
        }

        Ok(mosaic.decimate(2))
    }
}
