//! Tile addressing: canonical geometry, frame indexing, and viewer level mapping.

mod frames;
mod geometry;
mod levels;

pub use frames::{DimensionExtents, FrameAddress};
pub use geometry::{
    choose_tile_size, ImageGeometry, DEFAULT_TILE_SIZE, MAX_HINTED_TILE_SIZE,
    MIN_HINTED_TILE_SIZE, SINGLE_TILE_THRESHOLD,
};
pub use levels::{max_external_level, LevelMapper};
