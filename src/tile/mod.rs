//! Tile service layer.
//!
//! This module turns tile addresses into encoded tiles.
//!
//! # Architecture
//!
//! The tile service sits between the HTTP layer and the opened sources:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │TileAssembler │  │  TileEncoder    │  │
//! │  │ (plan, read, │  │  (JPEG, PNG,    │  │
//! │  │  pad)        │  │   raw)          │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          DecoderHandleCache             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileService`]: Main entry point for tile requests, orchestrates the full pipeline
//! - [`TileAssembler`]: Maps a canonical tile address to native reads and builds a fixed-size tile
//! - [`PixelBuffer`]: Interleaved samples with decimation, blitting, cropping and padding
//! - [`RegionSpec`]: Client region edges, clipped and fitted to an output size
//! - [`TileEncoder`]: Encodes tiles as JPEG, PNG or raw samples
//! - [`TileRequest`], [`RegionRequest`]: Parameters for tile, region and thumbnail requests
//! - [`TileResponse`]: Response containing tile data and metadata

mod assembler;
mod encoder;
mod pixels;
mod region;
mod service;

pub use assembler::{ReadPlan, TileAssembler, DEFAULT_MAX_SKIPPED_LEVELS};
pub use encoder::{
    clamp_quality, is_valid_quality, OutputFormat, TileEncoder, DEFAULT_JPEG_QUALITY,
    MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use pixels::PixelBuffer;
pub use region::{
    fit_output, PixelRect, RegionSpec, RegionUnits, DEFAULT_THUMBNAIL_SIZE, MAX_OUTPUT_DIMENSION,
};
pub use service::{RegionRequest, TileRequest, TileResponse, TileService};
