//! # Pyramid Tiles
//!
//! A tile server for very large multi-resolution images.
//!
//! Viewers ask for fixed-size tiles by `(level, x, y, frame)`. This library maps
//! those addresses onto whatever pyramid the underlying image actually has,
//! reads the needed native region through a pluggable decoder backend, and
//! returns a tile of exactly the advertised size. Open decoder handles are kept
//! in a bounded, concurrency-safe cache so that files are not reopened on every
//! request.
//!
//! ## Features
//!
//! - **Canonical pyramid**: Every image is presented as a power-of-two pyramid of fixed-size tiles,
//!   whatever its native resolution levels
//! - **Deep level synthesis**: Coarse levels missing from the file are decimated from native
//!   reads, or composited from finer tiles when a single read would be too large
//! - **Multi-frame images**: Channels, z-slices and time points are addressed by one frame index
//! - **Handle cache**: LRU cache of open decoders with single-flight opens and per-handle locking
//! - **Regions and thumbnails**: Arbitrary rectangles rendered from the coarsest sufficient level
//! - **Deep Zoom**: Descriptors and tile paths for OpenSeadragon and other Deep Zoom viewers
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`pyramid`] - Canonical geometry, frame indexing and viewer level mapping
//! - [`decoder`] - Decoder backend traits, the backend registry and a PNG/JPEG backend
//! - [`source`] - Resource resolution, opened sources and the handle cache
//! - [`tile`] - Tile assembly, output encoding and the tile service
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pyramid_tiles::{
//!     create_router, DecoderHandleCache, DecoderRegistry, ResourceResolver, RouterConfig,
//!     TileService,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = DecoderHandleCache::new(Arc::new(DecoderRegistry::with_defaults()), 10);
//!     let resolver = ResourceResolver::with_default_extensions("/data/images");
//!     let service = TileService::new(resolver, Arc::new(cache));
//!
//!     let router = create_router(service, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod decoder;
pub mod error;
pub mod pyramid;
pub mod server;
pub mod source;
pub mod tile;


// Re-export commonly used types
pub use config::Config;
pub use decoder::{
    DecoderFactory, DecoderHandle, DecoderRegistry, OpenOptions, Priority, RasterDecoder,
    RawRegion, Region, SampleType,
};
pub use error::{DecodeError, TileError};
pub use pyramid::{DimensionExtents, FrameAddress, ImageGeometry, LevelMapper};
pub use server::{create_router, AppState, ErrorResponse, RouterConfig};
pub use source::{
    CacheStats, DecoderHandleCache, ImageMetadata, ImageSource, ResourceResolver,
    DEFAULT_HANDLE_CACHE_CAPACITY,
};
pub use tile::{
    OutputFormat, PixelBuffer, RegionRequest, RegionSpec, TileAssembler, TileEncoder,
    TileRequest, TileResponse, TileService, DEFAULT_JPEG_QUALITY,
};
