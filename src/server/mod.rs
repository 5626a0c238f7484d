//! HTTP server layer.
//!
//! This module provides the HTTP API for serving tiles, regions, thumbnails,
//! metadata and Deep Zoom descriptors.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │         GET /tiles/{image_id}/{level}/{x}/{y}.jpg               │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    dzi      │  │        routes           │  │
//! │  │ (requests)  │  │ (Deep Zoom) │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod dzi;
pub mod handlers;
pub mod routes;

pub use dzi::{generate_dzi_xml, parse_dzi_tile_coords, DeepZoomInfo};
pub use handlers::{
    associated_image_handler, associated_list_handler, cache_clear_handler, cache_evict_handler,
    cache_stats_handler, dzi_descriptor_handler, dzi_info_handler, dzi_tile_handler,
    health_handler, images_handler, internal_metadata_handler, metadata_handler, region_handler,
    thumbnail_handler, tile_handler, AppState, CacheClearResponse, CacheEvictResponse,
    DeepZoomTilePathParams, EncodingQueryParams, ErrorResponse, HealthResponse, ImagesResponse,
    RegionQueryParams, ThumbnailQueryParams, TilePathParams, TileQueryParams,
};
pub use routes::{create_router, RouterConfig};
