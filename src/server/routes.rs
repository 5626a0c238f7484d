//! Router configuration for the tile server.
//!
//! This module defines the HTTP routes and applies middleware for CORS and
//! request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                                       - Health check
//! /images                                       - List images
//! /images/{image_id}/metadata                   - Image metadata
//! /images/{image_id}/metadata/internal          - Format-specific metadata
//! /images/{image_id}/associated                 - Associated image names
//! /images/{image_id}/associated/{name}          - One associated image
//! /thumbnail/{image_id}                         - Whole image fitted in a box
//! /region/{image_id}                            - Rectangle of the image
//! /tiles/{image_id}/{level}/{x}/{y}.{format}    - Tile by canonical level
//! /deepzoom/{image_id}.dzi                      - Deep Zoom descriptor
//! /deepzoom/{image_id}/info                     - Deep Zoom descriptor as JSON
//! /deepzoom/{image_id}_files/{level}/{x}_{y}.{format} - Deep Zoom tile
//! /cache                                        - Handle cache stats (GET) / clear (DELETE)
//! /cache/{image_id}                             - Close one cached handle (DELETE)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pyramid_tiles::server::routes::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(tile_service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    routing::{delete, get},
    Router,
};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    associated_image_handler, associated_list_handler, cache_clear_handler, cache_evict_handler,
    cache_stats_handler, dzi_descriptor_handler, dzi_info_handler, dzi_tile_handler,
    health_handler, images_handler, internal_metadata_handler, metadata_handler, region_handler,
    thumbnail_handler, tile_handler, AppState,
};
use crate::tile::TileService;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is 1 hour (3600 seconds)
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Image ids containing `/` must be sent with it encoded as `%2F`; every id
/// occupies one path segment.
pub fn create_router(tile_service: TileService, config: RouterConfig) -> Router {
    let app_state = AppState::with_cache_max_age(tile_service, config.cache_max_age);
    let cors = build_cors_layer(&config);

    // Uses {filename} to capture both "{y}" and "{y}.{format}"
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/images", get(images_handler))
        .route("/images/{image_id}/metadata", get(metadata_handler))
        .route(
            "/images/{image_id}/metadata/internal",
            get(internal_metadata_handler),
        )
        .route("/images/{image_id}/associated", get(associated_list_handler))
        .route(
            "/images/{image_id}/associated/{name}",
            get(associated_image_handler),
        )
        .route("/thumbnail/{image_id}", get(thumbnail_handler))
        .route("/region/{image_id}", get(region_handler))
        .route("/tiles/{image_id}/{level}/{x}/{filename}", get(tile_handler))
        .route("/deepzoom/{name}", get(dzi_descriptor_handler))
        .route("/deepzoom/{name}/info", get(dzi_info_handler))
        .route("/deepzoom/{name}/{level}/{filename}", get(dzi_tile_handler))
        .route("/cache", get(cache_stats_handler).delete(cache_clear_handler))
        .route("/cache/{image_id}", delete(cache_evict_handler))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
