//! HTTP request handlers for the tile API.
//!
//! This module contains the Axum handlers for tiles, metadata, Deep Zoom
//! descriptors, the handle cache and health checks.
//!
//! # Endpoints
//!
//! - `GET /tiles/{image_id}/{level}/{x}/{y}.{format}` - Serve a tile by canonical level
//! - `GET /images` - List servable images
//! - `GET /images/{image_id}/metadata` - Image geometry and extents
//! - `GET /images/{image_id}/metadata/internal` - Format-specific metadata
//! - `GET /images/{image_id}/associated` - Associated image names
//! - `GET /images/{image_id}/associated/{name}` - One associated image
//! - `GET /thumbnail/{image_id}` - Whole image fitted inside a bounding box
//! - `GET /region/{image_id}` - Rectangle of the image, optionally downscaled
//! - `GET /deepzoom/{image_id}.dzi` - Deep Zoom descriptor
//! - `GET /deepzoom/{image_id}/info` - Deep Zoom descriptor as JSON
//! - `GET /deepzoom/{image_id}_files/{level}/{x}_{y}.{format}` - Deep Zoom tile
//! - `GET /cache`, `DELETE /cache`, `DELETE /cache/{image_id}` - Handle cache
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::TileError;
use crate::source::{CacheStats, ImageMetadata};
use crate::tile::{
    OutputFormat, RegionRequest, RegionSpec, RegionUnits, TileRequest, TileResponse, TileService,
    DEFAULT_THUMBNAIL_SIZE,
};

use super::dzi::{descriptor_image_id, files_image_id, parse_dzi_tile_coords, DeepZoomInfo};

/// Header echoing the JPEG quality a tile was encoded with.
const TILE_QUALITY_HEADER: HeaderName = HeaderName::from_static("x-tile-quality");

/// Cache-Control max-age for associated images, which never change.
const ASSOCIATED_IMAGE_MAX_AGE: u32 = 86400;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile service.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// The tile service for processing requests
    pub tile_service: Arc<TileService>,

    /// Cache-Control max-age in seconds for tiles and descriptors
    pub cache_max_age: u32,
}

impl AppState {
    /// Create a new application state with the given tile service.
    pub fn new(tile_service: TileService) -> Self {
        Self::with_cache_max_age(tile_service, 3600)
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(tile_service: TileService, cache_max_age: u32) -> Self {
        Self {
            tile_service: Arc::new(tile_service),
            cache_max_age,
        }
    }

    fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age)
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from: `/tiles/{image_id}/{level}/{x}/{filename}`
/// where filename is `{y}` or `{y}.{jpg|jpeg|png|raw}`
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    /// Image identifier, with `/` encoded as `%2F` for nested files
    pub image_id: String,

    /// Canonical pyramid level (0 = coarsest)
    pub level: u32,

    /// Tile X coordinate (0-indexed from left)
    pub x: u32,

    /// Tile Y coordinate with optional format extension (e.g., "0" or "0.png")
    pub filename: String,
}

impl TilePathParams {
    /// Parse the Y coordinate and the requested format from the filename.
    pub fn y_and_format(&self) -> Result<(u32, Option<OutputFormat>), TileError> {
        let (y, format) = match self.filename.split_once('.') {
            Some((y, ext)) => {
                let format = OutputFormat::from_extension(ext).ok_or_else(|| {
                    TileError::UnsupportedResource {
                        reason: format!("unknown tile format '{ext}'"),
                    }
                })?;
                (y, Some(format))
            }
            None => (self.filename.as_str(), None),
        };

        let y = y.parse().map_err(|_| TileError::AddressOutOfRange {
            level: self.level,
            x: self.x,
            y: 0,
            reason: format!("invalid tile row '{y}'"),
        })?;
        Ok((y, format))
    }
}

/// Path parameters for Deep Zoom tile requests.
///
/// Extracted from: `/deepzoom/{name}/{level}/{filename}` where name is
/// `{image_id}_files` and filename is `{x}_{y}.{format}`.
#[derive(Debug, Deserialize)]
pub struct DeepZoomTilePathParams {
    pub name: String,
    pub level: u32,
    pub filename: String,
}

/// Query parameters for tile requests.
#[derive(Debug, Default, Deserialize)]
pub struct TileQueryParams {
    /// JPEG quality (1-100), the server default when absent
    #[serde(default)]
    pub quality: Option<u8>,

    /// Flat frame index over (c, z, t)
    #[serde(default)]
    pub frame: u64,

    /// JSON decode configuration; styled tiles use a private handle
    #[serde(default)]
    pub style: Option<String>,
}

impl TileQueryParams {
    /// Parse the style parameter. An empty value means no style.
    pub fn style(&self) -> Result<Option<serde_json::Value>, TileError> {
        parse_style(self.style.as_deref())
    }

    fn apply(&self, mut request: TileRequest) -> Result<TileRequest, TileError> {
        request = request.with_frame(self.frame);
        if let Some(quality) = self.quality {
            request = request.with_quality(quality);
        }
        if let Some(style) = self.style()? {
            request = request.with_style(style);
        }
        Ok(request)
    }
}

/// Query parameters naming an output encoding.
#[derive(Debug, Default, Deserialize)]
pub struct EncodingQueryParams {
    /// `JPEG`, `PNG` or `raw` in any case, or a file extension
    #[serde(default, alias = "format")]
    pub encoding: Option<String>,

    #[serde(default)]
    pub quality: Option<u8>,
}

impl EncodingQueryParams {
    pub fn format(&self) -> Result<Option<OutputFormat>, TileError> {
        parse_encoding(self.encoding.as_deref())
    }
}

/// Query parameters for thumbnails.
#[derive(Debug, Default, Deserialize)]
pub struct ThumbnailQueryParams {
    /// Maximum width, default 256
    #[serde(default)]
    pub width: Option<u32>,

    /// Maximum height, default 256
    #[serde(default)]
    pub height: Option<u32>,

    #[serde(default)]
    pub encoding: Option<String>,

    #[serde(default)]
    pub quality: Option<u8>,

    #[serde(default)]
    pub frame: u64,

    #[serde(default)]
    pub style: Option<String>,
}

/// Query parameters for regions.
///
/// `left` and `top` are required, plus `right` or `width` and `bottom` or
/// `height`. Edges are in `units`, full-resolution pixels by default.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionQueryParams {
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,

    /// `base_pixels`, `fraction` or `mm`
    pub units: Option<String>,

    pub max_width: Option<u32>,
    pub max_height: Option<u32>,

    pub encoding: Option<String>,
    pub quality: Option<u8>,

    #[serde(default)]
    pub frame: u64,

    pub style: Option<String>,
}

impl RegionQueryParams {
    /// The region described by the edge parameters.
    pub fn region(&self) -> Result<RegionSpec, TileError> {
        let required = |value: Option<f64>, name: &str| {
            value.ok_or_else(|| TileError::InvalidRegion {
                reason: format!("{name} is required"),
            })
        };
        let units = match self.units.as_deref() {
            Some(units) => units.parse::<RegionUnits>()?,
            None => RegionUnits::default(),
        };

        Ok(RegionSpec {
            left: required(self.left, "left")?,
            top: required(self.top, "top")?,
            right: self.right,
            bottom: self.bottom,
            width: self.width,
            height: self.height,
            units,
        })
    }
}

/// Parse a JSON style. An empty value means no style.
fn parse_style(style: Option<&str>) -> Result<Option<serde_json::Value>, TileError> {
    match style.map(str::trim) {
        None | Some("") => Ok(None),
        Some(style) => serde_json::from_str(style)
            .map(Some)
            .map_err(|e| TileError::InvalidStyle {
                message: e.to_string(),
            }),
    }
}

fn parse_encoding(encoding: Option<&str>) -> Result<Option<OutputFormat>, TileError> {
    encoding
        .map(|name| {
            OutputFormat::from_extension(name).ok_or_else(|| TileError::UnsupportedResource {
                reason: format!("unknown encoding '{name}'"),
            })
        })
        .transpose()
}

/// Apply the options shared by every rendered image request.
fn apply_output(
    mut request: RegionRequest,
    encoding: Option<&str>,
    quality: Option<u8>,
    frame: u64,
    style: Option<&str>,
) -> Result<RegionRequest, TileError> {
    request = request.with_frame(frame);
    if let Some(format) = parse_encoding(encoding)? {
        request = request.with_format(format);
    }
    if let Some(quality) = quality {
        request = request.with_quality(quality);
    }
    if let Some(style) = parse_style(style)? {
        request = request.with_style(style);
    }
    Ok(request)
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_quality")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: status.as_u16(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Response from the image list endpoint.
#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    /// Image identifiers relative to the image root
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CacheClearResponse {
    /// Number of handles closed
    pub cleared: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheEvictResponse {
    pub image_id: String,
    /// Whether a cached handle was closed
    pub closed: bool,
}

// =============================================================================
// Error Mapping
// =============================================================================

impl TileError {
    /// HTTP status and error type identifier for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            TileError::ResourceNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            TileError::AddressOutOfRange { .. } => {
                (StatusCode::NOT_FOUND, "address_out_of_range")
            }
            TileError::UnsupportedResource { .. } => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_resource")
            }
            TileError::InvalidRegion { .. } => (StatusCode::BAD_REQUEST, "invalid_region"),
            TileError::InvalidQuality { .. } => (StatusCode::BAD_REQUEST, "invalid_quality"),
            TileError::InvalidStyle { .. } => (StatusCode::BAD_REQUEST, "invalid_style"),
            // Resources that cannot be opened or tiled are reported as bad requests
            TileError::OpenFailure { .. } => (StatusCode::BAD_REQUEST, "open_failure"),
            TileError::InvalidGeometry { .. } => (StatusCode::BAD_REQUEST, "invalid_geometry"),
            TileError::ReadFailure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "read_failure"),
            TileError::EncodeError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
            TileError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Convert TileError to HTTP response.
///
/// This implementation logs errors appropriately based on their severity:
/// - 404 errors are logged at DEBUG level (common and expected)
/// - other 4xx errors are logged at WARN level (client errors)
/// - 5xx errors are logged at ERROR level (server errors)
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

fn image_http_response(response: TileResponse, cache_control: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, response.format.content_type().to_string()),
            (header::CACHE_CONTROL, cache_control),
            (TILE_QUALITY_HEADER, response.quality.to_string()),
        ],
        response.data,
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /tiles/{image_id}/{level}/{x}/{y}.{format}`
///
/// # Path Parameters
///
/// - `image_id`: Image identifier (URL-encoded if it contains `/`)
/// - `level`: Canonical pyramid level (0 = coarsest)
/// - `x`: Tile X coordinate
/// - `y`: Tile Y coordinate, optionally followed by `.jpg`, `.jpeg`, `.png` or `.raw`
///
/// # Query Parameters
///
/// - `quality`: JPEG quality 1-100
/// - `frame`: Flat frame index (default: 0)
/// - `style`: JSON decode configuration
///
/// # Response
///
/// - `200 OK`: Encoded tile
/// - `400 Bad Request`: Invalid quality or style, or an image that cannot be tiled
/// - `404 Not Found`: Unknown image or tile address outside the grid
/// - `415 Unsupported Media Type`: Extension not allowed or unknown tile format
/// - `500 Internal Server Error`: Decode or encode failure
pub async fn tile_handler(
    State(state): State<AppState>,
    Path(params): Path<TilePathParams>,
    Query(query): Query<TileQueryParams>,
) -> Result<Response, TileError> {
    let (y, format) = params.y_and_format()?;

    let mut request = TileRequest::new(&params.image_id, params.level, params.x, y);
    if let Some(format) = format {
        request = request.with_format(format);
    }
    let request = query.apply(request)?;

    let response = state.tile_service.get_tile(request).await?;
    Ok(image_http_response(response, state.cache_control()))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle image list requests.
///
/// # Endpoint
///
/// `GET /images`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "images": ["case1/slide.svs", "photo.png"]
/// }
/// ```
pub async fn images_handler(State(state): State<AppState>) -> Result<Json<ImagesResponse>, TileError> {
    let images = state.tile_service.list_images().await?;
    Ok(Json(ImagesResponse { images }))
}

/// Handle image metadata requests.
///
/// # Endpoint
///
/// `GET /images/{image_id}/metadata`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "sizeX": 46920,
///   "sizeY": 33600,
///   "tileWidth": 256,
///   "tileHeight": 256,
///   "levels": 9,
///   "nativeResolutionCount": 4,
///   "externalMaxLevel": 16,
///   "sizeC": 1,
///   "sizeZ": 1,
///   "sizeT": 1,
///   "bandCount": 3,
///   "dtype": "uint8"
/// }
/// ```
pub async fn metadata_handler(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<Json<ImageMetadata>, TileError> {
    let metadata = state.tile_service.get_metadata(&image_id).await?;
    Ok(Json(metadata))
}

/// Handle DZI descriptor requests - returns XML descriptor for Deep Zoom viewers.
///
/// # Endpoint
///
/// `GET /deepzoom/{image_id}.dzi?format=png`
///
/// `format` picks the tile format the descriptor advertises, the server
/// default when absent.
///
/// # Example Response
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <Image xmlns="http://schemas.microsoft.com/deepzoom/2008"
///        TileSize="256"
///        Overlap="0"
///        Format="jpg">
///   <Size Width="46920" Height="33600" />
/// </Image>
/// ```
pub async fn dzi_descriptor_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<EncodingQueryParams>,
) -> Result<Response, TileError> {
    let image_id = descriptor_image_id(&name).ok_or_else(|| TileError::ResourceNotFound {
        image_id: name.clone(),
    })?;

    let format = query.format()?.unwrap_or(state.tile_service.default_format());
    let metadata = state.tile_service.get_metadata(image_id).await?;
    let xml = DeepZoomInfo::from_metadata(&metadata, format).to_xml(format);

    Ok((
        [
            (header::CONTENT_TYPE, "application/xml".to_string()),
            (header::CACHE_CONTROL, state.cache_control()),
        ],
        xml,
    )
        .into_response())
}

/// Handle DZI info requests - the descriptor plus level numbering as JSON.
///
/// # Endpoint
///
/// `GET /deepzoom/{image_id}/info?format=png`
pub async fn dzi_info_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<EncodingQueryParams>,
) -> Result<Json<DeepZoomInfo>, TileError> {
    let image_id = descriptor_image_id(&name).unwrap_or(&name);
    let format = query.format()?.unwrap_or(state.tile_service.default_format());
    let metadata = state.tile_service.get_metadata(image_id).await?;
    Ok(Json(DeepZoomInfo::from_metadata(&metadata, format)))
}

/// Handle DZI tile requests.
///
/// # Endpoint
///
/// `GET /deepzoom/{image_id}_files/{level}/{x}_{y}.{format}`
///
/// `level` is a Deep Zoom level. Levels outside the canonical pyramid are
/// served from its coarsest or finest level.
pub async fn dzi_tile_handler(
    State(state): State<AppState>,
    Path(params): Path<DeepZoomTilePathParams>,
    Query(query): Query<TileQueryParams>,
) -> Result<Response, TileError> {
    let image_id = files_image_id(&params.name).ok_or_else(|| TileError::ResourceNotFound {
        image_id: params.name.clone(),
    })?;
    let (x, y, format) =
        parse_dzi_tile_coords(&params.filename).ok_or_else(|| TileError::AddressOutOfRange {
            level: params.level,
            x: 0,
            y: 0,
            reason: format!("invalid tile name '{}'", params.filename),
        })?;

    let mut request = TileRequest::new(image_id, params.level, x, y);
    if let Some(format) = format {
        request = request.with_format(format);
    }
    let request = query.apply(request)?;

    let response = state.tile_service.get_viewer_tile(request).await?;
    Ok(image_http_response(response, state.cache_control()))
}

/// Handle internal metadata requests.
///
/// # Endpoint
///
/// `GET /images/{image_id}/metadata/internal`
///
/// # Response
///
/// `200 OK` with the backend's format-specific metadata, `{}` if it has none.
pub async fn internal_metadata_handler(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<Json<serde_json::Map<String, serde_json::Value>>, TileError> {
    let metadata = state.tile_service.get_internal_metadata(&image_id).await?;
    Ok(Json(metadata))
}

/// List associated images.
///
/// # Endpoint
///
/// `GET /images/{image_id}/associated`
///
/// # Response
///
/// `200 OK` with a JSON list of names, e.g. `["label", "macro"]`.
pub async fn associated_list_handler(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<Json<Vec<String>>, TileError> {
    let names = state.tile_service.list_associated_images(&image_id).await?;
    Ok(Json(names))
}

/// Serve one associated image.
///
/// # Endpoint
///
/// `GET /images/{image_id}/associated/{name}?encoding=PNG`
///
/// # Response
///
/// - `200 OK`: Encoded image, cacheable for a day
/// - `404 Not Found`: Unknown image or no associated image with that name
pub async fn associated_image_handler(
    State(state): State<AppState>,
    Path((image_id, name)): Path<(String, String)>,
    Query(query): Query<EncodingQueryParams>,
) -> Result<Response, TileError> {
    let response = state
        .tile_service
        .get_associated_image(&image_id, &name, query.format()?, query.quality)
        .await?;
    let cache_control = format!("public, max-age={ASSOCIATED_IMAGE_MAX_AGE}");
    Ok(image_http_response(response, cache_control))
}

/// Handle thumbnail requests.
///
/// # Endpoint
///
/// `GET /thumbnail/{image_id}?width=256&height=256&encoding=JPEG`
///
/// The whole image is scaled to fit inside `width x height` keeping its
/// aspect ratio. Both bounds default to 256 and must be 1-4096. Images
/// smaller than the box are not enlarged.
///
/// # Query Parameters
///
/// - `width`, `height`: Bounding box
/// - `encoding`: `JPEG`, `PNG` or `raw`
/// - `quality`, `frame`, `style`: As for tiles
pub async fn thumbnail_handler(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Query(query): Query<ThumbnailQueryParams>,
) -> Result<Response, TileError> {
    let request = RegionRequest::thumbnail(
        image_id,
        query.width.unwrap_or(DEFAULT_THUMBNAIL_SIZE),
        query.height.unwrap_or(DEFAULT_THUMBNAIL_SIZE),
    );
    let request = apply_output(
        request,
        query.encoding.as_deref(),
        query.quality,
        query.frame,
        query.style.as_deref(),
    )?;

    let response = state.tile_service.get_region(request).await?;
    Ok(image_http_response(response, state.cache_control()))
}

/// Handle region requests.
///
/// # Endpoint
///
/// `GET /region/{image_id}?left=0&top=0&width=1000&height=800&maxWidth=500`
///
/// # Query Parameters
///
/// - `left`, `top`: Required edges; negative values count from the far edge
/// - `right` or `width`, `bottom` or `height`: One of each is required
/// - `units`: `base_pixels` (default), `fraction` or `mm`
/// - `maxWidth`, `maxHeight`: Optional output bounds, the aspect ratio is kept
/// - `encoding`, `quality`, `frame`, `style`: As for thumbnails
///
/// # Response
///
/// - `200 OK`: Encoded region
/// - `400 Bad Request`: Missing edges, an empty region, or an output larger
///   than 4096 pixels on a side
pub async fn region_handler(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Query(query): Query<RegionQueryParams>,
) -> Result<Response, TileError> {
    let request = RegionRequest::new(image_id, query.region()?)
        .with_max_size(query.max_width, query.max_height);
    let request = apply_output(
        request,
        query.encoding.as_deref(),
        query.quality,
        query.frame,
        query.style.as_deref(),
    )?;

    let response = state.tile_service.get_region(request).await?;
    Ok(image_http_response(response, state.cache_control()))
}

/// Handle cache statistics requests.
///
/// # Endpoint
///
/// `GET /cache`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "count": 2,
///   "capacity": 10,
///   "keys": ["/data/b.svs", "/data/a.svs"]
/// }
/// ```
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.tile_service.cache_stats().await)
}

/// Close every cached handle.
///
/// # Endpoint
///
/// `DELETE /cache`
pub async fn cache_clear_handler(State(state): State<AppState>) -> Json<CacheClearResponse> {
    let cleared = state.tile_service.clear_cache().await;
    Json(CacheClearResponse { cleared })
}

/// Close the cached handle of one image.
///
/// # Endpoint
///
/// `DELETE /cache/{image_id}`
pub async fn cache_evict_handler(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<Json<CacheEvictResponse>, TileError> {
    let closed = state.tile_service.close_source(&image_id).await?;
    Ok(Json(CacheEvictResponse { image_id, closed }))
}

// =============================================================================
// Tests
// =============================================================================
