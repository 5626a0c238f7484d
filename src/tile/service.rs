//! Tile Service for orchestrating tile requests.
//!
//! The TileService is the main entry point for everything the HTTP layer needs.
//! It orchestrates:
//! - Request validation
//! - Resolving image identifiers to files
//! - Handle access via the handle cache
//! - Tile assembly and output encoding on the blocking pool
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │           get_tile() / get_region()                     │    │
//! │  │  1. Validate params   3. Acquire source                 │    │
//! │  │  2. Resolve id        4. Assemble + encode (blocking)   │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │  ┌────────────────┐  ┌──────────────────┐  ┌──────────────────┐ │
//! │  │ResourceResolver│  │DecoderHandleCache│  │TileAssembler +   │ │
//! │  │                │  │                  │  │TileEncoder       │ │
//! │  └────────────────┘  └──────────────────┘  └──────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::TileError;
use crate::pyramid::LevelMapper;
use crate::source::{CacheStats, DecoderHandleCache, ImageMetadata, ImageSource, ResourceResolver};

use super::encoder::{is_valid_quality, OutputFormat, TileEncoder, DEFAULT_JPEG_QUALITY};
use super::pixels::PixelBuffer;
use super::region::{check_output_size, fit_output, PixelRect, RegionSpec, MAX_OUTPUT_DIMENSION};

// =============================================================================
// Tile Request
// =============================================================================

/// A request for a tile.
///
/// This struct contains all parameters needed to identify and render a tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    /// Image identifier relative to the image root
    pub image_id: String,

    /// Pyramid level (0 = coarsest)
    pub level: u32,

    /// Tile X coordinate (0-indexed from left)
    pub x: u32,

    /// Tile Y coordinate (0-indexed from top)
    pub y: u32,

    /// Flat frame index over (c, z, t)
    pub frame: u64,

    /// Opaque decode configuration; styled requests never share handles
    pub style: Option<serde_json::Value>,

    /// Output format, the service default when `None`
    pub format: Option<OutputFormat>,

    /// JPEG quality (1-100), the service default when `None`
    pub quality: Option<u8>,
}

impl TileRequest {
    pub fn new(image_id: impl Into<String>, level: u32, x: u32, y: u32) -> Self {
        Self {
            image_id: image_id.into(),
            level,
            x,
            y,
            frame: 0,
            style: None,
            format: None,
            quality: None,
        }
    }

    pub fn with_frame(mut self, frame: u64) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_style(mut self, style: serde_json::Value) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }
}

// =============================================================================
// Region Request
// =============================================================================

/// A request for a rendered region or thumbnail.
///
/// The rectangle is scaled down to fit `max_width x max_height`, keeping its
/// aspect ratio. Missing bounds do not constrain, and output is never larger
/// than the region at full resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRequest {
    pub image_id: String,

    /// Area to render, the whole image when `None`
    pub region: Option<RegionSpec>,

    pub max_width: Option<u32>,
    pub max_height: Option<u32>,

    /// Flat frame index over (c, z, t)
    pub frame: u64,

    pub style: Option<serde_json::Value>,
    pub format: Option<OutputFormat>,
    pub quality: Option<u8>,
}

impl RegionRequest {
    pub fn new(image_id: impl Into<String>, region: RegionSpec) -> Self {
        Self {
            image_id: image_id.into(),
            region: Some(region),
            max_width: None,
            max_height: None,
            frame: 0,
            style: None,
            format: None,
            quality: None,
        }
    }

    /// The whole image, fitted inside `width x height`.
    pub fn thumbnail(image_id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            region: None,
            max_width: Some(width),
            max_height: Some(height),
            ..Self::new(image_id, RegionSpec::default())
        }
    }

    pub fn with_max_size(mut self, max_width: Option<u32>, max_height: Option<u32>) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    pub fn with_frame(mut self, frame: u64) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_style(mut self, style: serde_json::Value) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }
}

// =============================================================================
// Tile Response
// =============================================================================

/// Encoded image returned by the service.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The encoded tile
    pub data: Bytes,

    pub format: OutputFormat,

    /// The JPEG quality used for encoding
    pub quality: u8,
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service answering tile, metadata and cache requests.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use pyramid_tiles::decoder::DecoderRegistry;
/// use pyramid_tiles::source::{DecoderHandleCache, ResourceResolver};
/// use pyramid_tiles::tile::{TileRequest, TileService};
///
/// let cache = DecoderHandleCache::new(Arc::new(DecoderRegistry::with_defaults()), 10);
/// let resolver = ResourceResolver::with_default_extensions("/data/images");
/// let service = TileService::new(resolver, Arc::new(cache));
///
/// let response = service.get_tile(TileRequest::new("case1/slide.png", 0, 0, 0)).await?;
/// println!("Tile size: {} bytes", response.data.len());
/// ```
pub struct TileService {
    resolver: ResourceResolver,
    cache: Arc<DecoderHandleCache>,
    encoder: TileEncoder,
    default_format: OutputFormat,
    default_quality: u8,
}

impl TileService {
    pub fn new(resolver: ResourceResolver, cache: Arc<DecoderHandleCache>) -> Self {
        Self {
            resolver,
            cache,
            encoder: TileEncoder::new(),
            default_format: OutputFormat::default(),
            default_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Format used when a request does not name one.
    pub fn with_default_format(mut self, format: OutputFormat) -> Self {
        self.default_format = format;
        self
    }

    /// Quality used when a request does not name one.
    pub fn with_default_quality(mut self, quality: u8) -> Self {
        self.default_quality = quality;
        self
    }

    pub fn resolver(&self) -> &ResourceResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &Arc<DecoderHandleCache> {
        &self.cache
    }

    pub fn default_format(&self) -> OutputFormat {
        self.default_format
    }

    pub fn default_quality(&self) -> u8 {
        self.default_quality
    }

    /// Get a tile addressed by canonical level.
    ///
    /// Out-of-range levels and coordinates fail with
    /// [`TileError::AddressOutOfRange`].
    pub async fn get_tile(&self, request: TileRequest) -> Result<TileResponse, TileError> {
        let (format, quality) = self.output_params(request.format, request.quality)?;
        let source = self.acquire(&request.image_id, request.style.as_ref()).await?;
        let assembler = self.cache.assembler();
        let (x, y, level, frame) = (request.x, request.y, request.level, request.frame);
        self.render(source, format, quality, move |source| {
            assembler.get_tile(source, x, y, level, frame)
        })
        .await
    }

    /// Get a tile addressed by external viewer level.
    ///
    /// `request.level` is an external level; it is clamped into the canonical
    /// pyramid, so only `x` and `y` can be out of range. Viewer tiles are
    /// square with the side of the canonical tile width, so non-square
    /// canonical tiles are served as stitched windows.
    pub async fn get_viewer_tile(&self, request: TileRequest) -> Result<TileResponse, TileError> {
        let (format, quality) = self.output_params(request.format, request.quality)?;
        let source = self.acquire(&request.image_id, request.style.as_ref()).await?;
        let geometry = *source.geometry();
        let level = LevelMapper::new(&geometry).to_canonical(request.level as i64);
        debug!(
            image_id = %request.image_id,
            external_level = request.level,
            level,
            "Mapped viewer level"
        );

        let assembler = self.cache.assembler();
        let (x, y, frame) = (request.x, request.y, request.frame);
        let side = geometry.tile_width;
        self.render(source, format, quality, move |source| {
            if geometry.tile_height == side {
                assembler.get_tile(source, x, y, level, frame)
            } else {
                assembler.get_window(
                    source,
                    level,
                    x.saturating_mul(side),
                    y.saturating_mul(side),
                    side,
                    side,
                    frame,
                )
            }
        })
        .await
    }

    /// Render a region, or the whole image for a thumbnail.
    ///
    /// Bounds must be 1-4096 pixels, and so must the resulting output size.
    pub async fn get_region(&self, request: RegionRequest) -> Result<TileResponse, TileError> {
        let (format, quality) = self.output_params(request.format, request.quality)?;
        for bound in [request.max_width, request.max_height].into_iter().flatten() {
            if !(1..=MAX_OUTPUT_DIMENSION).contains(&bound) {
                return Err(TileError::InvalidRegion {
                    reason: format!("size bound {bound} must be 1-{MAX_OUTPUT_DIMENSION}"),
                });
            }
        }

        let source = self.acquire(&request.image_id, request.style.as_ref()).await?;
        let (size_x, size_y) = (source.geometry().size_x, source.geometry().size_y);
        let rect = match &request.region {
            Some(region) => {
                let magnification = source.magnification();
                region.resolve(size_x, size_y, (magnification.mm_x, magnification.mm_y))?
            }
            None => PixelRect::full(size_x, size_y),
        };
        let (out_width, out_height) =
            fit_output(rect.width, rect.height, request.max_width, request.max_height);
        check_output_size(out_width, out_height)?;
        debug!(
            image_id = %request.image_id,
            ?rect,
            out_width,
            out_height,
            "Rendering region"
        );

        let assembler = self.cache.assembler();
        let frame = request.frame;
        self.render(source, format, quality, move |source| {
            assembler.get_region(source, rect, out_width, out_height, frame)
        })
        .await
    }

    /// Format-specific metadata of an image, empty if the backend has none.
    pub async fn get_internal_metadata(
        &self,
        image_id: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, TileError> {
        let source = self.acquire(image_id, None).await?;
        Ok(source.internal_metadata().clone())
    }

    /// Names of the associated images stored with an image.
    pub async fn list_associated_images(&self, image_id: &str) -> Result<Vec<String>, TileError> {
        let source = self.acquire(image_id, None).await?;
        Ok(source.associated_images().to_vec())
    }

    /// Encode one associated image. Unknown names are [`TileError::ResourceNotFound`].
    pub async fn get_associated_image(
        &self,
        image_id: &str,
        name: &str,
        format: Option<OutputFormat>,
        quality: Option<u8>,
    ) -> Result<TileResponse, TileError> {
        let (format, quality) = self.output_params(format, quality)?;
        let source = self.acquire(image_id, None).await?;
        let name = name.to_string();
        self.render(source, format, quality, move |source| {
            source.read_associated(&name)
        })
        .await
    }

    /// Describe an image, opening it if needed.
    pub async fn get_metadata(&self, image_id: &str) -> Result<ImageMetadata, TileError> {
        let source = self.acquire(image_id, None).await?;
        Ok(source.metadata())
    }

    /// All servable image identifiers under the root, sorted.
    pub async fn list_images(&self) -> Result<Vec<String>, TileError> {
        let resolver = self.resolver.clone();
        tokio::task::spawn_blocking(move || resolver.list())
            .await
            .map_err(|e| TileError::Internal {
                message: format!("listing task failed: {e}"),
            })
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Close every cached handle. Returns how many were closed.
    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }

    /// Evict the cached handle for one image. Returns whether one was cached.
    pub async fn close_source(&self, image_id: &str) -> Result<bool, TileError> {
        let path = self.resolver.resolve(image_id)?;
        Ok(self.cache.evict(&path).await)
    }

    fn output_params(
        &self,
        format: Option<OutputFormat>,
        quality: Option<u8>,
    ) -> Result<(OutputFormat, u8), TileError> {
        let quality = quality.unwrap_or(self.default_quality);
        if !is_valid_quality(quality) {
            return Err(TileError::InvalidQuality { quality });
        }
        Ok((format.unwrap_or(self.default_format), quality))
    }

    async fn acquire(
        &self,
        image_id: &str,
        style: Option<&serde_json::Value>,
    ) -> Result<Arc<ImageSource>, TileError> {
        let path = self.resolver.resolve_checked(image_id)?;
        self.cache.acquire(&path, style).await
    }

    /// Build pixels with `build` and encode them on the blocking pool.
    ///
    /// A handle the backend reports as unusable is dropped from the cache so the
    /// next request reopens the file.
    async fn render<F>(
        &self,
        source: Arc<ImageSource>,
        format: OutputFormat,
        quality: u8,
        build: F,
    ) -> Result<TileResponse, TileError>
    where
        F: FnOnce(&ImageSource) -> Result<PixelBuffer, TileError> + Send + 'static,
    {
        let encoder = self.encoder;
        let task_source = Arc::clone(&source);
        let result = tokio::task::spawn_blocking(move || {
            let pixels = build(&task_source)?;
            encoder.encode(&pixels, format, quality)
        })
        .await
        .map_err(|e| TileError::Internal {
            message: format!("tile task failed: {e}"),
        })?;

        match result {
            Ok(data) => Ok(TileResponse {
                data,
                format,
                quality,
            }),
            Err(e) => {
                if e.is_unusable_handle() {
                    warn!(
                        path = %source.path().display(),
                        error = %e,
                        "Decoder handle unusable, evicting"
                    );
                    self.cache.invalidate(&source).await;
                }
                Err(e)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
