//! Test utilities for integration tests.
//!
//! This module provides a mock decoder backend with call tracking and helpers
//! for building image directories and driving the router.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{ImageBuffer, Luma, Rgb, RgbImage};
use tower::ServiceExt;

use pyramid_tiles::decoder::extension_predicate;
use pyramid_tiles::{
    create_router, DecodeError, DecoderFactory, DecoderHandle, DecoderHandleCache,
    DecoderRegistry, DimensionExtents, FrameAddress, OpenOptions, Priority, RawRegion, Region,
    ResourceResolver, RouterConfig, SampleType, TileService,
};

// =============================================================================
// Mock Decoder with Call Tracking
// =============================================================================

/// Counters shared by a mock decoder and every handle it opens.
#[derive(Debug, Default)]
pub struct MockCounters {
    opens: AtomicUsize,
    reads: AtomicUsize,
    closes: AtomicUsize,
}

impl MockCounters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Sample value of the mock image at full-resolution `(x, y)` in `plane`.
pub fn mock_pixel(x: u64, y: u64, plane: FrameAddress) -> u8 {
    let plane_offset = plane.c as u64 * 7 + plane.z as u64 * 11 + plane.t as u64 * 13;
    ((x / 3 + y / 5 + plane_offset) % 251) as u8
}

/// A decoder for `.mock` files: single band 8-bit, any size, computed pixels.
///
/// The file only has to exist; its contents are ignored.
#[derive(Clone)]
pub struct MockDecoder {
    width: u32,
    height: u32,
    levels: u32,
    tile_hint: Option<(u32, u32)>,
    extents: DimensionExtents,
    open_delay: Duration,
    fail_open: bool,
    /// `(name, width, height)` of each associated image
    associated: Vec<(String, u32, u32)>,
    counters: Arc<MockCounters>,
}

impl MockDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            levels: 1,
            tile_hint: None,
            extents: DimensionExtents::single(),
            open_delay: Duration::ZERO,
            fail_open: false,
            associated: Vec::new(),
            counters: Arc::new(MockCounters::default()),
        }
    }

    pub fn with_levels(mut self, levels: u32) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_tile_hint(mut self, size: u32) -> Self {
        self.tile_hint = Some((size, size));
        self
    }

    pub fn with_rect_tile_hint(mut self, width: u32, height: u32) -> Self {
        self.tile_hint = Some((width, height));
        self
    }

    pub fn with_associated(mut self, name: &str, width: u32, height: u32) -> Self {
        self.associated.push((name.to_string(), width, height));
        self
    }

    pub fn with_extents(mut self, extents: DimensionExtents) -> Self {
        self.extents = extents;
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn counters(&self) -> Arc<MockCounters> {
        Arc::clone(&self.counters)
    }
}

impl DecoderFactory for MockDecoder {
    fn name(&self) -> &str {
        "mock"
    }

    fn open(
        &self,
        path: &Path,
        _options: &OpenOptions,
    ) -> Result<Box<dyn DecoderHandle>, DecodeError> {
        if !path.is_file() {
            return Err(DecodeError::NotFound(path.display().to_string()));
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if !self.open_delay.is_zero() {
            std::thread::sleep(self.open_delay);
        }
        if self.fail_open {
            return Err(DecodeError::Open("corrupt header".to_string()));
        }

        Ok(Box::new(MockHandle {
            width: self.width,
            height: self.height,
            levels: self.levels,
            tile_hint: self.tile_hint,
            extents: self.extents,
            associated: self.associated.clone(),
            counters: Arc::clone(&self.counters),
            closed: false,
        }))
    }
}

struct MockHandle {
    width: u32,
    height: u32,
    levels: u32,
    tile_hint: Option<(u32, u32)>,
    extents: DimensionExtents,
    associated: Vec<(String, u32, u32)>,
    counters: Arc<MockCounters>,
    closed: bool,
}

/// Sample value of every pixel of a mock associated image.
pub const ASSOCIATED_PIXEL: u8 = 200;

impl DecoderHandle for MockHandle {
    fn native_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn native_resolution_count(&self) -> u32 {
        self.levels
    }

    fn dimension_extents(&self) -> DimensionExtents {
        self.extents
    }

    fn optimal_tile_hint(&self) -> Option<(u32, u32)> {
        self.tile_hint
    }

    fn sample_type(&self) -> SampleType {
        SampleType::Uint8
    }

    fn band_count(&self) -> u32 {
        1
    }

    fn associated_image_names(&self) -> Vec<String> {
        self.associated.iter().map(|(name, _, _)| name.clone()).collect()
    }

    fn read_associated_image(&mut self, name: &str) -> Result<RawRegion, DecodeError> {
        let (_, width, height) = self
            .associated
            .iter()
            .find(|(known, _, _)| known == name)
            .ok_or_else(|| DecodeError::Read(format!("no associated image {name}")))?;
        Ok(RawRegion {
            width: *width,
            height: *height,
            channels: 1,
            sample_type: SampleType::Uint8,
            interleaved: true,
            data: vec![ASSOCIATED_PIXEL; *width as usize * *height as usize],
        })
    }

    fn read_region(
        &mut self,
        level: u32,
        region: Region,
        plane: FrameAddress,
    ) -> Result<RawRegion, DecodeError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        if self.closed {
            return Err(DecodeError::HandleUnusable("closed".to_string()));
        }
        let (level_width, level_height) = self.level_size(level);
        if level >= self.levels
            || region.x + region.width > level_width
            || region.y + region.height > level_height
        {
            return Err(DecodeError::Read(format!("region {region:?} outside level {level}")));
        }

        let mut data = Vec::with_capacity(region.width as usize * region.height as usize);
        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                data.push(mock_pixel((x as u64) << level, (y as u64) << level, plane));
            }
        }

        Ok(RawRegion {
            width: region.width,
            height: region.height,
            channels: 1,
            sample_type: SampleType::Uint8,
            interleaved: true,
            data,
        })
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// =============================================================================
// Image Directories
// =============================================================================

/// Pixel of the generated test PNGs.
pub fn png_pixel(x: u32, y: u32) -> Rgb<u8> {
    Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
}

/// Write an RGB PNG of the given size, creating parent directories.
pub fn write_png(root: &Path, name: &str, width: u32, height: u32) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    RgbImage::from_fn(width, height, png_pixel).save(&path).unwrap();
}

/// Sample of the generated 16-bit test PNGs.
pub fn deep_pixel(x: u32) -> u16 {
    (x * 200) as u16
}

/// Write a single channel 16-bit PNG whose value grows to the right.
pub fn write_png16(root: &Path, name: &str, width: u32, height: u32) {
    let image: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_fn(width, height, |x, _| Luma([deep_pixel(x)]));
    image.save(root.join(name)).unwrap();
}

/// Create an empty file, e.g. a `.mock` image or a file that must not be served.
pub fn touch(root: &Path, name: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::File::create(path).unwrap();
}

// =============================================================================
// Server Setup
// =============================================================================

/// A router over a temporary image directory.
pub struct TestServer {
    pub dir: tempfile::TempDir,
    pub router: Router,
    pub cache: Arc<DecoderHandleCache>,
}

impl TestServer {
    /// Serve `dir` with the built-in raster backend plus `mock` for `.mock` files.
    pub fn new(dir: tempfile::TempDir, mock: MockDecoder, capacity: usize) -> Self {
        let mut registry = DecoderRegistry::with_defaults();
        registry.register(mock, Priority::High, extension_predicate(&["mock"]));

        let cache = Arc::new(DecoderHandleCache::new(Arc::new(registry), capacity));
        let resolver = ResourceResolver::new(dir.path(), &[".png", ".jpg", ".mock"]);
        let service = TileService::new(resolver, Arc::clone(&cache));
        let router = create_router(service, RouterConfig::new().with_tracing(false));

        Self { dir, router, cache }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        send(&self.router, Method::GET, uri).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        send(&self.router, Method::DELETE, uri).await
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, _, body) = self.get(uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }
}

/// Send one request through a clone of `router`.
pub async fn send(router: &Router, method: Method, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

/// Check if data is a valid JPEG (starts with SOI, ends with EOI).
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4 && data[0..2] == [0xFF, 0xD8] && data[data.len() - 2..] == [0xFF, 0xD9]
}
