//! Decoder capability interface.
//!
//! Format backends implement [`DecoderFactory`] to open files and
//! [`DecoderHandle`] to read native pixel regions. The rest of the crate never
//! sees a concrete backend; it only talks to these traits through the
//! [`DecoderRegistry`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         DecoderHandleCache              │
//! └────────────────────┬────────────────────┘
//!                      │ open(path, options)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           DecoderRegistry               │
//! │  (predicate, priority, factory) list    │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │  RasterDecoder  │    │  other backends     │
//! │  (PNG / JPEG)   │    │                     │
//! └─────────────────┘    └─────────────────────┘
//! ```
//!
//! Handles are not assumed to be thread-safe: every method takes `&mut self`
//! for reads and callers serialize access per handle.

mod raster;
mod registry;

pub use raster::RasterDecoder;
pub use registry::{extension_predicate, DecoderRegistry, Priority};

use std::path::Path;

use serde::Serialize;

use crate::error::DecodeError;
use crate::pyramid::{DimensionExtents, FrameAddress};

// =============================================================================
// Sample Types
// =============================================================================

/// Numeric type of one sample (one channel of one pixel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Float32,
    Float64,
}

impl SampleType {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleType::Uint8 | SampleType::Int8 => 1,
            SampleType::Uint16 | SampleType::Int16 => 2,
            SampleType::Uint32 | SampleType::Int32 | SampleType::Float32 => 4,
            SampleType::Float64 => 8,
        }
    }

    /// Byte used for padding outside the image.
    ///
    /// 8-bit data pads white (light background), everything else pads zero.
    pub fn fill_byte(&self) -> u8 {
        match self {
            SampleType::Uint8 => 255,
            _ => 0,
        }
    }
}

// =============================================================================
// Regions
// =============================================================================

/// Rectangle in native pixel coordinates of one resolution level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Samples returned by [`DecoderHandle::read_region`].
///
/// `data` holds `width * height * channels` samples in native byte order,
/// either interleaved (`y, x, channel`) or planar (`channel, y, x`).
#[derive(Debug, Clone)]
pub struct RawRegion {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub sample_type: SampleType,
    pub interleaved: bool,
    pub data: Vec<u8>,
}

impl RawRegion {
    /// Number of bytes `data` must hold.
    pub fn expected_len(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.channels as usize
            * self.sample_type.bytes_per_sample()
    }
}

/// Physical scale information, when the resource carries it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Magnification {
    /// Objective magnification
    pub magnification: Option<f64>,
    /// Pixel width in millimeters
    pub mm_x: Option<f64>,
    /// Pixel height in millimeters
    pub mm_y: Option<f64>,
}

/// Per-open decode configuration.
///
/// `style` is opaque to the core: it is passed to the backend untouched, and
/// any request carrying one gets its own uncached handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenOptions {
    pub style: Option<serde_json::Value>,
}

impl OpenOptions {
    pub fn styled(style: serde_json::Value) -> Self {
        Self { style: Some(style) }
    }

    pub fn is_styled(&self) -> bool {
        self.style.is_some()
    }
}

// =============================================================================
// Capability Traits
// =============================================================================

/// Opens files for one backend.
pub trait DecoderFactory: Send + Sync {
    /// Short backend name used in logs and error messages.
    fn name(&self) -> &str;

    /// Open a file.
    ///
    /// Return [`DecodeError::NotFound`] if the file is missing, so the registry
    /// can report it as a missing resource rather than an open failure.
    fn open(
        &self,
        path: &Path,
        options: &OpenOptions,
    ) -> Result<Box<dyn DecoderHandle>, DecodeError>;
}

/// An open, stateful native resource granting pixel access to one image.
pub trait DecoderHandle: Send {
    /// Full-resolution `(width, height)`.
    fn native_size(&self) -> (u32, u32);

    /// Number of native resolution levels, at least 1.
    fn native_resolution_count(&self) -> u32;

    /// `(width, height)` of a native level.
    ///
    /// Native levels are assumed to halve in size, which is also what the
    /// default computes.
    fn level_size(&self, level: u32) -> (u32, u32) {
        let (width, height) = self.native_size();
        (
            width.checked_shr(level).unwrap_or(0),
            height.checked_shr(level).unwrap_or(0),
        )
    }

    fn dimension_extents(&self) -> DimensionExtents {
        DimensionExtents::single()
    }

    /// Preferred native tile size, if the format is tiled.
    fn optimal_tile_hint(&self) -> Option<(u32, u32)> {
        None
    }

    fn sample_type(&self) -> SampleType;

    /// Samples per pixel in regions returned by [`read_region`](Self::read_region).
    fn band_count(&self) -> u32;

    /// Channel names for multi-channel data, empty if unknown.
    fn channel_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn magnification(&self) -> Magnification {
        Magnification::default()
    }

    /// Format-specific metadata, such as tags or vendor properties.
    fn internal_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }

    /// Names of secondary images stored with the resource, e.g. `label` or `macro`.
    fn associated_image_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Decode a whole associated image.
    fn read_associated_image(&mut self, name: &str) -> Result<RawRegion, DecodeError> {
        Err(DecodeError::Unsupported(format!(
            "no associated image named '{name}'"
        )))
    }

    /// Decode a region of one plane at a native level.
    ///
    /// Returns [`DecodeError::HandleUnusable`] when the handle is broken and
    /// must be discarded.
    fn read_region(
        &mut self,
        level: u32,
        region: Region,
        plane: FrameAddress,
    ) -> Result<RawRegion, DecodeError>;

    /// Release all native resources. Must be idempotent.
    fn close(&mut self);
}
