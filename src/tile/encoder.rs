//! Output encoding for assembled tiles.
//!
//! # Design Decisions
//!
//! - **Sample conversion**: JPEG carries 8-bit samples only and PNG 8 or 16-bit
//!   samples. Anything wider is reduced with [`PixelBuffer::to_u8`] first: 16-bit
//!   data keeps its high byte, other types are stretched over their own range.
//!   `raw` output always carries the native samples.
//!
//! - **Alpha is dropped for JPEG**: gray+alpha becomes gray and RGBA becomes RGB.
//!
//! - **Raw output** is the interleaved sample bytes in native byte order, with
//!   the shape given by the tile size and band count.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use serde::Serialize;

use super::pixels::PixelBuffer;
use crate::decoder::SampleType;
use crate::error::TileError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// Output Format
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Raw,
}

impl OutputFormat {
    /// Parse a file extension such as `jpg` or `png`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "raw" => Some(OutputFormat::Raw),
            _ => None,
        }
    }

    /// Extension used in Deep Zoom descriptors and file names.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Raw => "raw",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Raw => "application/octet-stream",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("unknown output format '{s}'"))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Raw => "raw",
        })
    }
}

// =============================================================================
// Tile Encoder
// =============================================================================

/// Encodes pixel buffers into response bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileEncoder;

impl TileEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode `tile` in `format`. `quality` only applies to JPEG and is clamped.
    pub fn encode(
        &self,
        tile: &PixelBuffer,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Bytes, TileError> {
        match format {
            OutputFormat::Jpeg => self.encode_jpeg(tile, clamp_quality(quality)),
            OutputFormat::Png => self.encode_png(tile),
            OutputFormat::Raw => Ok(Bytes::copy_from_slice(tile.data())),
        }
    }

    fn encode_jpeg(&self, tile: &PixelBuffer, quality: u8) -> Result<Bytes, TileError> {
        let tile = eight_bit(tile);
        let tile = tile.as_ref();

        let (data, color) = match tile.channels() {
            1 => (tile.data().to_vec(), ExtendedColorType::L8),
            2 => (drop_alpha(tile.data(), 2), ExtendedColorType::L8),
            3 => (tile.data().to_vec(), ExtendedColorType::Rgb8),
            4 => (drop_alpha(tile.data(), 4), ExtendedColorType::Rgb8),
            _ => return Err(unsupported(tile, OutputFormat::Jpeg)),
        };

        let mut output = Vec::new();
        JpegEncoder::new_with_quality(&mut output, quality)
            .encode(&data, tile.width(), tile.height(), color)
            .map_err(|e| TileError::EncodeError {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }

    fn encode_png(&self, tile: &PixelBuffer) -> Result<Bytes, TileError> {
        let tile = match tile.sample_type() {
            SampleType::Uint8 | SampleType::Uint16 => Cow::Borrowed(tile),
            _ => Cow::Owned(tile.to_u8()),
        };
        let tile = tile.as_ref();
        let color = match (tile.sample_type(), tile.channels()) {
            (SampleType::Uint8, 1) => ExtendedColorType::L8,
            (SampleType::Uint8, 2) => ExtendedColorType::La8,
            (SampleType::Uint8, 3) => ExtendedColorType::Rgb8,
            (SampleType::Uint8, 4) => ExtendedColorType::Rgba8,
            (SampleType::Uint16, 1) => ExtendedColorType::L16,
            (SampleType::Uint16, 2) => ExtendedColorType::La16,
            (SampleType::Uint16, 3) => ExtendedColorType::Rgb16,
            (SampleType::Uint16, 4) => ExtendedColorType::Rgba16,
            _ => return Err(unsupported(tile, OutputFormat::Png)),
        };

        let mut output = Vec::new();
        PngEncoder::new(&mut output)
            .write_image(tile.data(), tile.width(), tile.height(), color)
            .map_err(|e| TileError::EncodeError {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }
}

fn eight_bit(tile: &PixelBuffer) -> Cow<'_, PixelBuffer> {
    match tile.sample_type() {
        SampleType::Uint8 => Cow::Borrowed(tile),
        _ => Cow::Owned(tile.to_u8()),
    }
}

fn drop_alpha(data: &[u8], channels: usize) -> Vec<u8> {
    data.chunks_exact(channels)
        .flat_map(|pixel| &pixel[..channels - 1])
        .copied()
        .collect()
}

fn unsupported(tile: &PixelBuffer, format: OutputFormat) -> TileError {
    TileError::EncodeError {
        message: format!(
            "cannot encode {} band {:?} samples as {format}; request raw output",
            tile.channels(),
            tile.sample_type()
        ),
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
