//! Built-in backend for ordinary raster files (PNG, JPEG).
//!
//! These files have no pyramid and a single plane, so the whole image is decoded
//! at open time and regions are cropped from memory.

use std::path::Path;

use image::{DynamicImage, ImageFormat};
use tracing::debug;

use super::{DecoderFactory, DecoderHandle, OpenOptions, RawRegion, Region, SampleType};
use crate::error::DecodeError;
use crate::pyramid::FrameAddress;

/// Factory for [`RasterHandle`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

impl RasterDecoder {
    /// File extensions this backend registers for by default.
    pub const EXTENSIONS: &'static [&'static str] = &["png", "jpg", "jpeg"];

    pub fn new() -> Self {
        Self
    }
}

impl DecoderFactory for RasterDecoder {
    fn name(&self) -> &str {
        "raster"
    }

    fn open(
        &self,
        path: &Path,
        options: &OpenOptions,
    ) -> Result<Box<dyn DecoderHandle>, DecodeError> {
        if !path.is_file() {
            return Err(DecodeError::NotFound(path.display().to_string()));
        }
        if options.is_styled() {
            debug!(path = %path.display(), "Raster decoder ignores style");
        }

        let image = image::open(path).map_err(|e| DecodeError::Open(e.to_string()))?;
        let mut handle = RasterHandle::from_image(image);
        handle.format = ImageFormat::from_path(path)
            .ok()
            .and_then(|format| format.extensions_str().first().copied());
        Ok(Box::new(handle))
    }
}

/// A fully decoded raster image.
pub struct RasterHandle {
    width: u32,
    height: u32,
    channels: u32,
    sample_type: SampleType,
    color_type: &'static str,
    format: Option<&'static str>,
    /// Interleaved samples; `None` once closed
    pixels: Option<Vec<u8>>,
}

impl RasterHandle {
    pub fn from_image(image: DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let color_type = color_type_name(image.color());
        let (channels, sample_type, pixels) = match image {
            DynamicImage::ImageLuma8(buf) => (1, SampleType::Uint8, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (2, SampleType::Uint8, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (3, SampleType::Uint8, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (4, SampleType::Uint8, buf.into_raw()),
            DynamicImage::ImageLuma16(buf) => (1, SampleType::Uint16, ne_bytes_u16(&buf)),
            DynamicImage::ImageLumaA16(buf) => (2, SampleType::Uint16, ne_bytes_u16(&buf)),
            DynamicImage::ImageRgb16(buf) => (3, SampleType::Uint16, ne_bytes_u16(&buf)),
            DynamicImage::ImageRgba16(buf) => (4, SampleType::Uint16, ne_bytes_u16(&buf)),
            DynamicImage::ImageRgb32F(buf) => (3, SampleType::Float32, ne_bytes_f32(&buf)),
            DynamicImage::ImageRgba32F(buf) => (4, SampleType::Float32, ne_bytes_f32(&buf)),
            other => (4, SampleType::Uint8, other.to_rgba8().into_raw()),
        };

        Self {
            width,
            height,
            channels,
            sample_type,
            color_type,
            format: None,
            pixels: Some(pixels),
        }
    }
}

fn color_type_name(color: image::ColorType) -> &'static str {
    match color {
        image::ColorType::L8 => "L8",
        image::ColorType::La8 => "La8",
        image::ColorType::Rgb8 => "Rgb8",
        image::ColorType::Rgba8 => "Rgba8",
        image::ColorType::L16 => "L16",
        image::ColorType::La16 => "La16",
        image::ColorType::Rgb16 => "Rgb16",
        image::ColorType::Rgba16 => "Rgba16",
        image::ColorType::Rgb32F => "Rgb32F",
        image::ColorType::Rgba32F => "Rgba32F",
        _ => "other",
    }
}

fn ne_bytes_u16(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn ne_bytes_f32(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

impl DecoderHandle for RasterHandle {
    fn native_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn native_resolution_count(&self) -> u32 {
        1
    }

    fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    fn band_count(&self) -> u32 {
        self.channels
    }

    fn internal_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut metadata = serde_json::Map::new();
        if let Some(format) = self.format {
            metadata.insert("format".to_string(), format.into());
        }
        metadata.insert("colorType".to_string(), self.color_type.into());
        metadata
    }

    fn read_region(
        &mut self,
        level: u32,
        region: Region,
        _plane: FrameAddress,
    ) -> Result<RawRegion, DecodeError> {
        let pixels = self
            .pixels
            .as_ref()
            .ok_or_else(|| DecodeError::HandleUnusable("raster handle is closed".to_string()))?;

        if level != 0 {
            return Err(DecodeError::Read(format!(
                "raster images have a single resolution, got level {level}"
            )));
        }
        if region.x as u64 + region.width as u64 > self.width as u64
            || region.y as u64 + region.height as u64 > self.height as u64
        {
            return Err(DecodeError::Read(format!(
                "region {}x{}+{}+{} exceeds image {}x{}",
                region.width, region.height, region.x, region.y, self.width, self.height
            )));
        }

        let pixel_bytes = self.channels as usize * self.sample_type.bytes_per_sample();
        let src_stride = self.width as usize * pixel_bytes;
        let row_bytes = region.width as usize * pixel_bytes;
        let mut data = Vec::with_capacity(row_bytes * region.height as usize);
        for row in region.y..region.y + region.height {
            let start = row as usize * src_stride + region.x as usize * pixel_bytes;
            data.extend_from_slice(&pixels[start..start + row_bytes]);
        }

        Ok(RawRegion {
            width: region.width,
            height: region.height,
            channels: self.channels,
            sample_type: self.sample_type,
            interleaved: true,
            data,
        })
    }

    fn close(&mut self) {
        self.pixels = None;
    }
}
