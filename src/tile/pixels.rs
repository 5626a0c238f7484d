//! Interleaved pixel buffers.
//!
//! All tile assembly works on raw bytes: a pixel is `channels * bytes_per_sample`
//! consecutive bytes, so decimation, padding and compositing never need to know
//! the numeric sample type.

use crate::decoder::{RawRegion, SampleType};
use crate::error::DecodeError;

/// An interleaved `height x width x channels` block of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u32,
    sample_type: SampleType,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// A buffer of the given size filled with the sample type's padding byte.
    pub fn filled(width: u32, height: u32, channels: u32, sample_type: SampleType) -> Self {
        let len = width as usize * height as usize * channels as usize * sample_type.bytes_per_sample();
        Self {
            width,
            height,
            channels,
            sample_type,
            data: vec![sample_type.fill_byte(); len],
        }
    }

    /// A zero-sized buffer, used for windows entirely outside the image.
    pub fn empty(channels: u32, sample_type: SampleType) -> Self {
        Self::filled(0, 0, channels, sample_type)
    }

    /// Take ownership of a backend region, converting planar data to interleaved.
    pub fn from_raw(raw: RawRegion) -> Result<Self, DecodeError> {
        if raw.data.len() != raw.expected_len() {
            return Err(DecodeError::Read(format!(
                "backend returned {} bytes for a {}x{}x{} region, expected {}",
                raw.data.len(),
                raw.width,
                raw.height,
                raw.channels,
                raw.expected_len()
            )));
        }

        let data = if raw.interleaved || raw.channels <= 1 {
            raw.data
        } else {
            planar_to_interleaved(&raw)
        };

        Ok(Self {
            width: raw.width,
            height: raw.height,
            channels: raw.channels,
            sample_type: raw.sample_type,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    fn pixel_bytes(&self) -> usize {
        self.channels as usize * self.sample_type.bytes_per_sample()
    }

    fn stride(&self) -> usize {
        self.width as usize * self.pixel_bytes()
    }

    /// Bytes of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let pixel_bytes = self.pixel_bytes();
        let start = y as usize * self.stride() + x as usize * pixel_bytes;
        &self.data[start..start + pixel_bytes]
    }

    /// Keep every `step`-th pixel on both axes, starting at (0, 0).
    pub fn decimate(&self, step: u32) -> Self {
        if step <= 1 {
            return self.clone();
        }
        let width = self.width.div_ceil(step);
        let height = self.height.div_ceil(step);
        let pixel_bytes = self.pixel_bytes();

        let mut data = Vec::with_capacity(width as usize * height as usize * pixel_bytes);
        for y in (0..self.height).step_by(step as usize) {
            for x in (0..self.width).step_by(step as usize) {
                data.extend_from_slice(self.pixel(x, y));
            }
        }

        Self {
            width,
            height,
            channels: self.channels,
            sample_type: self.sample_type,
            data,
        }
    }

    /// Copy `src` so its top-left corner lands at `(dst_x, dst_y)`.
    ///
    /// Whatever falls outside `self` is dropped.
    pub fn blit(&mut self, src: &PixelBuffer, dst_x: u32, dst_y: u32) {
        debug_assert_eq!(self.pixel_bytes(), src.pixel_bytes());
        if dst_x >= self.width || dst_y >= self.height {
            return;
        }
        let copy_width = src.width.min(self.width - dst_x) as usize;
        let copy_height = src.height.min(self.height - dst_y);
        let pixel_bytes = self.pixel_bytes();
        let row_bytes = copy_width * pixel_bytes;
        let dst_stride = self.stride();
        let src_stride = src.stride();

        for row in 0..copy_height {
            let src_start = row as usize * src_stride;
            let dst_start = (dst_y + row) as usize * dst_stride + dst_x as usize * pixel_bytes;
            self.data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src.data[src_start..src_start + row_bytes]);
        }
    }

    /// Copy of the `width x height` block at `(x, y)`, clipped to the buffer.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x = x.min(self.width);
        let y = y.min(self.height);
        let width = width.min(self.width - x);
        let height = height.min(self.height - y);
        let pixel_bytes = self.pixel_bytes();
        let row_bytes = width as usize * pixel_bytes;

        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in y..y + height {
            let start = row as usize * self.stride() + x as usize * pixel_bytes;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }

        Self {
            width,
            height,
            channels: self.channels,
            sample_type: self.sample_type,
            data,
        }
    }

    /// Nearest-neighbor resample to exactly `width x height`.
    pub fn resize(&self, width: u32, height: u32) -> Self {
        if (width, height) == (self.width, self.height) || self.width == 0 || self.height == 0 {
            return self.clone();
        }
        let pixel_bytes = self.pixel_bytes();
        let mut data = Vec::with_capacity(width as usize * height as usize * pixel_bytes);
        for y in 0..height {
            let src_y = (y as u64 * self.height as u64 / height as u64) as u32;
            for x in 0..width {
                let src_x = (x as u64 * self.width as u64 / width as u64) as u32;
                data.extend_from_slice(self.pixel(src_x, src_y));
            }
        }

        Self {
            width,
            height,
            channels: self.channels,
            sample_type: self.sample_type,
            data,
        }
    }

    /// Convert to 8-bit samples for formats that cannot carry anything wider.
    ///
    /// 16-bit unsigned samples keep their high byte. Other types are stretched
    /// linearly from the buffer's finite minimum and maximum onto `0..=255`.
    pub fn to_u8(&self) -> Self {
        let data = match self.sample_type {
            SampleType::Uint8 => return self.clone(),
            SampleType::Uint16 => self
                .data
                .chunks_exact(2)
                .map(|b| (u16::from_ne_bytes([b[0], b[1]]) >> 8) as u8)
                .collect(),
            _ => {
                let values = self.samples_f64();
                let (min, max) = values
                    .iter()
                    .filter(|v| v.is_finite())
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                        (lo.min(v), hi.max(v))
                    });
                let range = max - min;
                values
                    .iter()
                    .map(|&v| {
                        if !v.is_finite() || range <= 0.0 {
                            0
                        } else {
                            ((v - min) / range * 255.0).round().clamp(0.0, 255.0) as u8
                        }
                    })
                    .collect()
            }
        };

        Self {
            width: self.width,
            height: self.height,
            channels: self.channels,
            sample_type: SampleType::Uint8,
            data,
        }
    }

    fn samples_f64(&self) -> Vec<f64> {
        let bytes = self.sample_type.bytes_per_sample();
        self.data
            .chunks_exact(bytes)
            .map(|b| match self.sample_type {
                SampleType::Uint8 => b[0] as f64,
                SampleType::Int8 => b[0] as i8 as f64,
                SampleType::Uint16 => u16::from_ne_bytes([b[0], b[1]]) as f64,
                SampleType::Int16 => i16::from_ne_bytes([b[0], b[1]]) as f64,
                SampleType::Uint32 => u32::from_ne_bytes([b[0], b[1], b[2], b[3]]) as f64,
                SampleType::Int32 => i32::from_ne_bytes([b[0], b[1], b[2], b[3]]) as f64,
                SampleType::Float32 => f32::from_ne_bytes([b[0], b[1], b[2], b[3]]) as f64,
                SampleType::Float64 => {
                    f64::from_ne_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
                }
            })
            .collect()
    }

    /// Extend to `width x height` with padding on the right and bottom.
    ///
    /// The current content stays in the top-left corner. A buffer already at
    /// least that large is returned unchanged.
    pub fn pad_to(self, width: u32, height: u32) -> Self {
        if self.width >= width && self.height >= height {
            return self;
        }
        let mut padded = Self::filled(
            width.max(self.width),
            height.max(self.height),
            self.channels,
            self.sample_type,
        );
        padded.blit(&self, 0, 0);
        padded
    }
}

fn planar_to_interleaved(raw: &RawRegion) -> Vec<u8> {
    let sample_bytes = raw.sample_type.bytes_per_sample();
    let channels = raw.channels as usize;
    let plane_samples = raw.width as usize * raw.height as usize;
    let plane_bytes = plane_samples * sample_bytes;

    let mut data = vec![0u8; raw.data.len()];
    for index in 0..plane_samples {
        for channel in 0..channels {
            let src = channel * plane_bytes + index * sample_bytes;
            let dst = (index * channels + channel) * sample_bytes;
            data[dst..dst + sample_bytes].copy_from_slice(&raw.data[src..src + sample_bytes]);
        }
    }
    data
}
