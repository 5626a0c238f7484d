//! Region and thumbnail geometry.
//!
//! A region is given by its left and top edge plus either the opposite edges or
//! a size, in full-resolution pixels, fractions of the image, or millimeters.
//! Negative edges count back from the right or bottom of the image. The
//! rectangle is clipped to the image, then scaled down to fit the requested
//! output bounds. Output is never enlarged.

use std::str::FromStr;

use crate::error::TileError;

/// Largest width or height of a rendered region or thumbnail.
pub const MAX_OUTPUT_DIMENSION: u32 = 4096;

/// Thumbnail bounds used when a request gives none.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

/// Unit of the edges in a [`RegionSpec`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegionUnits {
    /// Full-resolution pixels
    #[default]
    BasePixels,
    /// Fractions of the image width and height
    Fraction,
    /// Millimeters, using the pixel size the backend reports
    Millimeters,
}

impl FromStr for RegionUnits {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base_pixels" | "pixels" => Ok(RegionUnits::BasePixels),
            "fraction" => Ok(RegionUnits::Fraction),
            "mm" => Ok(RegionUnits::Millimeters),
            other => Err(TileError::InvalidRegion {
                reason: format!("unknown units '{other}'"),
            }),
        }
    }
}

/// Rectangle in full-resolution pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// The whole `size_x x size_y` image.
    pub fn full(size_x: u32, size_y: u32) -> Self {
        Self::new(0, 0, size_x, size_y)
    }
}

/// A region as a client describes it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegionSpec {
    pub left: f64,
    pub top: f64,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub units: RegionUnits,
}

impl RegionSpec {
    /// A `width x height` region at `(left, top)` in full-resolution pixels.
    pub fn pixels(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Clip to a `size_x x size_y` image and convert to pixels.
    ///
    /// `mm_per_pixel` is only needed for [`RegionUnits::Millimeters`].
    pub fn resolve(
        &self,
        size_x: u32,
        size_y: u32,
        mm_per_pixel: (Option<f64>, Option<f64>),
    ) -> Result<PixelRect, TileError> {
        let invalid = |reason: &str| TileError::InvalidRegion {
            reason: reason.to_string(),
        };

        let right = match (self.right, self.width) {
            (Some(right), _) => right,
            (None, Some(width)) => self.left + width,
            (None, None) => return Err(invalid("one of right or width is required")),
        };
        let bottom = match (self.bottom, self.height) {
            (Some(bottom), _) => bottom,
            (None, Some(height)) => self.top + height,
            (None, None) => return Err(invalid("one of bottom or height is required")),
        };

        let (scale_x, scale_y) = match self.units {
            RegionUnits::BasePixels => (1.0, 1.0),
            RegionUnits::Fraction => (size_x as f64, size_y as f64),
            RegionUnits::Millimeters => match mm_per_pixel {
                (Some(mm_x), Some(mm_y)) if mm_x > 0.0 && mm_y > 0.0 => (1.0 / mm_x, 1.0 / mm_y),
                _ => return Err(invalid("the image has no physical pixel size")),
            },
        };

        let (left, right) = edges(self.left * scale_x, right * scale_x, size_x);
        let (top, bottom) = edges(self.top * scale_y, bottom * scale_y, size_y);
        if right <= left || bottom <= top {
            return Err(invalid("the region does not overlap the image"));
        }

        Ok(PixelRect::new(left, top, right - left, bottom - top))
    }
}

/// Round a pair of edges to pixels, counting negatives from the far edge.
fn edges(start: f64, end: f64, size: u32) -> (u32, u32) {
    let clip = |v: f64| {
        let v = if v < 0.0 { v + size as f64 } else { v };
        if v.is_finite() {
            v.round().clamp(0.0, size as f64) as u32
        } else {
            0
        }
    };
    (clip(start), clip(end))
}

/// Largest size with the aspect ratio of `width x height` that fits the bounds.
///
/// Missing bounds do not constrain. The result is never larger than the input
/// and at least one pixel on each axis.
pub fn fit_output(
    width: u32,
    height: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> (u32, u32) {
    let mut factor: f64 = 1.0;
    if let Some(max_width) = max_width {
        factor = factor.min(max_width as f64 / width as f64);
    }
    if let Some(max_height) = max_height {
        factor = factor.min(max_height as f64 / height as f64);
    }
    let scaled = |v: u32| ((v as f64 * factor).round() as u32).clamp(1, v.max(1));
    (scaled(width), scaled(height))
}

/// Reject output sizes outside `1..=MAX_OUTPUT_DIMENSION`.
pub fn check_output_size(width: u32, height: u32) -> Result<(), TileError> {
    let valid = 1..=MAX_OUTPUT_DIMENSION;
    if valid.contains(&width) && valid.contains(&height) {
        Ok(())
    } else {
        Err(TileError::InvalidRegion {
            reason: format!(
                "output would be {width}x{height}, each side must be 1-{MAX_OUTPUT_DIMENSION}"
            ),
        })
    }
}
