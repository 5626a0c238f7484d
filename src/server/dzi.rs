//! Deep Zoom Image (DZI) compatibility module.
//!
//! This module provides DZI-compatible descriptors and path parsing for
//! integration with OpenSeadragon and other Deep Zoom-compatible viewers.
//!
//! # DZI Format Overview
//!
//! Deep Zoom numbers levels from a 1x1 pixel image:
//! - DZI level 0 = 1x1 pixel (lowest resolution)
//! - DZI max level = full resolution (highest resolution)
//!
//! The canonical pyramid also puts the coarsest level first, but it starts at
//! one tile instead of one pixel. [`LevelMapper`](crate::pyramid::LevelMapper)
//! shifts between the two numberings.

use serde::Serialize;

use crate::source::ImageMetadata;
use crate::tile::OutputFormat;

/// Suffix of descriptor names, e.g. `slide.png.dzi`.
pub const DESCRIPTOR_SUFFIX: &str = ".dzi";

/// Suffix of the tile directory name, e.g. `slide.png_files`.
pub const FILES_SUFFIX: &str = "_files";

/// Generate DZI XML descriptor for an image.
///
/// # Example Output
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
pub fn generate_dzi_xml(width: u32, height: u32, tile_size: u32, format: OutputFormat) -> String {
    let format = format.extension();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Image xmlns="http://schemas.microsoft.com/deepzoom/2008"
       TileSize="{tile_size}"
       Overlap="0"
       Format="{format}">
  <Size Width="{width}" Height="{height}" />
</Image>"#
    )
}

/// Image id named by a descriptor path segment like `case1%2Fslide.png.dzi`.
pub fn descriptor_image_id(name: &str) -> Option<&str> {
    name.strip_suffix(DESCRIPTOR_SUFFIX)
        .filter(|id| !id.is_empty())
}

/// Image id named by a tile directory segment like `slide.png_files`.
pub fn files_image_id(name: &str) -> Option<&str> {
    name.strip_suffix(FILES_SUFFIX).filter(|id| !id.is_empty())
}

/// Parse DZI tile coordinates from a filename like "3_5.jpg" or "3_5".
///
/// Returns `(x, y)` and the format named by the extension, if any. Unknown
/// extensions do not parse.
pub fn parse_dzi_tile_coords(filename: &str) -> Option<(u32, u32, Option<OutputFormat>)> {
    let (name, format) = match filename.split_once('.') {
        Some((name, ext)) => (name, Some(OutputFormat::from_extension(ext)?)),
        None => (filename, None),
    };

    // Parse "x_y" format
    let (x, y) = name.split_once('_')?;
    let x: u32 = x.parse().ok()?;
    let y: u32 = y.parse().ok()?;

    Some((x, y, format))
}

/// Descriptor contents as JSON, plus the level numbering used by tile URLs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepZoomInfo {
    pub width: u32,
    pub height: u32,
    /// Side of the square viewer tiles, the canonical tile width
    pub tile_size: u32,
    pub overlap: u32,
    pub format: &'static str,
    /// DZI level of the full-resolution image
    pub max_level: u32,
    /// DZI level served by canonical level 0
    pub level_offset: i64,
    /// Canonical level count
    pub levels: u32,
}

impl DeepZoomInfo {
    pub fn from_metadata(metadata: &ImageMetadata, format: OutputFormat) -> Self {
        Self {
            width: metadata.size_x,
            height: metadata.size_y,
            tile_size: metadata.tile_width,
            overlap: 0,
            format: format.extension(),
            max_level: metadata.external_max_level,
            level_offset: metadata.external_max_level as i64 - (metadata.levels as i64 - 1),
            levels: metadata.levels,
        }
    }

    pub fn to_xml(&self, format: OutputFormat) -> String {
        generate_dzi_xml(self.width, self.height, self.tile_size, format)
    }
}
