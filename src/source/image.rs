//! An opened image resource.
//!
//! [`ImageSource`] owns exactly one decoder handle. Everything the tile path
//! needs besides pixels (geometry, extents, native level sizes) is read from the
//! handle once at open time, so only region reads take the per-handle lock.
//! The handle is closed when the source is dropped, which happens after the last
//! `Arc` is released. A source evicted from the cache while a read is in flight
//! therefore stays open until that read has finished.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::decoder::{
    DecoderHandle, DecoderRegistry, Magnification, OpenOptions, Region, SampleType,
};
use crate::error::TileError;
use crate::pyramid::{DimensionExtents, FrameAddress, ImageGeometry, LevelMapper};
use crate::tile::{PixelBuffer, TileAssembler};

pub struct ImageSource {
    path: PathBuf,
    geometry: ImageGeometry,
    extents: DimensionExtents,
    sample_type: SampleType,
    band_count: u32,
    /// `(width, height)` of each native level, index 0 = full resolution
    level_sizes: Vec<(u32, u32)>,
    channel_names: Vec<String>,
    magnification: Magnification,
    internal_metadata: serde_json::Map<String, serde_json::Value>,
    associated_images: Vec<String>,
    /// Serializes every native call on the handle
    handle: Mutex<Box<dyn DecoderHandle>>,
}

impl ImageSource {
    /// Open `path` through the registry and check that it can produce a tile.
    ///
    /// Blocking: runs backend open and one native read.
    pub fn open(
        path: &Path,
        registry: &DecoderRegistry,
        options: &OpenOptions,
        assembler: &TileAssembler,
    ) -> Result<Self, TileError> {
        let handle = registry.open(path, options)?;
        let source = Self::from_handle(path.to_path_buf(), handle)?;

        assembler
            .check_readable(&source)
            .map_err(|e| TileError::OpenFailure {
                path: path.display().to_string(),
                reason: format!("cannot read a tile at the coarsest level: {e}"),
            })?;

        Ok(source)
    }

    /// Wrap an already open handle, deriving the canonical geometry.
    ///
    /// The handle is closed if the geometry is invalid.
    pub fn from_handle(
        path: PathBuf,
        mut handle: Box<dyn DecoderHandle>,
    ) -> Result<Self, TileError> {
        let (size_x, size_y) = handle.native_size();
        let native_resolution_count = handle.native_resolution_count();
        let geometry = match ImageGeometry::derive(
            size_x,
            size_y,
            native_resolution_count,
            handle.optimal_tile_hint(),
        ) {
            Ok(geometry) => geometry,
            Err(e) => {
                handle.close();
                return Err(e);
            }
        };

        let extents = handle.dimension_extents();
        let level_sizes = (0..native_resolution_count)
            .map(|level| handle.level_size(level))
            .collect();

        let mut channel_names = handle.channel_names();
        if channel_names.is_empty() && extents.size_c > 1 {
            channel_names = (0..extents.size_c).map(|c| format!("Channel {c}")).collect();
        }

        Ok(Self {
            path,
            geometry,
            extents,
            sample_type: handle.sample_type(),
            band_count: handle.band_count(),
            level_sizes,
            channel_names,
            magnification: handle.magnification(),
            internal_metadata: handle.internal_metadata(),
            associated_images: handle.associated_image_names(),
            handle: Mutex::new(handle),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    pub fn extents(&self) -> DimensionExtents {
        self.extents
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn band_count(&self) -> u32 {
        self.band_count
    }

    /// Size of a native level, or `(0, 0)` if the backend has no such level.
    pub fn native_level_size(&self, level: u32) -> (u32, u32) {
        self.level_sizes
            .get(level as usize)
            .copied()
            .unwrap_or((0, 0))
    }

    /// Decode a native region under the handle lock.
    pub fn read_region(
        &self,
        level: u32,
        region: Region,
        plane: FrameAddress,
    ) -> Result<PixelBuffer, TileError> {
        let raw = {
            let mut handle = self.handle.lock();
            handle.read_region(level, region, plane)
        }
        .map_err(TileError::ReadFailure)?;

        PixelBuffer::from_raw(raw).map_err(TileError::ReadFailure)
    }

    pub fn magnification(&self) -> Magnification {
        self.magnification
    }

    /// Format-specific metadata reported by the backend, possibly empty.
    pub fn internal_metadata(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.internal_metadata
    }

    pub fn associated_images(&self) -> &[String] {
        &self.associated_images
    }

    /// Decode an associated image under the handle lock.
    ///
    /// Names the backend did not list are [`TileError::ResourceNotFound`].
    pub fn read_associated(&self, name: &str) -> Result<PixelBuffer, TileError> {
        if !self.associated_images.iter().any(|known| known == name) {
            return Err(TileError::ResourceNotFound {
                image_id: format!("{}: associated image '{name}'", self.path.display()),
            });
        }

        let raw = {
            let mut handle = self.handle.lock();
            handle.read_associated_image(name)
        }
        .map_err(TileError::ReadFailure)?;

        PixelBuffer::from_raw(raw).map_err(TileError::ReadFailure)
    }

    /// Describe the resource for clients.
    pub fn metadata(&self) -> ImageMetadata {
        let multi_frame = self.extents.frame_count() > 1;
        let frames = multi_frame.then(|| {
            self.extents
                .frames()
                .enumerate()
                .map(|(frame, address)| FrameInfo {
                    frame: frame as u64,
                    index_c: address.c,
                    index_z: address.z,
                    index_t: address.t,
                })
                .collect()
        });
        let index_range = multi_frame.then_some(IndexRange {
            index_c: self.extents.size_c,
            index_z: self.extents.size_z,
            index_t: self.extents.size_t,
        });

        ImageMetadata {
            size_x: self.geometry.size_x,
            size_y: self.geometry.size_y,
            tile_width: self.geometry.tile_width,
            tile_height: self.geometry.tile_height,
            levels: self.geometry.levels,
            native_resolution_count: self.geometry.native_resolution_count,
            external_max_level: LevelMapper::new(&self.geometry).external_max_level(),
            size_c: self.extents.size_c,
            size_z: self.extents.size_z,
            size_t: self.extents.size_t,
            band_count: self.band_count,
            dtype: self.sample_type,
            magnification: self.magnification.magnification,
            mm_x: self.magnification.mm_x,
            mm_y: self.magnification.mm_y,
            channels: self.channel_names.clone(),
            frames,
            index_range,
        }
    }
}

impl Drop for ImageSource {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Closing decoder handle");
        self.handle.get_mut().close();
    }
}

impl std::fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSource")
            .field("path", &self.path)
            .field("geometry", &self.geometry)
            .field("extents", &self.extents)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Metadata
// =============================================================================

/// Geometry, extents and physical scale of one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub size_x: u32,
    pub size_y: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub levels: u32,
    pub native_resolution_count: u32,
    /// Finest level in viewer numbering, where level 0 is one pixel
    pub external_max_level: u32,
    pub size_c: u32,
    pub size_z: u32,
    pub size_t: u32,
    pub band_count: u32,
    pub dtype: SampleType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnification: Option<f64>,
    #[serde(rename = "mm_x", skip_serializing_if = "Option::is_none")]
    pub mm_x: Option<f64>,
    #[serde(rename = "mm_y", skip_serializing_if = "Option::is_none")]
    pub mm_y: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,
    /// One entry per plane, present only for multi-frame resources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<FrameInfo>>,
    #[serde(rename = "IndexRange", skip_serializing_if = "Option::is_none")]
    pub index_range: Option<IndexRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    #[serde(rename = "Frame")]
    pub frame: u64,
    #[serde(rename = "IndexC")]
    pub index_c: u32,
    #[serde(rename = "IndexZ")]
    pub index_z: u32,
    #[serde(rename = "IndexT")]
    pub index_t: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexRange {
    #[serde(rename = "IndexC")]
    pub index_c: u32,
    #[serde(rename = "IndexZ")]
    pub index_z: u32,
    #[serde(rename = "IndexT")]
    pub index_t: u32,
}
