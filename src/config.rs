//! Configuration management for the tile server.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `PYRAMID_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use pyramid_tiles::config::Config;
//!
//! let config = Config::parse();
//! println!("Listening on {}", config.bind_address());
//! println!("Serving images from {}", config.image_dir.display());
//! ```
//!
//! # Environment Variables
//!
//! All configuration options can be set via environment variables with the `PYRAMID_` prefix:
//!
//! - `PYRAMID_HOST` - Server bind address (default: 0.0.0.0)
//! - `PYRAMID_PORT` - Server port (default: 3000)
//! - `PYRAMID_IMAGE_DIR` - Directory containing the images (required)
//! - `PYRAMID_ALLOWED_EXTENSIONS` - Comma-separated servable extensions
//! - `PYRAMID_CACHE_SOURCES` - Max open decoder handles (default: 10)
//! - `PYRAMID_MAX_SKIPPED_LEVELS` - Levels a single native read may skip (default: 3)
//! - `PYRAMID_DEFAULT_FORMAT` - Tile format when none is requested (default: jpeg)
//! - `PYRAMID_JPEG_QUALITY` - Default JPEG quality (default: 85)
//! - `PYRAMID_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `PYRAMID_CORS_ORIGINS` - Comma-separated allowed origins

use std::path::PathBuf;

use clap::Parser;

use crate::source::{DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_HANDLE_CACHE_CAPACITY};
use crate::tile::{is_valid_quality, OutputFormat, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SKIPPED_LEVELS};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// Largest accepted max-skipped-levels setting.
///
/// A single native read then covers at most `2^16` tiles per axis.
pub const MAX_SKIPPED_LEVELS_LIMIT: u32 = 16;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Pyramid Tiles - A tile server for very large multi-resolution images.
///
/// Serves fixed-size tiles and Deep Zoom descriptors for images in a local
/// directory, keeping a bounded number of decoder handles open.
#[derive(Parser, Debug, Clone)]
#[command(name = "pyramid-tiles")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "PYRAMID_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PYRAMID_PORT")]
    pub port: u16,

    // =========================================================================
    // Image Configuration
    // =========================================================================
    /// Directory containing the images. Image ids are paths relative to it.
    #[arg(long, env = "PYRAMID_IMAGE_DIR")]
    pub image_dir: PathBuf,

    /// File extensions that may be served (comma-separated).
    ///
    /// Matched against the end of the file name, so `.ome.tif` is allowed.
    #[arg(
        long,
        env = "PYRAMID_ALLOWED_EXTENSIONS",
        value_delimiter = ',',
        default_values_t = DEFAULT_ALLOWED_EXTENSIONS.iter().map(|ext| ext.to_string())
    )]
    pub allowed_extensions: Vec<String>,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Maximum number of decoder handles to keep open.
    #[arg(long, default_value_t = DEFAULT_HANDLE_CACHE_CAPACITY, env = "PYRAMID_CACHE_SOURCES")]
    pub cache_sources: usize,

    // =========================================================================
    // Tile Configuration
    // =========================================================================
    /// Native pyramid levels one read may skip before tiles are composited
    /// from finer tiles instead.
    #[arg(long, default_value_t = DEFAULT_MAX_SKIPPED_LEVELS, env = "PYRAMID_MAX_SKIPPED_LEVELS")]
    pub max_skipped_levels: u32,

    /// Tile format used when the request does not name one (jpeg, png, raw).
    #[arg(long, default_value_t = OutputFormat::Jpeg, env = "PYRAMID_DEFAULT_FORMAT")]
    pub default_format: OutputFormat,

    /// Default JPEG quality for tile encoding (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "PYRAMID_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "PYRAMID_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "PYRAMID_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.image_dir.is_dir() {
            return Err(format!(
                "Image directory {} does not exist or is not a directory. \
                 Set --image-dir or PYRAMID_IMAGE_DIR",
                self.image_dir.display()
            ));
        }

        if self.allowed_extensions.iter().all(|ext| ext.trim().is_empty()) {
            return Err("allowed_extensions must name at least one extension".to_string());
        }

        if self.cache_sources == 0 {
            return Err("cache_sources must be greater than 0".to_string());
        }

        if self.max_skipped_levels > MAX_SKIPPED_LEVELS_LIMIT {
            return Err(format!(
                "max_skipped_levels must be at most {MAX_SKIPPED_LEVELS_LIMIT}"
            ));
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Tests
// =============================================================================
