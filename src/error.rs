use thiserror::Error;

/// Errors reported by a decoder backend.
///
/// Backends never see tile addresses, only native regions, so these errors
/// describe what went wrong inside the native library. The service layer maps
/// them onto [`TileError`] depending on whether they happened while opening a
/// resource or while reading from an already open handle.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The file backing the resource does not exist
    #[error("File not found: {0}")]
    NotFound(String),

    /// The backend recognised the file but could not open it
    #[error("Cannot open: {0}")]
    Open(String),

    /// A region read failed for an otherwise valid request
    #[error("Read failed: {0}")]
    Read(String),

    /// The handle itself is broken and must not be used again
    #[error("Decoder handle is unusable: {0}")]
    HandleUnusable(String),

    /// The backend does not handle this kind of file or request
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Errors that can occur while resolving, opening, or reading tiles.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// The image identifier does not resolve to a file under the image root
    #[error("Image not found: {image_id}")]
    ResourceNotFound { image_id: String },

    /// The file extension or format is not permitted (should map to HTTP 415)
    #[error("Unsupported resource: {reason}")]
    UnsupportedResource { reason: String },

    /// No backend could open the resource
    #[error("Failed to open {path}: {reason}")]
    OpenFailure { path: String, reason: String },

    /// Tile or level coordinates are outside the tile grid
    #[error("Tile address out of range: level={level}, x={x}, y={y} ({reason})")]
    AddressOutOfRange {
        level: u32,
        x: u32,
        y: u32,
        reason: String,
    },

    /// The backend failed to decode a valid address
    #[error("Failed to read tile: {0}")]
    ReadFailure(DecodeError),

    /// The resource reports a size or pyramid that cannot be tiled
    #[error("Invalid image geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// Region or output size parameters are missing, empty or too large
    #[error("Invalid region: {reason}")]
    InvalidRegion { reason: String },

    /// Requested JPEG quality is outside 1-100
    #[error("Invalid quality parameter: {quality} (must be 1-100)")]
    InvalidQuality { quality: u8 },

    /// The style parameter is not valid JSON
    #[error("Invalid style: {message}")]
    InvalidStyle { message: String },

    /// Output encoding failed
    #[error("Failed to encode tile: {message}")]
    EncodeError { message: String },

    /// A worker task panicked or was cancelled
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TileError {
    /// Whether the caller can fix the request (bad address, bad format, bad parameters).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TileError::ResourceNotFound { .. }
                | TileError::UnsupportedResource { .. }
                | TileError::AddressOutOfRange { .. }
                | TileError::InvalidRegion { .. }
                | TileError::InvalidQuality { .. }
                | TileError::InvalidStyle { .. }
        )
    }

    /// Whether the backend reported that the handle used for this request is broken.
    pub fn is_unusable_handle(&self) -> bool {
        matches!(self, TileError::ReadFailure(DecodeError::HandleUnusable(_)))
    }
}
