//! Backend selection.
//!
//! Each registration is a `(predicate, priority, factory)` tuple. Opening a
//! path tries every factory whose predicate accepts it, best priority first and
//! registration order among equals, and returns the first handle that opens.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::{DecoderFactory, DecoderHandle, OpenOptions, RasterDecoder};
use crate::error::{DecodeError, TileError};

/// How strongly a backend claims a file. Earlier variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Preferred,
    High,
    Medium,
    Normal,
    Low,
    Fallback,
}

type Predicate = Box<dyn Fn(&Path) -> bool + Send + Sync>;

struct Registration {
    priority: Priority,
    predicate: Predicate,
    factory: Arc<dyn DecoderFactory>,
}

/// Ordered list of decoder backends.
#[derive(Default)]
pub struct DecoderRegistry {
    registrations: Vec<Registration>,
}

impl DecoderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in raster backend for PNG and JPEG.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            RasterDecoder::new(),
            Priority::Normal,
            extension_predicate(RasterDecoder::EXTENSIONS),
        );
        registry
    }

    /// Add a backend.
    pub fn register<F, P>(&mut self, factory: F, priority: Priority, predicate: P) -> &mut Self
    where
        F: DecoderFactory + 'static,
        P: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.registrations.push(Registration {
            priority,
            predicate: Box::new(predicate),
            factory: Arc::new(factory),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Factories accepting `path`, in the order they will be tried.
    pub fn candidates(&self, path: &Path) -> Vec<Arc<dyn DecoderFactory>> {
        let mut matching: Vec<&Registration> = self
            .registrations
            .iter()
            .filter(|registration| (registration.predicate)(path))
            .collect();
        // Stable sort keeps registration order among equal priorities
        matching.sort_by_key(|registration| registration.priority);
        matching
            .into_iter()
            .map(|registration| Arc::clone(&registration.factory))
            .collect()
    }

    /// Open `path` with the first backend that succeeds.
    ///
    /// # Errors
    ///
    /// - [`TileError::UnsupportedResource`] if no backend accepts the path
    /// - [`TileError::ResourceNotFound`] if a backend reports the file missing
    /// - [`TileError::OpenFailure`] with the last backend error otherwise
    pub fn open(
        &self,
        path: &Path,
        options: &OpenOptions,
    ) -> Result<Box<dyn DecoderHandle>, TileError> {
        let candidates = self.candidates(path);
        if candidates.is_empty() {
            return Err(TileError::UnsupportedResource {
                reason: format!("no decoder accepts {}", path.display()),
            });
        }

        let mut last_error = None;
        for factory in candidates {
            match factory.open(path, options) {
                Ok(handle) => {
                    debug!(
                        path = %path.display(),
                        decoder = factory.name(),
                        "Opened decoder handle"
                    );
                    return Ok(handle);
                }
                Err(DecodeError::NotFound(_)) => {
                    return Err(TileError::ResourceNotFound {
                        image_id: path.display().to_string(),
                    });
                }
                Err(e) => {
                    debug!(
                        path = %path.display(),
                        decoder = factory.name(),
                        error = %e,
                        "Decoder could not open file, trying next"
                    );
                    last_error = Some(format!("{}: {}", factory.name(), e));
                }
            }
        }

        Err(TileError::OpenFailure {
            path: path.display().to_string(),
            reason: last_error.unwrap_or_else(|| "no decoder succeeded".to_string()),
        })
    }
}

/// Predicate accepting file names ending in any of `extensions` (case-insensitive).
///
/// Extensions are given without the leading dot, e.g. `["png", "ome.tif"]`.
pub fn extension_predicate(extensions: &[&str]) -> impl Fn(&Path) -> bool + Send + Sync + 'static {
    let suffixes: Vec<String> = extensions
        .iter()
        .map(|ext| format!(".{}", ext.trim_start_matches('.').to_ascii_lowercase()))
        .collect();
    move |path: &Path| {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let name = name.to_ascii_lowercase();
        suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }
}
