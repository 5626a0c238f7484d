//! Mapping image identifiers to files under the image root.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::TileError;

/// Extensions served by default, matched against the end of the file name.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    ".svs", ".ndpi", ".vms", ".scn", ".mrxs", ".czi", ".tif", ".tiff", ".ptif", ".qptiff",
    ".ome.tif", ".ome.tiff", ".nd2", ".dcm", ".jp2", ".png", ".jpg", ".jpeg", ".zarr",
    ".zarr.zip",
];

/// Resolves identifiers like `case1/slide.svs` or `case1/slide` to files.
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    root: PathBuf,
    /// Lower-case, each with a leading dot
    allowed_extensions: Vec<String>,
}

impl ResourceResolver {
    pub fn new<S: AsRef<str>>(root: impl Into<PathBuf>, allowed_extensions: &[S]) -> Self {
        let root = root.into();
        let root = fs::canonicalize(&root).unwrap_or(root);
        let allowed_extensions = allowed_extensions
            .iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .filter(|ext| ext.len() > 1)
            .collect();
        Self {
            root,
            allowed_extensions,
        }
    }

    /// Resolver with [`DEFAULT_ALLOWED_EXTENSIONS`].
    pub fn with_default_extensions(root: impl Into<PathBuf>) -> Self {
        Self::new(root, DEFAULT_ALLOWED_EXTENSIONS)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Find the file for `image_id`.
    ///
    /// Tried in order: `root/image_id`, `root/image_id` plus each allowed
    /// extension, then `image_id` as an absolute path. The result is
    /// canonical and always inside the root.
    pub fn resolve(&self, image_id: &str) -> Result<PathBuf, TileError> {
        let not_found = || TileError::ResourceNotFound {
            image_id: image_id.to_string(),
        };

        let normalized = image_id.replace("%2F", "/").replace("%5C", "\\");
        let requested = Path::new(&normalized);
        if normalized.is_empty() || requested.components().any(|c| c == Component::ParentDir) {
            return Err(not_found());
        }

        if requested.is_absolute() {
            return self.inside_root(requested).ok_or_else(not_found);
        }

        let direct = self.root.join(requested);
        if let Some(path) = self.inside_root(&direct) {
            return Ok(path);
        }

        self.allowed_extensions
            .iter()
            .find_map(|ext| self.inside_root(&self.root.join(format!("{normalized}{ext}"))))
            .ok_or_else(not_found)
    }

    /// Resolve and check the extension.
    pub fn resolve_checked(&self, image_id: &str) -> Result<PathBuf, TileError> {
        let path = self.resolve(image_id)?;
        self.validate_extension(&path)?;
        Ok(path)
    }

    /// Check that the file name ends with an allowed extension.
    pub fn validate_extension(&self, path: &Path) -> Result<(), TileError> {
        if self.is_allowed(path) {
            return Ok(());
        }
        let suffixes = suffixes(path);
        Err(TileError::UnsupportedResource {
            reason: format!("file extension not allowed: {suffixes}"),
        })
    }

    fn is_allowed(&self, path: &Path) -> bool {
        let suffixes = suffixes(path);
        self.allowed_extensions
            .iter()
            .any(|ext| suffixes.ends_with(ext.as_str()))
    }

    /// All servable images under the root as sorted relative identifiers.
    pub fn list(&self) -> Vec<String> {
        let mut images = Vec::new();
        self.collect(&self.root, &mut images);
        images.sort();
        images.dedup();
        images
    }

    fn collect(&self, dir: &Path, images: &mut Vec<String>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot list directory");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                self.collect(&path, images);
            } else if self.is_allowed(&path) {
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    images.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
    }

    /// Canonical form of `path` if it is an existing file inside the root.
    fn inside_root(&self, path: &Path) -> Option<PathBuf> {
        let canonical = fs::canonicalize(path).ok()?;
        (canonical.is_file() && canonical.starts_with(&self.root)).then_some(canonical)
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// Every suffix of the file name joined, e.g. `.ome.tif` for `a.ome.tif`.
fn suffixes(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let name = name.trim_start_matches('.');
    match name.find('.') {
        Some(dot) => name[dot..].to_string(),
        None => String::new(),
    }
}
