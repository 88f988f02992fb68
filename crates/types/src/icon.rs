//! Icon and rendered image types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An icon backed by a source image on disk.
///
/// Serializes as the bare path string, which is how icon overrides are
/// stored under the `"icons"` key of the override document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Icon {
    path: PathBuf,
}

impl Icon {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    /// Whether the source image currently exists as a regular file
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Output of the rendering collaborator.
///
/// The manager never looks inside; it only caches these by asset name
/// and hands them back to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// Image the artifact was produced from
    pub source: PathBuf,
    /// Encoded or decoded image data, owned by the renderer's format
    pub data: Arc<[u8]>,
}

impl RenderedImage {
    pub fn new(source: impl Into<PathBuf>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            source: source.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
