//! Rendered icon cache
//!
//! Rendering is delegated to an `IconRenderer`; the manager only keeps the
//! resulting artifacts keyed by icon name so the UI can fetch them without
//! re-rendering.

use anyhow::{Context, Result};
use deck_assets_types::{Icon, RenderedImage};
use log::trace;
use std::collections::HashMap;
use std::sync::Arc;

/// Produces a displayable image for an icon
pub trait IconRenderer: Send + Sync {
    fn render(&self, icon: &Icon) -> Result<RenderedImage>;
}

/// Loads the icon's source file as-is.
///
/// Used when the host application does its own decoding and scaling.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileBytesRenderer;

impl IconRenderer for FileBytesRenderer {
    fn render(&self, icon: &Icon) -> Result<RenderedImage> {
        let data = std::fs::read(icon.path())
            .with_context(|| format!("Failed to read icon source: {}", icon.path().display()))?;
        Ok(RenderedImage::new(icon.path(), data))
    }
}

/// Rendered images keyed by icon name
#[derive(Debug, Default)]
pub struct RenderCache {
    images: HashMap<String, Arc<RenderedImage>>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<RenderedImage>> {
        self.images.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }

    pub fn insert(&mut self, name: &str, image: RenderedImage) -> Arc<RenderedImage> {
        let image = Arc::new(image);
        self.images.insert(name.to_string(), Arc::clone(&image));
        image
    }

    pub fn invalidate(&mut self, name: &str) {
        if self.images.remove(name).is_some() {
            trace!("Invalidated rendered icon '{}'", name);
        }
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
