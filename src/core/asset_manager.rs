//! Plugin-facing asset manager
//!
//! Owns one color store and one icon store, the override document they
//! persist to, and the rendered icon cache. Every override mutation is
//! written back to the document immediately.

use super::render_cache::{FileBytesRenderer, IconRenderer, RenderCache};
use super::store::AssetStore;
use crate::config::{OverrideDocument, Settings};
use anyhow::Result;
use deck_assets_core::{build_runtime, Color, Icon, NotifyRuntime, NOTIFIER_WORKER_THREADS};
use deck_assets_types::RenderedImage;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct AssetManager {
    colors: AssetStore<Color>,
    icons: AssetStore<Icon>,
    document: OverrideDocument,
    renderer: Arc<dyn IconRenderer>,
    rendered: RenderCache,
    settings: Settings,
}

impl AssetManager {
    /// Create a manager and load overrides from `settings.overrides_path`.
    ///
    /// Both stores share `runtime` for their notifications.
    pub fn new(
        settings: Settings,
        runtime: Arc<NotifyRuntime>,
        renderer: Arc<dyn IconRenderer>,
    ) -> Result<Self> {
        let document = OverrideDocument::load(&settings.overrides_path)?;

        let mut colors = AssetStore::new(&settings.color_save_key, Arc::clone(&runtime));
        let mut icons = AssetStore::new(&settings.icon_save_key, runtime);
        colors.set_notify_timeout(settings.notify_timeout());
        icons.set_notify_timeout(settings.notify_timeout());

        let loaded_colors = colors.load_json(document.value());
        let loaded_icons = icons.load_json(document.value());
        info!(
            "Loaded {} color and {} icon overrides from {:?}",
            loaded_colors,
            loaded_icons,
            document.path()
        );

        let mut manager = Self {
            colors,
            icons,
            document,
            renderer,
            rendered: RenderCache::new(),
            settings,
        };
        if manager.settings.pre_render_all_icons {
            manager.render_all_icons(false);
        }
        Ok(manager)
    }

    /// Create a manager with its own notification runtime and the
    /// pass-through file renderer
    pub fn open(settings: Settings) -> Result<Self> {
        let runtime = build_runtime(NOTIFIER_WORKER_THREADS)?;
        Self::new(settings, runtime, Arc::new(FileBytesRenderer))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn document(&self) -> &OverrideDocument {
        &self.document
    }

    pub fn color_store(&self) -> &AssetStore<Color> {
        &self.colors
    }

    /// Mutable access, mainly for registering listeners
    pub fn color_store_mut(&mut self) -> &mut AssetStore<Color> {
        &mut self.colors
    }

    pub fn icon_store(&self) -> &AssetStore<Icon> {
        &self.icons
    }

    pub fn icon_store_mut(&mut self) -> &mut AssetStore<Icon> {
        &mut self.icons
    }

    /// Seed both base layers from a defaults document shaped like the
    /// override document. Returns the number of assets registered.
    pub fn register_defaults(&mut self, defaults: &Value) -> usize {
        let added = self.colors.load_assets_json(defaults) + self.icons.load_assets_json(defaults);
        if self.settings.pre_render_all_icons {
            self.render_all_icons(true);
        }
        debug!("Registered {} default assets", added);
        added
    }

    // Color

    pub fn add_color(&mut self, name: &str, color: Color) -> bool {
        self.colors.add_asset(name, color, false)
    }

    pub fn remove_color(&mut self, name: &str) -> bool {
        self.colors.remove_asset(name)
    }

    pub fn change_color(&mut self, name: &str, color: Color) -> bool {
        self.colors.change_asset(name, color.to_array())
    }

    /// Effective color for `name`, or the configured fallback
    pub fn get_color(&self, name: &str) -> Color {
        self.colors
            .get_asset(name, false)
            .copied()
            .unwrap_or(self.settings.fallback_color)
    }

    /// Add the override, or change it in place if one exists, then save.
    /// Without `skip_base_check` a base color must be registered.
    pub fn set_color_override(&mut self, name: &str, color: Color, skip_base_check: bool) -> bool {
        let changed = if self.colors.has_override(name) {
            self.colors.change_override(name, color.to_array())
        } else {
            self.colors.add_override(name, color, skip_base_check, false)
        };

        if changed {
            self.persist();
        }
        changed
    }

    pub fn remove_color_override(&mut self, name: &str) -> bool {
        let removed = self.colors.remove_override(name);
        if removed {
            self.persist();
        }
        removed
    }

    // Icon

    pub fn add_icon(&mut self, name: &str, icon: Icon, pre_render: bool) -> bool {
        if !self.icons.add_asset(name, icon, false) {
            return false;
        }
        if pre_render || self.settings.pre_render_all_icons {
            self.render_icon(name);
        }
        true
    }

    pub fn add_icon_by_path(&mut self, name: &str, path: impl Into<PathBuf>, pre_render: bool) -> bool {
        self.add_icon(name, Icon::new(path), pre_render)
    }

    pub fn remove_icon(&mut self, name: &str) -> bool {
        let removed = self.icons.remove_asset(name);
        if removed {
            self.refresh_rendered(name);
        }
        removed
    }

    pub fn change_icon(&mut self, name: &str, path: impl Into<PathBuf>) -> bool {
        let changed = self.icons.change_asset(name, path.into());
        if changed {
            self.refresh_rendered(name);
        }
        changed
    }

    pub fn get_icon(&self, name: &str) -> Option<&Icon> {
        self.icons.get_asset(name, false)
    }

    /// Point `name` at a user-picked image, then save.
    ///
    /// A path that is not an existing file is rejected without touching
    /// the store or the document.
    pub fn set_icon_override(
        &mut self,
        name: &str,
        path: impl AsRef<Path>,
        skip_base_check: bool,
    ) -> bool {
        let icon = Icon::new(path.as_ref());
        if !icon.exists() {
            debug!(
                "Ignoring icon override for '{}': {:?} is not a file",
                name,
                icon.path()
            );
            return false;
        }

        let changed = if self.icons.has_override(name) {
            self.icons.change_override(name, icon.path().to_path_buf())
        } else {
            self.icons.add_override(name, icon, skip_base_check, false)
        };

        if changed {
            self.refresh_rendered(name);
            self.persist();
        }
        changed
    }

    pub fn remove_icon_override(&mut self, name: &str) -> bool {
        let removed = self.icons.remove_override(name);
        if removed {
            self.refresh_rendered(name);
            self.persist();
        }
        removed
    }

    // Rendering

    /// Cached render of the effective icon, if it has been rendered
    pub fn get_rendered_icon(&self, name: &str) -> Option<Arc<RenderedImage>> {
        self.rendered.get(name)
    }

    pub fn rendered_icons(&self) -> &RenderCache {
        &self.rendered
    }

    /// Render every known icon, overrides included.
    /// With `skip_rendered`, names already in the cache are left alone;
    /// otherwise the cache is rebuilt from scratch.
    pub fn render_all_icons(&mut self, skip_rendered: bool) {
        if !skip_rendered {
            self.rendered.clear();
        }

        let names: Vec<String> = self
            .icons
            .get_assets_merged()
            .keys()
            .map(|name| name.to_string())
            .collect();

        for name in names {
            if skip_rendered && self.rendered.contains(&name) {
                continue;
            }
            self.render_icon(&name);
        }
    }

    fn render_icon(&mut self, name: &str) -> Option<Arc<RenderedImage>> {
        let icon = self.icons.get_asset(name, false)?;
        match self.renderer.render(icon) {
            Ok(image) => Some(self.rendered.insert(name, image)),
            Err(e) => {
                warn!("Failed to render icon '{}': {:#}", name, e);
                self.rendered.invalidate(name);
                None
            }
        }
    }

    /// Drop a stale render and re-render if the icon was rendered before
    fn refresh_rendered(&mut self, name: &str) {
        let was_rendered = self.rendered.contains(name);
        self.rendered.invalidate(name);
        if was_rendered || self.settings.pre_render_all_icons {
            self.render_icon(name);
        }
    }

    // Save

    /// Write both override layers to the document, leaving other keys alone
    pub fn save_overrides(&mut self) -> Result<()> {
        let sections = vec![
            (self.colors.save_key(), self.colors.override_json()),
            (self.icons.save_key(), self.icons.override_json()),
        ];
        self.document.save_sections(sections)
    }

    fn persist(&mut self) {
        if let Err(e) = self.save_overrides() {
            error!("Failed to save asset overrides: {:#}", e);
        }
    }
}
